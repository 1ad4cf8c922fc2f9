use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use colored::Colorize;
use std::path::{Path, PathBuf};

use csvdb_core::{Config, Diagnostic, DiagnosticCode, Location, Report, Severity};
use csvdb_engine::{canonicalize, compile, discover, load_database, source_of, DependencyGraph, SourceMode};

/// csvdb - compile a directory of CSV tables into a typed, validated database
#[derive(Parser)]
#[command(name = "csvdb")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    compile: CompileArgs,
}

#[derive(Args)]
struct CompileArgs {
    /// Directory holding the table files
    input_dir: Option<PathBuf>,

    /// Directory for generated code; nothing is generated without it
    output_dir: Option<PathBuf>,

    /// Never rewrite files; fail if any file is out of date
    #[arg(long)]
    check: bool,

    /// Write a JSON run report to this file
    #[arg(long, value_name = "FILE")]
    report: Option<PathBuf>,

    /// Path to config file (default: csvdb.toml in the input directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show every table that depends on a table
    Impact {
        /// Directory holding the table files
        input_dir: PathBuf,

        /// Table to analyze
        table: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Some(Commands::Impact { input_dir, table }) => impact_command(&input_dir, &table),
        None => {
            let Some(input) = cli.compile.input_dir.clone() else {
                Cli::command()
                    .error(
                        clap::error::ErrorKind::MissingRequiredArgument,
                        "the following required arguments were not provided: <INPUT_DIR>",
                    )
                    .exit();
            };
            compile_command(&cli.compile, &input, cli.verbose)
        }
    }
}

/// Log to stderr; `RUST_LOG` picks the level unless `--verbose` forces debug
fn init_logging(verbose: bool) {
    let filter = if verbose {
        tracing_subscriber::EnvFilter::new("debug")
    } else {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Load the explicit config file, else `csvdb.toml` in the input directory,
/// else defaults
fn load_config(explicit: Option<&Path>, input: &Path, verbose: bool) -> Result<Config> {
    let path = match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => Some(input.join("csvdb.toml")).filter(|p| p.is_file()),
    };

    match path {
        Some(path) => {
            tracing::debug!(path = %path.display(), "loading config");
            if verbose {
                eprintln!("{} {}", "Using config:".cyan(), path.display());
            }
            Config::from_file(&path)
                .with_context(|| format!("failed to load config from {}", path.display()))
        }
        None => {
            if verbose {
                eprintln!("{}", "No config file found, using defaults".yellow());
            }
            Ok(Config::default())
        }
    }
}

/// Compile command - validate, canonicalize and optionally generate code
fn compile_command(args: &CompileArgs, input: &Path, verbose: bool) -> Result<()> {
    let config = load_config(args.config.as_deref(), input, verbose)?;

    if verbose {
        eprintln!("{} {}", "Compiling tables in:".cyan(), input.display());
    }

    let report = build_report(args, input, &config);

    if let Some(path) = &args.report {
        report
            .save_to_file(path)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        if verbose {
            eprintln!("{} {}", "Report saved to:".green(), path.display());
        }
    }

    print_report_summary(&report);

    if report.has_errors() {
        std::process::exit(1);
    }

    Ok(())
}

/// Run every stage and collect the outcome. Stops at the first error.
fn build_report(args: &CompileArgs, input: &Path, config: &Config) -> Report {
    let mut report = Report::new();
    if let Err(diag) = run_stages(args, input, config, &mut report) {
        report.add_diagnostic(diag);
    }
    report
}

/// Every check, including code generation, runs before any file is written
fn run_stages(
    args: &CompileArgs,
    input: &Path,
    config: &Config,
    report: &mut Report,
) -> std::result::Result<(), Diagnostic> {
    let files = discover(input).map_err(|e| e.to_diagnostic(None))?;
    let compiled = compile(&files).map_err(|e| e.to_diagnostic(source_of(&files, &e)))?;

    for warning in &compiled.warnings {
        report.add_diagnostic(warning.clone());
    }
    report.set_tables(compiled.db.table_names());

    let generated = match &args.output_dir {
        Some(output) => {
            let files = csvdb_codegen::generate(&compiled.db, &compiled.order, config)
                .map_err(|e| e.to_diagnostic(None))?;
            Some((output, files))
        }
        None => None,
    };

    let mode = if args.check || !config.rewrite_sources {
        SourceMode::Check
    } else {
        SourceMode::Rewrite
    };
    let changed = canonicalize(&compiled, mode).map_err(|e| e.to_diagnostic(source_of(&files, &e)))?;

    for path in changed {
        let shown = path.display().to_string();
        let diag = match mode {
            SourceMode::Rewrite => {
                report.add_rewritten(shown.clone());
                Diagnostic::new(DiagnosticCode::FileRewritten, Severity::Info, "rewritten into canonical form")
            }
            SourceMode::Check if args.check => {
                Diagnostic::new(DiagnosticCode::FileNotCanonical, Severity::Error, "not in canonical form")
            }
            SourceMode::Check => {
                Diagnostic::new(DiagnosticCode::FileNotCanonical, Severity::Warn, "not in canonical form")
            }
        };
        report.add_diagnostic(diag.with_location(Location::new(shown)));
    }

    let Some((output, generated)) = generated else {
        return Ok(());
    };

    if args.check {
        for file in &generated {
            let path = output.join(&file.name);
            let current = std::fs::read(&path).unwrap_or_default();
            if current != file.contents.as_bytes() {
                report.add_diagnostic(
                    Diagnostic::new(DiagnosticCode::FileNotCanonical, Severity::Error, "generated code is out of date")
                        .with_location(Location::new(path.display().to_string())),
                );
            }
        }
        return Ok(());
    }

    let written = csvdb_codegen::write_files(output, &generated).map_err(|e| e.to_diagnostic(None))?;
    for path in written {
        report.add_generated(path.display().to_string());
    }

    Ok(())
}

/// Impact command - show every table affected by changing one table
fn impact_command(input: &Path, table: &str) -> Result<()> {
    let files = discover(input)?;
    let db = load_database(&files)?;

    if db.get(table).is_none() {
        anyhow::bail!("Table '{}' not found in {}", table, input.display());
    }

    let graph = DependencyGraph::from_database(&db);
    let dependents = graph.dependents(table);

    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "Table Impact Analysis".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("{} {}", "Table:".bold(), table.green());
    println!("{} {}", "Dependent tables:".bold(), dependents.len());
    println!();

    if dependents.is_empty() {
        println!("{}", "✓ No dependent tables".green());
        println!("This table can be changed without affecting other tables.");
    } else {
        println!("{}", "Affected tables:".bold());
        println!();

        for (i, dep) in dependents.iter().enumerate() {
            let direct = if graph.children(table).contains(&dep) {
                "direct"
            } else {
                "indirect"
            };
            println!("  {}. {} ({})", i + 1, dep.yellow(), direct);
        }

        println!();
        println!("{}", "⚠ Removing rows from this table may break the tables above!".yellow().bold());
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());

    Ok(())
}

fn print_report_summary(report: &Report) {
    println!("\n{}", "=".repeat(60).bright_blue());
    println!("{}", "csvdb Compile Report".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!();

    println!("Version: {}", report.version);
    println!("Timestamp: {}", report.timestamp);
    println!();

    println!("{}", "Summary:".bold());
    println!("  Tables:    {}", report.summary.tables_checked);
    println!("  Rewritten: {}", report.summary.files_rewritten);
    println!("  Generated: {}", report.summary.files_generated);

    if report.summary.errors > 0 {
        println!("  Errors:    {}", format!("{}", report.summary.errors).red().bold());
    } else {
        println!("  Errors:    {}", format!("{}", report.summary.errors).green());
    }

    if report.summary.warnings > 0 {
        println!("  Warnings:  {}", format!("{}", report.summary.warnings).yellow());
    } else {
        println!("  Warnings:  {}", format!("{}", report.summary.warnings).green());
    }
    println!();

    if report.diagnostics.is_empty() {
        println!("{}", "✓ No issues found!".green().bold());
    } else {
        println!("{}", "Diagnostics:".bold());
        for diag in &report.diagnostics {
            let severity_str = match diag.severity {
                Severity::Error => "ERROR".red().bold(),
                Severity::Warn => "WARN".yellow().bold(),
                Severity::Info => "INFO".cyan(),
            };

            println!("  [{}] {}: {}", severity_str, diag.code, diag.message);

            if let Some(loc) = &diag.location {
                print!("    at {}", loc.file);
                if let Some(line) = loc.line {
                    print!(":{}", line);
                }
                println!();
            }

            if let Some(exp) = &diag.expected {
                println!("    Expected: {}", exp);
            }
            if let Some(act) = &diag.actual {
                println!("    Actual:   {}", act);
            }
        }
    }

    if !report.generated.is_empty() {
        println!();
        println!("{}", "Generated:".bold());
        for path in &report.generated {
            println!("  {}", path);
        }
    }

    println!();
    println!("{}", "=".repeat(60).bright_blue());
}
