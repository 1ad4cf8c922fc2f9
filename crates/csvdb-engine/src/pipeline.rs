//! Compiler driver
//!
//! Runs the stages in order over one schema directory:
//! discover -> load -> resolve -> sort -> validate -> order.
//! Nothing is written until every stage has passed; canonical source text is
//! written afterwards by [`canonicalize`].

use crate::dag::DependencyGraph;
use crate::resolver::resolve;
use crate::sorter::sort_tables;
use crate::validator::validate;
use crate::writer::{to_csv_string, write_if_changed};
use csvdb_core::{Database, Diagnostic, Error, Result, TableKind};
use csvdb_parse::load_file;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A fully validated schema
#[derive(Debug)]
pub struct Compilation {
    pub db: Database,

    /// Non-enum tables in code emission order
    pub order: Vec<String>,

    /// Non-fatal findings, such as case-folded enum names
    pub warnings: Vec<Diagnostic>,
}

/// What to do with source files whose text is not canonical
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceMode {
    /// Rewrite them in place
    Rewrite,

    /// Leave them alone and report them
    Check,
}

/// Find the table files of a schema directory.
///
/// Only the directory itself is scanned. Any regular file with a `.csv`
/// extension (any case) is a table. Enum tables come first, the rest follow
/// by file name.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(Error::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::io(dir, e.into()))?;
        if !entry.file_type().is_file() {
            continue;
        }

        let is_csv = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(entry.into_path());
        }
    }

    files.sort_by_key(|path| {
        let stem = table_name(path);
        (TableKind::from_name(&stem) != TableKind::Enum, stem)
    });

    tracing::debug!(dir = %dir.display(), files = files.len(), "discovered tables");
    Ok(files)
}

/// Table name of a source file
pub fn table_name(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Load every file into one database
pub fn load_database(files: &[PathBuf]) -> Result<Database> {
    let mut db = Database::new();
    for path in files {
        let table = load_file(path)?;
        db.insert(table)?;
    }
    Ok(db)
}

/// Run every validating stage over the given table files
pub fn compile(files: &[PathBuf]) -> Result<Compilation> {
    let mut db = load_database(files)?;
    let warnings = resolve(&mut db)?;
    sort_tables(&mut db)?;
    validate(&db)?;
    let order = DependencyGraph::from_database(&db).emission_order()?;

    tracing::info!(tables = db.len(), "schema is valid");
    Ok(Compilation {
        db,
        order,
        warnings,
    })
}

/// Discover and compile a schema directory
pub fn compile_dir(dir: &Path) -> Result<Compilation> {
    compile(&discover(dir)?)
}

/// Bring every source file into canonical form.
///
/// In [`SourceMode::Rewrite`] returns the files that were rewritten; in
/// [`SourceMode::Check`] returns the files that would have been.
pub fn canonicalize(compilation: &Compilation, mode: SourceMode) -> Result<Vec<PathBuf>> {
    let mut changed = Vec::new();

    for table in compilation.db.tables() {
        let Some(path) = table.source.as_deref() else {
            continue;
        };
        let text = to_csv_string(&compilation.db, table);

        let differs = match mode {
            SourceMode::Rewrite => write_if_changed(path, &text)?,
            SourceMode::Check => {
                let existing = std::fs::read(path).map_err(|e| Error::io(path, e))?;
                existing != text.as_bytes()
            }
        };

        if differs {
            changed.push(path.to_path_buf());
        }
    }

    Ok(changed)
}

/// Source file an error points into, when it names a table
pub fn source_of<'a>(files: &'a [PathBuf], err: &Error) -> Option<&'a Path> {
    let table = err.table()?;
    files
        .iter()
        .find(|path| table_name(path) == table)
        .map(PathBuf::as_path)
}
