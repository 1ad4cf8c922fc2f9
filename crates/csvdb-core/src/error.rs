//! Compiler errors
//!
//! Every failure is fatal for the run. Each variant carries enough context
//! (table, column, line, offending literal) to find the source row, and maps
//! to exactly one stable [`DiagnosticCode`].

use crate::diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
use crate::field::FieldType;
use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Compiler error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("table '{table}' line {line}: row has {found} fields but the header has {expected}")]
    RaggedRow {
        table: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("table '{table}': malformed header '{header}': {reason}")]
    MalformedHeader {
        table: String,
        header: String,
        reason: String,
    },

    #[error("table '{table}': duplicate column '{column}'")]
    DuplicateColumn { table: String, column: String },

    #[error("duplicate table name '{table}'")]
    DuplicateTable { table: String },

    #[error("table '{table}': '{name}' is not a valid {what} name")]
    InvalidName {
        table: String,
        name: String,
        what: &'static str,
    },

    #[error("table '{table}' column '{column}'{}: '{value}' is not a valid {expected}", at_line(.line))]
    InvalidValue {
        table: String,
        column: String,
        line: Option<usize>,
        value: String,
        expected: FieldType,
    },

    #[error("table '{table}' column '{column}' line {line}: value {value} is outside [{min}, {max}]")]
    RangeViolation {
        table: String,
        column: String,
        line: usize,
        value: String,
        min: String,
        max: String,
    },

    #[error("table '{table}' line {line}: duplicate key ({key})")]
    DuplicateKey {
        table: String,
        line: usize,
        key: String,
    },

    #[error("table '{table}' column '{column}': linked table '{foreign}' does not exist")]
    MissingForeignTable {
        table: String,
        column: String,
        foreign: String,
    },

    #[error("table '{table}' column '{column}': linked table '{foreign}' has no key columns")]
    ForeignTableWithoutKey {
        table: String,
        column: String,
        foreign: String,
    },

    #[error("table '{table}' column '{column}': cannot pair with the key of '{foreign}': {reason}")]
    CompositeKeyMismatch {
        table: String,
        column: String,
        foreign: String,
        reason: String,
    },

    #[error("table '{table}' column '{column}' line {line}: no row ({key}) in linked table '{foreign}'")]
    BrokenReference {
        table: String,
        column: String,
        foreign: String,
        line: usize,
        key: String,
    },

    #[error("table '{table}' column '{column}'{}: '{value}' is not a member of '{enum_table}'", at_line(.line))]
    UnknownEnumMember {
        table: String,
        column: String,
        enum_table: String,
        line: Option<usize>,
        value: String,
    },

    #[error("enum table '{table}': {reason}")]
    EnumShape { table: String, reason: String },

    #[error("global table '{table}' must have exactly one row, found {rows}")]
    GlobalShape { table: String, rows: usize },

    #[error("table '{table}' column '{column}': foreign links loop back on themselves ({path})")]
    LinkCycle {
        table: String,
        column: String,
        path: String,
    },

    #[error("recursive table link {path}: use \"*Table\" instead of \"+Table\" on one link")]
    DependencyCycle { table: String, path: String },

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn at_line(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" line {}", line),
        None => String::new(),
    }
}

impl Error {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Stable diagnostic code for this error
    pub fn code(&self) -> DiagnosticCode {
        match self {
            Self::RaggedRow { .. } => DiagnosticCode::CsvRaggedRow,
            Self::MalformedHeader { .. } => DiagnosticCode::HeaderMalformed,
            Self::DuplicateColumn { .. } => DiagnosticCode::ColumnDuplicate,
            Self::DuplicateTable { .. } => DiagnosticCode::TableDuplicate,
            Self::InvalidName { .. } => DiagnosticCode::NameInvalid,
            Self::InvalidValue { .. } => DiagnosticCode::ValueInvalid,
            Self::RangeViolation { .. } => DiagnosticCode::ValueOutOfRange,
            Self::DuplicateKey { .. } => DiagnosticCode::KeyDuplicate,
            Self::MissingForeignTable { .. } => DiagnosticCode::ForeignTableMissing,
            Self::ForeignTableWithoutKey { .. } => DiagnosticCode::ForeignTableKeyless,
            Self::CompositeKeyMismatch { .. } => DiagnosticCode::ForeignKeyMismatch,
            Self::BrokenReference { .. } => DiagnosticCode::ForeignKeyBroken,
            Self::UnknownEnumMember { .. } => DiagnosticCode::EnumMemberUnknown,
            Self::EnumShape { .. } => DiagnosticCode::EnumShape,
            Self::GlobalShape { .. } => DiagnosticCode::GlobalShape,
            Self::LinkCycle { .. } => DiagnosticCode::LinkCycle,
            Self::DependencyCycle { .. } => DiagnosticCode::DependencyCycle,
            Self::Io { .. } => DiagnosticCode::Io,
        }
    }

    /// Table the error was found in, if any
    pub fn table(&self) -> Option<&str> {
        match self {
            Self::RaggedRow { table, .. }
            | Self::MalformedHeader { table, .. }
            | Self::DuplicateColumn { table, .. }
            | Self::DuplicateTable { table }
            | Self::InvalidName { table, .. }
            | Self::InvalidValue { table, .. }
            | Self::RangeViolation { table, .. }
            | Self::DuplicateKey { table, .. }
            | Self::MissingForeignTable { table, .. }
            | Self::ForeignTableWithoutKey { table, .. }
            | Self::CompositeKeyMismatch { table, .. }
            | Self::BrokenReference { table, .. }
            | Self::UnknownEnumMember { table, .. }
            | Self::EnumShape { table, .. }
            | Self::GlobalShape { table, .. }
            | Self::LinkCycle { table, .. }
            | Self::DependencyCycle { table, .. } => Some(table),
            Self::Io { .. } => None,
        }
    }

    /// Source line (1-indexed) the error points at, if known
    pub fn line(&self) -> Option<usize> {
        match self {
            Self::RaggedRow { line, .. }
            | Self::RangeViolation { line, .. }
            | Self::DuplicateKey { line, .. }
            | Self::BrokenReference { line, .. } => Some(*line),
            Self::InvalidValue { line, .. } | Self::UnknownEnumMember { line, .. } => *line,
            Self::MalformedHeader { .. } | Self::DuplicateColumn { .. } => Some(1),
            _ => None,
        }
    }

    /// Convert to a diagnostic, locating it in `file` when known
    pub fn to_diagnostic(&self, file: Option<&Path>) -> Diagnostic {
        let mut diag = Diagnostic::new(self.code(), Severity::Error, self.to_string());

        let file = file
            .map(|p| p.display().to_string())
            .or_else(|| match self {
                Self::Io { path, .. } => Some(path.display().to_string()),
                _ => None,
            });

        if let Some(file) = file {
            let location = match self.line() {
                Some(line) => Location::with_line(file, line),
                None => Location::new(file),
            };
            diag = diag.with_location(location);
        }

        match self {
            Self::RaggedRow { expected, found, .. } => {
                diag = diag.with_comparison(format!("{} fields", expected), format!("{} fields", found));
            }
            Self::InvalidValue { value, expected, .. } => {
                diag = diag.with_comparison(expected.keyword(), value.clone());
            }
            Self::RangeViolation { value, min, max, .. } => {
                diag = diag.with_comparison(format!("[{}, {}]", min, max), value.clone());
            }
            _ => {}
        }

        diag
    }
}
