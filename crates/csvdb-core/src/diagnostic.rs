//! Diagnostic codes and error reporting
//!
//! IMPORTANT: Diagnostic codes are versioned and stable.
//! NEVER rename or remove codes - they are part of the public API.
//! Add new codes with new names only.

use serde::{Deserialize, Serialize};

/// Diagnostic code registry (v1)
///
/// These codes are STABLE and VERSIONED.
/// Do NOT rename or remove codes - only add new ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DiagnosticCode {
    // Source text (1xxx)
    /// A row has a different number of fields than the header
    CsvRaggedRow,

    /// A header cell does not follow the column grammar
    HeaderMalformed,

    /// Two columns in one table share a name
    ColumnDuplicate,

    /// Two files map to the same table name
    TableDuplicate,

    /// A table or column name cannot be used as an identifier
    NameInvalid,

    // Values (2xxx)
    /// A cell cannot be converted to its column type
    ValueInvalid,

    /// A cell lies outside the column's min/max bounds
    ValueOutOfRange,

    /// Two rows share the same key tuple
    KeyDuplicate,

    // References (3xxx)
    /// A foreign link names a table that does not exist
    ForeignTableMissing,

    /// A foreign link targets a table with no key columns
    ForeignTableKeyless,

    /// Local columns do not pair up with a composite foreign key
    ForeignKeyMismatch,

    /// A row references a key tuple that does not exist
    ForeignKeyBroken,

    /// A cell names an enum member that does not exist
    EnumMemberUnknown,

    // Shapes and graph (4xxx)
    /// An Enum table does not have the required layout
    EnumShape,

    /// A Global table does not hold exactly one row
    GlobalShape,

    /// Foreign links form a loop while resolving column types
    LinkCycle,

    /// Strong foreign links form a cycle between tables
    DependencyCycle,

    // Environment (8xxx)
    /// Reading or writing a file failed
    Io,

    /// Rendering generated code failed
    CodegenTemplate,

    /// Two generated identifiers collide, or a name is reserved by the backend
    CodegenName,

    /// A composite link key cannot be searched as one generated id
    CodegenKeyLayout,

    // General (9xxx)
    /// A source file was rewritten into canonical form
    FileRewritten,

    /// A source file is not in canonical form (check mode)
    FileNotCanonical,

    /// General informational message
    Info,

    /// General warning message
    Warning,
}

impl DiagnosticCode {
    /// Get the diagnostic code as a stable string identifier
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CsvRaggedRow => "CSV_RAGGED_ROW",
            Self::HeaderMalformed => "HEADER_MALFORMED",
            Self::ColumnDuplicate => "COLUMN_DUPLICATE",
            Self::TableDuplicate => "TABLE_DUPLICATE",
            Self::NameInvalid => "NAME_INVALID",
            Self::ValueInvalid => "VALUE_INVALID",
            Self::ValueOutOfRange => "VALUE_OUT_OF_RANGE",
            Self::KeyDuplicate => "KEY_DUPLICATE",
            Self::ForeignTableMissing => "FOREIGN_TABLE_MISSING",
            Self::ForeignTableKeyless => "FOREIGN_TABLE_KEYLESS",
            Self::ForeignKeyMismatch => "FOREIGN_KEY_MISMATCH",
            Self::ForeignKeyBroken => "FOREIGN_KEY_BROKEN",
            Self::EnumMemberUnknown => "ENUM_MEMBER_UNKNOWN",
            Self::EnumShape => "ENUM_SHAPE",
            Self::GlobalShape => "GLOBAL_SHAPE",
            Self::LinkCycle => "LINK_CYCLE",
            Self::DependencyCycle => "DEPENDENCY_CYCLE",
            Self::Io => "IO",
            Self::CodegenTemplate => "CODEGEN_TEMPLATE",
            Self::CodegenName => "CODEGEN_NAME",
            Self::CodegenKeyLayout => "CODEGEN_KEY_LAYOUT",
            Self::FileRewritten => "FILE_REWRITTEN",
            Self::FileNotCanonical => "FILE_NOT_CANONICAL",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Diagnostic severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational message
    Info,

    /// Warning - should be reviewed but not blocking
    Warn,

    /// Error - blocking issue that fails the run
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Warn => write!(f, "warn"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Source location in a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// File path as given on the command line
    pub file: String,

    /// Optional line number (1-indexed)
    pub line: Option<usize>,
}

impl Location {
    /// Create a new location with just a file path
    pub fn new(file: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line: None,
        }
    }

    /// Create a location with file and line number
    pub fn with_line(file: impl Into<String>, line: usize) -> Self {
        Self {
            file: file.into(),
            line: Some(line),
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{}", self.file, line),
            None => write!(f, "{}", self.file),
        }
    }
}

/// A diagnostic message with structured metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Stable diagnostic code
    pub code: DiagnosticCode,

    /// Severity level
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Source location (best-effort)
    pub location: Option<Location>,

    /// Expected value (for comparison diagnostics)
    pub expected: Option<String>,

    /// Actual value (for comparison diagnostics)
    pub actual: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic with minimal fields
    pub fn new(code: DiagnosticCode, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            code,
            severity,
            message: message.into(),
            location: None,
            expected: None,
            actual: None,
        }
    }

    /// Set the location
    pub fn with_location(mut self, location: Location) -> Self {
        self.location = Some(location);
        self
    }

    /// Set expected/actual values
    pub fn with_comparison(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }
}
