//! csvdb Core
//!
//! Core domain model shared by every pipeline stage: the closed field type
//! system, the table/column model, errors and their diagnostic codes.
//! Never rename diagnostic codes - they are part of the public API.

pub mod config;
pub mod diagnostic;
pub mod error;
pub mod field;
pub mod naming;
pub mod report;
pub mod schema;

pub use config::{Config, ConfigError, OutputNames, TargetLanguage};
pub use diagnostic::{Diagnostic, DiagnosticCode, Location, Severity};
pub use error::{Error, Result};
pub use field::{Field, FieldType};
pub use report::{Report, ReportSummary, ReportVersion};
pub use schema::{
    ColumnSpec, Database, EnumIndex, EnumMatch, ForeignLink, LinkStrength, Newline, Resolution,
    Row, Table, TableKind, TextLayout,
};
