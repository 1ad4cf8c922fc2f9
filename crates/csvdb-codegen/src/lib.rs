//! Code generation for validated csvdb schemas
//!
//! A [`CodegenModel`] is built once from the database and its emission
//! order, then handed to the [`Backend`] selected by the config target. Each
//! backend writes a declarations and a definitions artifact through the
//! shared template [`Renderer`]. Only types and lookups are generated, never
//! row data.

pub mod cpp;
pub mod model;
pub mod render;
pub mod rust;

pub use cpp::CppBackend;
pub use model::{CodegenModel, EnumMember, EnumModel, FieldKind, FieldModel, FindParam, RecordModel};
pub use render::Renderer;
pub use rust::RustBackend;

use csvdb_core::{Config, Database, Diagnostic, DiagnosticCode, Severity, TargetLanguage};
use std::path::{Path, PathBuf};

/// One generated artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// File name inside the output directory
    pub name: String,

    pub contents: String,
}

impl GeneratedFile {
    pub fn new(name: impl Into<String>, contents: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
        }
    }
}

/// Code generation error
#[derive(Debug, thiserror::Error)]
pub enum CodegenError {
    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Schema(#[from] csvdb_core::Error),

    #[error("tables '{table}': generated name '{name}' is used twice")]
    NameClash { table: String, name: String },

    #[error("table '{table}': '{name}' is reserved in generated code")]
    ReservedName { table: String, name: String },

    #[error("table '{table}': key columns of link '{link}' must be adjacent and in the key order of '{foreign}'")]
    KeyLayout { table: String, link: String, foreign: String },
}

impl CodegenError {
    /// Convert to a diagnostic, located in `file` when known
    pub fn to_diagnostic(&self, file: Option<&Path>) -> Diagnostic {
        let code = match self {
            Self::Schema(err) => return err.to_diagnostic(file),
            Self::Template(_) => DiagnosticCode::CodegenTemplate,
            Self::NameClash { .. } | Self::ReservedName { .. } => DiagnosticCode::CodegenName,
            Self::KeyLayout { .. } => DiagnosticCode::CodegenKeyLayout,
        };
        Diagnostic::new(code, Severity::Error, self.to_string())
    }
}

/// A code generation target
pub trait Backend {
    /// Render the artifacts for a model
    fn generate(
        &self,
        renderer: &Renderer,
        model: &CodegenModel,
        config: &Config,
    ) -> Result<Vec<GeneratedFile>, CodegenError>;
}

/// Backend for a target language
pub fn backend_for(target: TargetLanguage) -> Box<dyn Backend> {
    match target {
        TargetLanguage::Cpp => Box::new(CppBackend),
        TargetLanguage::Rust => Box::new(RustBackend),
    }
}

/// Generate the artifacts for a validated database
pub fn generate(
    db: &Database,
    order: &[String],
    config: &Config,
) -> Result<Vec<GeneratedFile>, CodegenError> {
    let model = CodegenModel::build(db, order)?;
    model.check_type_names()?;

    let renderer = Renderer::new()?;
    let files = backend_for(config.target).generate(&renderer, &model, config)?;

    tracing::debug!(
        language = ?config.target,
        enums = model.enums.len(),
        records = model.records.len(),
        "generated code"
    );
    Ok(files)
}

/// Write artifacts into `dir`, creating it if needed. Files whose contents
/// are unchanged are left untouched. Returns every artifact path.
pub fn write_files(dir: &Path, files: &[GeneratedFile]) -> Result<Vec<PathBuf>, CodegenError> {
    std::fs::create_dir_all(dir).map_err(|e| csvdb_core::Error::io(dir, e))?;

    let mut paths = Vec::with_capacity(files.len());
    for file in files {
        let path = dir.join(&file.name);
        csvdb_engine::write_if_changed(&path, &file.contents)?;
        paths.push(path);
    }
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn diagnostics_use_codegen_codes() {
        let err = CodegenError::NameClash {
            table: "EnumTier, Tier".into(),
            name: "Tier".into(),
        };
        assert_eq!(err.to_diagnostic(None).code, DiagnosticCode::CodegenName);

        let err = CodegenError::Schema(csvdb_core::Error::DuplicateTable { table: "A".into() });
        assert_eq!(err.to_diagnostic(None).code, DiagnosticCode::TableDuplicate);
    }

    #[test]
    fn write_files_creates_the_directory_and_skips_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("gen");
        let files = vec![GeneratedFile::new("DB.h", "// h\n"), GeneratedFile::new("DB.cpp", "// cpp\n")];

        let paths = write_files(&out, &files).unwrap();
        assert_eq!(paths, vec![out.join("DB.h"), out.join("DB.cpp")]);
        assert_eq!(std::fs::read_to_string(out.join("DB.h")).unwrap(), "// h\n");

        assert!(!csvdb_engine::write_if_changed(&out.join("DB.cpp"), "// cpp\n").unwrap());
    }
}
