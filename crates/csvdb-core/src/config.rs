//! Configuration schema (csvdb.toml)

use serde::{Deserialize, Serialize};

/// Language of the generated code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetLanguage {
    /// C++ header and source (`DB.h`, `DB.cpp`)
    #[default]
    Cpp,

    /// Rust modules (`db_types.rs`, `db.rs`)
    Rust,
}

impl TargetLanguage {
    /// Default file names for the declarations and definitions artifacts
    pub fn default_file_names(&self) -> (&'static str, &'static str) {
        match self {
            Self::Cpp => ("DB.h", "DB.cpp"),
            Self::Rust => ("db_types.rs", "db.rs"),
        }
    }
}

/// Optional overrides for generated file names
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OutputNames {
    /// Type declarations artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declarations: Option<String>,

    /// Definitions artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definitions: Option<String>,
}

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Generated code language
    #[serde(default)]
    pub target: TargetLanguage,

    /// Namespace wrapping generated C++ code
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Rewrite source CSV files into canonical form
    #[serde(default = "default_true")]
    pub rewrite_sources: bool,

    /// Generated file names
    #[serde(default)]
    pub output: OutputNames,
}

fn default_namespace() -> String {
    "DB".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            target: TargetLanguage::default(),
            namespace: default_namespace(),
            rewrite_sources: true,
            output: OutputNames::default(),
        }
    }
}

impl Config {
    /// Load config from TOML file
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Self::from_toml(&contents)
    }

    /// Load config from TOML string
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Save config to TOML file
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let toml = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, toml)
            .map_err(|e| ConfigError::IoError(e.to_string()))?;

        Ok(())
    }

    /// File name of the declarations artifact
    pub fn declarations_file(&self) -> String {
        self.output
            .declarations
            .clone()
            .unwrap_or_else(|| self.target.default_file_names().0.to_string())
    }

    /// File name of the definitions artifact
    pub fn definitions_file(&self) -> String {
        self.output
            .definitions
            .clone()
            .unwrap_or_else(|| self.target.default_file_names().1.to_string())
    }
}

/// Config error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.target, TargetLanguage::Cpp);
        assert_eq!(config.namespace, "DB");
        assert!(config.rewrite_sources);
        assert_eq!(config.declarations_file(), "DB.h");
        assert_eq!(config.definitions_file(), "DB.cpp");
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn rust_target_with_override() {
        let config = Config::from_toml(
            r#"
            target = "rust"
            rewrite_sources = false

            [output]
            definitions = "database.rs"
            "#,
        )
        .unwrap();

        assert_eq!(config.target, TargetLanguage::Rust);
        assert!(!config.rewrite_sources);
        assert_eq!(config.declarations_file(), "db_types.rs");
        assert_eq!(config.definitions_file(), "database.rs");
    }

    #[test]
    fn unknown_target_is_rejected() {
        let err = Config::from_toml("target = \"cobol\"").unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn config_toml_roundtrip() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        let parsed: Config = toml::from_str(&toml).unwrap();
        assert_eq!(config, parsed);
    }
}
