//! Error types with fix suggestions

use thiserror::Error;

use crate::errors::ValidationError;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

#[derive(Error, Debug)]
pub enum HyperflowError {
    #[error("YAML parse error in {origin}: {source}")]
    YamlParse {
        origin: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ─────────────────────────────────────────────────────────────
    // Loader errors (HF-020 to HF-022)
    // ─────────────────────────────────────────────────────────────
    #[error("HF-020: Config file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("HF-021: Invalid override '{input}': {reason}")]
    InvalidOverride { input: String, reason: String },

    #[error("HF-022: Config file {path} must contain a mapping at the top level")]
    NotAMapping { path: String },

    // ─────────────────────────────────────────────────────────────
    // Path and selection errors (HF-030 to HF-031)
    // ─────────────────────────────────────────────────────────────
    #[error("HF-030: Invalid path syntax: {path}")]
    InvalidPath { path: String },

    #[error("HF-031: Selector '{selector}' matches nothing in the configuration")]
    InvalidSelector { selector: String },

    // ─────────────────────────────────────────────────────────────
    // Driver errors (HF-040 to HF-042)
    // ─────────────────────────────────────────────────────────────
    #[error("HF-040: Unknown backend '{name}'")]
    UnknownBackend { name: String },

    #[error("HF-041: Execution error: {0}")]
    Execution(String),

    #[error("HF-042: Failed to render output: {0}")]
    Render(#[source] serde_yaml::Error),
}

impl FixSuggestion for HyperflowError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            HyperflowError::YamlParse { .. } => Some("Check YAML syntax: indentation and quoting"),
            HyperflowError::Validation(inner) => inner.fix_suggestion(),
            HyperflowError::Io(_) => Some("Check file path and permissions"),
            HyperflowError::Json(_) => None,
            HyperflowError::ConfigNotFound { .. } => {
                Some("Pass --config-dir/--config-name pointing at an existing <name>.yaml")
            }
            HyperflowError::InvalidOverride { .. } => {
                Some("Use key.path=value to replace an existing value, +key.path=value to add a new one, or ~key.path to delete one")
            }
            HyperflowError::NotAMapping { .. } => {
                Some("Start the file with top-level keys such as connection:, structure:, hyperparameters:")
            }
            HyperflowError::InvalidPath { .. } => Some("Use format: block.field or block.list[0].field"),
            HyperflowError::InvalidSelector { .. } => {
                Some("Select an existing field, e.g. hyperparameters.learning_rate")
            }
            HyperflowError::UnknownBackend { .. } => Some("Available backends: local"),
            HyperflowError::Execution(_) => None,
            HyperflowError::Render(_) => Some("Use --format json for values YAML cannot represent"),
        }
    }
}

pub type Result<T> = std::result::Result<T, HyperflowError>;
