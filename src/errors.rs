//! Validation error types
//!
//! Structured errors for configuration construction, one variant per
//! failure kind, each naming the offending field path so the message can
//! point straight at the line to fix.

use std::fmt;

use serde_json::{json, Value};
use thiserror::Error;

use crate::error::FixSuggestion;
use crate::path::FieldPath;

/// Primitive kind expected at a field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Text,
    Integer,
    Number,
    Mapping,
    Sequence,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Text => write!(f, "text"),
            ValueKind::Integer => write!(f, "integer"),
            ValueKind::Number => write!(f, "number"),
            ValueKind::Mapping => write!(f, "mapping"),
            ValueKind::Sequence => write!(f, "sequence"),
        }
    }
}

/// A single construction failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("HF-010: Missing field '{path}'")]
    MissingField { path: FieldPath },

    #[error("HF-011: Type mismatch at '{path}': expected {expected}, got {received}")]
    TypeMismatch {
        path: FieldPath,
        expected: ValueKind,
        received: String,
    },

    #[error("HF-012: '{path}' must satisfy {constraint} (got {value})")]
    ConstraintViolation {
        path: FieldPath,
        constraint: String,
        value: String,
    },

    #[error("HF-013: Invalid value '{value}' at '{path}' (expected one of: {})", .allowed.join(", "))]
    InvalidEnumValue {
        path: FieldPath,
        value: String,
        allowed: &'static [&'static str],
    },

    #[error("HF-014: The model is not complex enough: max_depth + n_estimators = {sum} (must be >= {threshold})")]
    ComplexityViolation { sum: u64, threshold: u64 },
}

impl ValidationError {
    /// Path of the offending field (cross-field errors have none)
    pub fn path(&self) -> Option<&FieldPath> {
        match self {
            ValidationError::MissingField { path }
            | ValidationError::TypeMismatch { path, .. }
            | ValidationError::ConstraintViolation { path, .. }
            | ValidationError::InvalidEnumValue { path, .. } => Some(path),
            ValidationError::ComplexityViolation { .. } => None,
        }
    }

    /// True for malformed fields, false for semantically insufficient configs
    pub fn is_field_error(&self) -> bool {
        !matches!(self, ValidationError::ComplexityViolation { .. })
    }

    /// Stable error code (HF-0xx)
    pub fn code(&self) -> &'static str {
        match self {
            ValidationError::MissingField { .. } => "HF-010",
            ValidationError::TypeMismatch { .. } => "HF-011",
            ValidationError::ConstraintViolation { .. } => "HF-012",
            ValidationError::InvalidEnumValue { .. } => "HF-013",
            ValidationError::ComplexityViolation { .. } => "HF-014",
        }
    }
}

impl FixSuggestion for ValidationError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ValidationError::MissingField { .. } => {
                Some("Add the field to the config file or pass it as an override (key=value)")
            }
            ValidationError::TypeMismatch { .. } => {
                Some("Check the value's type: quote text, leave numbers unquoted")
            }
            ValidationError::ConstraintViolation { .. } => {
                Some("Adjust the value to fall inside the allowed range")
            }
            ValidationError::InvalidEnumValue { .. } => {
                Some("Use one of the listed tokens exactly (matching is case-sensitive)")
            }
            ValidationError::ComplexityViolation { .. } => {
                Some("Increase max_depth or n_estimators so their sum is at least 4")
            }
        }
    }
}

/// Non-fatal finding reported by aggregate validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationWarning {
    #[error("Unknown field '{path}' is ignored")]
    UnknownField { path: FieldPath },
}

impl FixSuggestion for ValidationWarning {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            ValidationWarning::UnknownField { .. } => {
                Some("Remove the key or check its spelling against the documented fields")
            }
        }
    }
}

/// Result of validating a whole configuration in aggregate mode
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub source: String,
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// The error fail-fast construction would have reported
    pub fn first_error(&self) -> Option<&ValidationError> {
        self.errors.first()
    }

    /// Collapse into the fail-fast outcome
    pub fn into_result(self) -> Result<(), ValidationError> {
        match self.errors.into_iter().next() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Machine-readable form for `validate --format json`
    pub fn to_json(&self) -> Value {
        let errors: Vec<Value> = self
            .errors
            .iter()
            .map(|e| {
                json!({
                    "code": e.code(),
                    "path": e.path().map(|p| p.to_string()),
                    "message": e.to_string(),
                })
            })
            .collect();
        let warnings: Vec<Value> = self.warnings.iter().map(|w| json!(w.to_string())).collect();

        json!({
            "source": self.source,
            "valid": self.is_valid(),
            "errors": errors,
            "warnings": warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(s: &str) -> FieldPath {
        FieldPath::parse(s).unwrap()
    }

    #[test]
    fn test_missing_field_message_names_path() {
        let error = ValidationError::MissingField {
            path: path("connection.port"),
        };
        assert_eq!(error.to_string(), "HF-010: Missing field 'connection.port'");
        assert_eq!(error.code(), "HF-010");
    }

    #[test]
    fn test_enum_message_lists_allowed_tokens() {
        let error = ValidationError::InvalidEnumValue {
            path: path("hyperparameters.loss"),
            value: "Huber".to_string(),
            allowed: &["squared_error", "absolute_error", "huber", "quantile"],
        };
        let msg = error.to_string();
        assert!(msg.contains("'Huber'"));
        assert!(msg.contains("squared_error, absolute_error, huber, quantile"));
    }

    #[test]
    fn test_complexity_is_not_a_field_error() {
        let error = ValidationError::ComplexityViolation { sum: 3, threshold: 4 };
        assert!(!error.is_field_error());
        assert!(error.path().is_none());
        assert!(error.to_string().contains("not complex enough"));
        assert!(error.to_string().contains("= 3"));

        let field = ValidationError::MissingField { path: path("a") };
        assert!(field.is_field_error());
    }

    #[test]
    fn test_report_collects_errors_and_warnings() {
        let mut report = ValidationReport::new("config.yaml");
        assert!(report.is_valid());
        assert!(!report.has_warnings());

        report.errors.push(ValidationError::MissingField { path: path("a") });
        report.errors.push(ValidationError::MissingField { path: path("b") });
        report.warnings.push(ValidationWarning::UnknownField { path: path("c") });

        assert!(!report.is_valid());
        assert!(report.has_warnings());
        assert_eq!(report.first_error().unwrap().path().unwrap().to_string(), "a");

        let json = report.to_json();
        assert_eq!(json["valid"], false);
        assert_eq!(json["errors"].as_array().unwrap().len(), 2);
        assert_eq!(json["errors"][1]["path"], "b");
        assert_eq!(json["warnings"][0], "Unknown field 'c' is ignored");

        let err = report.into_result().unwrap_err();
        assert_eq!(err, ValidationError::MissingField { path: path("a") });
    }

    #[test]
    fn test_every_error_has_suggestion() {
        let errors = [
            ValidationError::MissingField { path: path("a") },
            ValidationError::TypeMismatch {
                path: path("a"),
                expected: ValueKind::Integer,
                received: "\"x\"".to_string(),
            },
            ValidationError::ComplexityViolation { sum: 2, threshold: 4 },
        ];
        for error in errors {
            assert!(error.fix_suggestion().is_some());
        }
    }
}
