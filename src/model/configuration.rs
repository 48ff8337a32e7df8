//! Aggregate root: connection + structure + hyperparameters

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::HyperflowError;
use crate::errors::{ValidationError, ValidationReport};
use crate::extract::{construct, Collector, Node};
use crate::path::FieldPath;

use super::{Connection, Hyperparameters, Structure};

/// Legacy name some config files use for the `structure` block
const STRUCTURE_ALIAS: &str = "schema";

/// Validated input for one workflow run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Configuration {
    connection: Connection,
    structure: Structure,
    hyperparameters: Hyperparameters,
}

impl Configuration {
    const FIELDS: &'static [&'static str] =
        &["connection", "structure", STRUCTURE_ALIAS, "hyperparameters"];

    /// Assemble from parts that were each validated on construction
    pub fn new(connection: Connection, structure: Structure, hyperparameters: Hyperparameters) -> Self {
        Self {
            connection,
            structure,
            hyperparameters,
        }
    }

    /// Fail-fast construction: the first error in document order
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        construct(value, Self::parse)
    }

    /// Parse YAML text, then construct
    pub fn from_yaml_str(yaml: &str) -> Result<Self, HyperflowError> {
        let value: Value = serde_yaml::from_str(yaml).map_err(|source| HyperflowError::YamlParse {
            origin: "<inline>".to_string(),
            source,
        })?;
        Ok(Self::from_value(&value)?)
    }

    /// Aggregate validation: every field-level error plus unknown-key
    /// warnings, without building anything
    pub fn validate(value: &Value, source: impl Into<String>) -> ValidationReport {
        let mut collector = Collector::new();
        let _ = Self::parse(&Node::new(value, FieldPath::root()), &mut collector);
        let report = collector.into_report(source);
        debug!(
            source = %report.source,
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            "configuration validated"
        );
        report
    }

    pub(crate) fn parse(node: &Node<'_>, c: &mut Collector) -> Option<Self> {
        let object = c.take(node.object())?;
        c.warn_unknown(&object, Self::FIELDS);

        let connection = c
            .take(object.field("connection"))
            .and_then(|n| Connection::parse(&n, c));

        let structure = match (object.get("structure"), object.get(STRUCTURE_ALIAS)) {
            (Some(n), None) | (None, Some(n)) => Structure::parse(&n, c),
            (Some(n), Some(_)) => {
                c.error(ValidationError::ConstraintViolation {
                    path: n.path().clone(),
                    constraint: format!("only one of `structure` or `{}`", STRUCTURE_ALIAS),
                    value: "both present".to_string(),
                });
                None
            }
            (None, None) => {
                c.error(ValidationError::MissingField {
                    path: object.path().field("structure"),
                });
                None
            }
        };

        let hyperparameters = c
            .take(object.field("hyperparameters"))
            .and_then(|n| Hyperparameters::parse(&n, c));

        Some(Self {
            connection: connection?,
            structure: structure?,
            hyperparameters: hyperparameters?,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn hyperparameters(&self) -> &Hyperparameters {
        &self.hyperparameters
    }

    /// Copy safe to display (password masked)
    pub fn redacted(&self) -> Self {
        Self {
            connection: self.connection.redacted(),
            ..self.clone()
        }
    }

    /// Redacted copy as an untyped tree, for display and sub-part selection
    pub fn to_display_value(&self) -> Result<Value, HyperflowError> {
        Ok(serde_json::to_value(self.redacted())?)
    }
}
