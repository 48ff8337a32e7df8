//! Data table structure: one target column plus ordered feature columns

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ValidationError;
use crate::extract::{construct, Collector, Node};

/// One data-table field descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Column {
    pub name: String,
    /// Free-form type name ("float", "varchar(32)", ...), not checked
    #[serde(rename = "type")]
    pub type_name: String,
    pub description: String,
}

impl Column {
    pub(crate) const FIELDS: &'static [&'static str] = &["name", "type", "description"];

    pub fn new(
        name: impl Into<String>,
        type_name: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: description.into(),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        construct(value, Self::parse)
    }

    pub(crate) fn parse(node: &Node<'_>, c: &mut Collector) -> Option<Self> {
        let object = c.take(node.object())?;
        c.warn_unknown(&object, Self::FIELDS);

        let name = c.take(object.field("name").and_then(|n| n.text()));
        let type_name = c.take(object.field("type").and_then(|n| n.text()));
        let description = c.take(object.field("description").and_then(|n| n.text()));

        Some(Self {
            name: name?,
            type_name: type_name?,
            description: description?,
        })
    }
}

/// Target column and feature columns of a data table
///
/// Feature names are unique, and the target's name is not reused as a
/// feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Structure {
    target: Column,
    features: Vec<Column>,
}

impl Structure {
    pub(crate) const FIELDS: &'static [&'static str] = &["target", "features"];

    /// Build from already-typed columns, applying the naming rules
    pub fn new(target: Column, features: Vec<Column>) -> Result<Self, ValidationError> {
        let value = serde_json::json!({ "target": target, "features": features });
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        construct(value, Self::parse)
    }

    pub(crate) fn parse(node: &Node<'_>, c: &mut Collector) -> Option<Self> {
        let object = c.take(node.object())?;
        c.warn_unknown(&object, Self::FIELDS);

        let target = c
            .take(object.field("target"))
            .and_then(|n| Column::parse(&n, c));

        let features: Option<Vec<Option<Column>>> = c
            .take(object.field("features").and_then(|n| n.sequence()))
            .map(|items| items.iter().map(|item| Column::parse(item, c)).collect());

        let mut names_ok = true;
        if let Some(features) = &features {
            let features_path = object.path().field("features");
            let mut seen: HashMap<&str, usize> = HashMap::new();

            for (idx, column) in features.iter().enumerate() {
                let Some(column) = column else { continue };
                if seen.insert(column.name.as_str(), idx).is_some() {
                    c.error(ValidationError::ConstraintViolation {
                        path: features_path.index(idx).field("name"),
                        constraint: "unique feature name".to_string(),
                        value: column.name.clone(),
                    });
                    names_ok = false;
                }
            }

            if let Some(target) = &target {
                if seen.contains_key(target.name.as_str()) {
                    c.error(ValidationError::ConstraintViolation {
                        path: object.path().field("target").field("name"),
                        constraint: "target name not listed among features".to_string(),
                        value: target.name.clone(),
                    });
                    names_ok = false;
                }
            }
        }

        if !names_ok {
            return None;
        }

        Some(Self {
            target: target?,
            features: features?.into_iter().collect::<Option<Vec<_>>>()?,
        })
    }

    pub fn target(&self) -> &Column {
        &self.target
    }

    /// Feature columns in declaration order
    pub fn features(&self) -> &[Column] {
        &self.features
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.features.iter().map(|column| column.name.as_str())
    }
}
