//! Typed extraction from an untyped configuration tree
//!
//! `Node` pairs a borrowed `serde_json::Value` with its `FieldPath` so every
//! failure names the exact field. `Collector` accumulates errors in document
//! order; fail-fast construction reports the first one, aggregate validation
//! reports all of them.

use serde_json::{Map, Value};

use crate::errors::{ValidationError, ValidationReport, ValidationWarning, ValueKind};
use crate::path::FieldPath;

/// Placeholder for a mandatory value that was never filled in
pub const MISSING_MARKER: &str = "???";

/// Short rendering of a received value for error messages
pub(crate) fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => format!("{:?}", s),
        Value::Array(items) => format!("a sequence of {} item(s)", items.len()),
        Value::Object(_) => "a mapping".to_string(),
    }
}

/// A value located somewhere in the configuration tree
#[derive(Debug, Clone)]
pub(crate) struct Node<'a> {
    value: &'a Value,
    path: FieldPath,
}

impl<'a> Node<'a> {
    pub fn new(value: &'a Value, path: FieldPath) -> Self {
        Self { value, path }
    }

    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    fn mismatch(&self, expected: ValueKind) -> ValidationError {
        ValidationError::TypeMismatch {
            path: self.path.clone(),
            expected,
            received: describe(self.value),
        }
    }

    /// `???` is treated as absent, whatever kind the field expects
    fn present(&self) -> Result<&'a Value, ValidationError> {
        match self.value {
            Value::String(s) if s == MISSING_MARKER => Err(ValidationError::MissingField {
                path: self.path.clone(),
            }),
            other => Ok(other),
        }
    }

    pub fn object(&self) -> Result<Object<'a>, ValidationError> {
        match self.present()? {
            Value::Object(map) => Ok(Object {
                map,
                path: self.path.clone(),
            }),
            _ => Err(self.mismatch(ValueKind::Mapping)),
        }
    }

    pub fn sequence(&self) -> Result<Vec<Node<'a>>, ValidationError> {
        match self.present()? {
            Value::Array(items) => Ok(items
                .iter()
                .enumerate()
                .map(|(idx, item)| Node::new(item, self.path.index(idx)))
                .collect()),
            _ => Err(self.mismatch(ValueKind::Sequence)),
        }
    }

    pub fn text(&self) -> Result<String, ValidationError> {
        match self.present()? {
            Value::String(s) => Ok(s.clone()),
            _ => Err(self.mismatch(ValueKind::Text)),
        }
    }

    /// Integers, integral floats (`3.0`) and numeric strings (`"3"`)
    pub fn integer(&self) -> Result<i64, ValidationError> {
        match self.present()? {
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(i)
                } else if n.is_u64() {
                    Err(self.out_of_range(n.to_string()))
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_finite() && f.fract() == 0.0 => {
                            // i64::MAX as f64 rounds up to 2^63
                            if f >= i64::MIN as f64 && f < i64::MAX as f64 {
                                Ok(f as i64)
                            } else {
                                Err(self.out_of_range(n.to_string()))
                            }
                        }
                        _ => Err(self.mismatch(ValueKind::Integer)),
                    }
                }
            }
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map_err(|_| self.mismatch(ValueKind::Integer)),
            _ => Err(self.mismatch(ValueKind::Integer)),
        }
    }

    fn out_of_range(&self, value: String) -> ValidationError {
        ValidationError::ConstraintViolation {
            path: self.path.clone(),
            constraint: format!("{} <= x <= {}", i64::MIN, i64::MAX),
            value,
        }
    }

    /// Any number or numeric string
    pub fn number(&self) -> Result<f64, ValidationError> {
        match self.present()? {
            Value::Number(n) => n.as_f64().ok_or_else(|| self.mismatch(ValueKind::Number)),
            Value::String(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.mismatch(ValueKind::Number)),
            _ => Err(self.mismatch(ValueKind::Number)),
        }
    }
}

/// A mapping located somewhere in the configuration tree
#[derive(Debug, Clone)]
pub(crate) struct Object<'a> {
    map: &'a Map<String, Value>,
    path: FieldPath,
}

impl<'a> Object<'a> {
    pub fn path(&self) -> &FieldPath {
        &self.path
    }

    /// Required key
    pub fn field(&self, key: &str) -> Result<Node<'a>, ValidationError> {
        self.get(key).ok_or_else(|| ValidationError::MissingField {
            path: self.path.field(key),
        })
    }

    /// Optional key
    pub fn get(&self, key: &str) -> Option<Node<'a>> {
        self.map
            .get(key)
            .map(|value| Node::new(value, self.path.field(key)))
    }

    /// Keys present in the mapping but not in `known`, in mapping order
    pub fn unknown_keys(&self, known: &[&str]) -> Vec<FieldPath> {
        self.map
            .keys()
            .filter(|key| !known.contains(&key.as_str()))
            .map(|key| self.path.field(key))
            .collect()
    }
}

/// Error/warning accumulator threaded through the entity parsers
#[derive(Debug, Default)]
pub(crate) struct Collector {
    errors: Vec<ValidationError>,
    warnings: Vec<ValidationWarning>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the error (if any) and hand back the success value
    pub fn take<T>(&mut self, result: Result<T, ValidationError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.errors.push(error);
                None
            }
        }
    }

    pub fn error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn warn_unknown(&mut self, object: &Object<'_>, known: &[&str]) {
        self.warnings.extend(
            object
                .unknown_keys(known)
                .into_iter()
                .map(|path| ValidationWarning::UnknownField { path }),
        );
    }

    pub fn into_report(self, source: impl Into<String>) -> ValidationReport {
        let mut report = ValidationReport::new(source);
        report.errors = self.errors;
        report.warnings = self.warnings;
        report
    }
}

/// Run an entity parser over `value` rooted at `$`, returning the first
/// recorded error on failure
pub(crate) fn construct<T>(
    value: &Value,
    parse: impl FnOnce(&Node<'_>, &mut Collector) -> Option<T>,
) -> Result<T, ValidationError> {
    let mut collector = Collector::new();
    let parsed = parse(&Node::new(value, FieldPath::root()), &mut collector);

    match (parsed, collector.errors.into_iter().next()) {
        (_, Some(error)) => Err(error),
        (Some(entity), None) => Ok(entity),
        (None, None) => unreachable!("entity parser returned nothing without recording an error"),
    }
}
