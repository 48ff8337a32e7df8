//! Field paths into a configuration tree
//!
//! Supports:
//! - a.b.c (dot notation)
//! - a[0].b (sequence index)
//! - $.a.b (optional `$` root prefix)
//! - a.0.b (numeric segment treated as an index)
//!
//! Used for three things: naming the offending field in validation errors,
//! addressing command-line overrides, and selecting a sub-part of the
//! configuration for display.

use std::fmt;

use serde_json::Value;

use crate::error::HyperflowError;

/// A single path segment
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
    /// Mapping key: .field
    Field(String),
    /// Sequence index: [0]
    Index(usize),
}

/// Location of a value inside a nested configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<Segment>,
}

impl FieldPath {
    /// The empty path (the whole value)
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse `a.b[0].c`, `$.a.b` or `a.0.c`
    pub fn parse(path: &str) -> Result<Self, HyperflowError> {
        let invalid = || HyperflowError::InvalidPath {
            path: path.to_string(),
        };

        let body = if path == "$" {
            return Ok(Self::root());
        } else if let Some(stripped) = path.strip_prefix("$.") {
            stripped
        } else {
            path
        };

        if body.is_empty() {
            return Err(invalid());
        }

        let mut segments = Vec::new();

        for part in body.split('.') {
            if part.is_empty() {
                return Err(invalid());
            }

            if let Some(bracket_pos) = part.find('[') {
                let field = &part[..bracket_pos];
                if !field.is_empty() {
                    segments.push(Segment::Field(field.to_string()));
                }

                // One or more trailing [n] groups: field[0][1]
                let mut rest = &part[bracket_pos..];
                while !rest.is_empty() {
                    let close = rest.find(']').ok_or_else(invalid)?;
                    if !rest.starts_with('[') {
                        return Err(invalid());
                    }
                    let index: usize = rest[1..close].parse().map_err(|_| invalid())?;
                    segments.push(Segment::Index(index));
                    rest = &rest[close + 1..];
                }
            } else if let Ok(index) = part.parse::<usize>() {
                segments.push(Segment::Index(index));
            } else {
                segments.push(Segment::Field(part.to_string()));
            }
        }

        Ok(Self { segments })
    }

    /// Child path for a mapping key
    pub fn field(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Field(name.to_string()));
        Self { segments }
    }

    /// Child path for a sequence element
    pub fn index(&self, idx: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(Segment::Index(idx));
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The first `len` segments
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            segments: self.segments[..len.min(self.segments.len())].to_vec(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Last mapping key on the path, if the path ends in one
    pub fn leaf(&self) -> Option<&str> {
        match self.segments.last() {
            Some(Segment::Field(name)) => Some(name.as_str()),
            _ => None,
        }
    }

    /// Walk `value` along this path (borrowed, no cloning)
    pub fn resolve<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        let mut current = value;
        for segment in &self.segments {
            current = match segment {
                Segment::Field(name) => current.get(name)?,
                Segment::Index(idx) => current.get(*idx)?,
            };
        }
        Some(current)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "$");
        }
        for (i, segment) in self.segments.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{}", name)?,
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(idx) => write!(f, "[{}]", idx)?,
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for FieldPath {
    type Err = HyperflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
