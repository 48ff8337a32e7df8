//! Layered configuration loading
//!
//! Sources, lowest to highest precedence:
//!
//! 1. Base file `<config_dir>/<config_name>.yaml`
//! 2. Override files, in the order given
//! 3. Environment (`HYPERFLOW_DB_PASSWORD` -> `connection.password`)
//! 4. Command-line overrides: `key.path=value` replaces an existing key,
//!    `+key.path=value` adds a new one, `++key.path=value` sets either way,
//!    `~key.path` deletes
//!
//! Mappings merge key by key; any other value replaces what was there.
//! This is deliberately a plain deep-merge: no defaults lists, config
//! groups or interpolation.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::error::{HyperflowError, Result};
use crate::model::Configuration;
use crate::path::{FieldPath, Segment};

pub const DEFAULT_CONFIG_DIR: &str = "config";
pub const DEFAULT_CONFIG_NAME: &str = "config";

/// Environment variable that supplies `connection.password`
pub const PASSWORD_ENV: &str = "HYPERFLOW_DB_PASSWORD";

/// `key.path=value`, `+key.path=value`, `++key.path=value` or `~key.path`
static OVERRIDE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?s)^(?P<prefix>~|\+\+|\+)?(?P<key>[A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z_][A-Za-z0-9_]*|\.[0-9]+|\[[0-9]+\])*)(?:=(?P<value>.*))?$",
    )
    .expect("override pattern is valid")
});

/// How a set override treats the key it targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetMode {
    /// `key=value`: the key must already exist
    Replace,
    /// `+key=value`: the key must not exist yet; missing parents are created
    Add,
    /// `++key=value`: add or replace
    Upsert,
}

/// One command-line override
#[derive(Debug, Clone, PartialEq)]
pub enum Override {
    Set { path: FieldPath, value: Value, mode: SetMode },
    Delete { path: FieldPath },
}

impl FromStr for Override {
    type Err = HyperflowError;

    fn from_str(input: &str) -> Result<Self> {
        let invalid = |reason: &str| HyperflowError::InvalidOverride {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let caps = OVERRIDE_PATTERN
            .captures(input)
            .ok_or_else(|| invalid("expected key.path=value or ~key.path"))?;

        let path = FieldPath::parse(&caps["key"])?;
        let prefix = caps.name("prefix").map_or("", |m| m.as_str());

        match (prefix, caps.name("value")) {
            ("~", None) => Ok(Override::Delete { path }),
            ("~", Some(_)) => Err(invalid("a deletion takes no value")),
            (_, None) => Err(invalid("missing '='")),
            (prefix, Some(raw)) => Ok(Override::Set {
                path,
                value: parse_scalar(raw.as_str()).map_err(|e| invalid(&e.to_string()))?,
                mode: match prefix {
                    "+" => SetMode::Add,
                    "++" => SetMode::Upsert,
                    _ => SetMode::Replace,
                },
            }),
        }
    }
}

/// Override values are YAML: `0.1` is a number, `huber` is text,
/// `[a, b]` is a sequence; an empty value is the empty string
fn parse_scalar(raw: &str) -> std::result::Result<Value, serde_yaml::Error> {
    if raw.is_empty() {
        return Ok(Value::String(String::new()));
    }
    serde_yaml::from_str(raw)
}

impl Override {
    pub fn path(&self) -> &FieldPath {
        match self {
            Override::Set { path, .. } | Override::Delete { path } => path,
        }
    }

    /// Apply to `root` in place
    pub fn apply(&self, root: &mut Value) -> Result<()> {
        match self {
            Override::Set { path, value, mode } => set_path(root, path, value.clone(), *mode),
            Override::Delete { path } => delete_path(root, path),
        }
    }
}

/// Composes configuration sources into one untyped tree
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: PathBuf,
    config_name: String,
    override_files: Vec<PathBuf>,
    env_overrides: Vec<Override>,
    overrides: Vec<Override>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_NAME)
    }
}

impl ConfigLoader {
    pub fn new(config_dir: impl Into<PathBuf>, config_name: impl Into<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
            config_name: config_name.into(),
            override_files: Vec::new(),
            env_overrides: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Merge another YAML file over the base (later files win)
    pub fn with_override_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.override_files.push(path.into());
        self
    }

    /// Parse and queue `key=value` / `+key=value` / `++key=value` / `~key` overrides
    pub fn with_overrides<I, S>(mut self, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for item in items {
            self.overrides.push(item.as_ref().parse()?);
        }
        Ok(self)
    }

    /// Merge with environment variables
    pub fn with_env(self) -> Self {
        self.with_env_from(|name| std::env::var(name).ok())
    }

    /// Same as [`with_env`](Self::with_env) with an injectable lookup
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(password) = lookup(PASSWORD_ENV).filter(|p| !p.is_empty()) {
            debug!(var = PASSWORD_ENV, "password supplied by environment");
            self.env_overrides.push(Override::Set {
                path: FieldPath::root().field("connection").field("password"),
                value: Value::String(password),
                mode: SetMode::Upsert,
            });
        }
        self
    }

    /// Path of the base file; `.yaml` is appended unless an extension is given,
    /// and `.yml` is tried when `.yaml` does not exist
    pub fn base_path(&self) -> PathBuf {
        let name = Path::new(&self.config_name);
        if name.extension().is_some() {
            return self.config_dir.join(name);
        }
        let yaml = self.config_dir.join(format!("{}.yaml", self.config_name));
        let yml = self.config_dir.join(format!("{}.yml", self.config_name));
        if !yaml.exists() && yml.exists() {
            yml
        } else {
            yaml
        }
    }

    /// Short human description of the sources, used as report origin
    pub fn describe_sources(&self) -> String {
        let mut description = self.base_path().display().to_string();
        if !self.override_files.is_empty() {
            description.push_str(&format!(" + {} override file(s)", self.override_files.len()));
        }
        if !self.overrides.is_empty() {
            description.push_str(&format!(" + {} override(s)", self.overrides.len()));
        }
        description
    }

    /// Compose every layer into one tree
    pub fn load(&self) -> Result<Value> {
        let base_path = self.base_path();
        let mut merged = read_mapping(&base_path)?;
        info!(path = %base_path.display(), "loaded base config");

        for file in &self.override_files {
            let layer = read_mapping(file)?;
            merge(&mut merged, layer);
            debug!(path = %file.display(), "merged override file");
        }

        for item in self.env_overrides.iter().chain(&self.overrides) {
            item.apply(&mut merged)?;
            debug!(path = %item.path(), "applied override");
        }

        Ok(merged)
    }

    /// Load, then construct (fail-fast); unknown keys are logged at warn level
    pub fn load_configuration(&self) -> Result<Configuration> {
        let value = self.load()?;
        let config = Configuration::from_value(&value)?;
        for warning in Configuration::validate(&value, self.describe_sources()).warnings {
            warn!("{}", warning);
        }
        Ok(config)
    }
}

/// Deep-merge `overlay` into `base`
pub fn merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn read_mapping(path: &Path) -> Result<Value> {
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => HyperflowError::ConfigNotFound {
            path: path.display().to_string(),
        },
        _ => HyperflowError::Io(e),
    })?;

    if text.trim().is_empty() {
        return Ok(Value::Object(Map::new()));
    }

    let value: Value = serde_yaml::from_str(&text).map_err(|source| HyperflowError::YamlParse {
        origin: path.display().to_string(),
        source,
    })?;

    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(value),
        _ => Err(HyperflowError::NotAMapping {
            path: path.display().to_string(),
        }),
    }
}

fn set_path(root: &mut Value, path: &FieldPath, value: Value, mode: SetMode) -> Result<()> {
    let segments = path.segments();
    let Some((last, parents)) = segments.split_last() else {
        *root = value;
        return Ok(());
    };

    let blocked = |depth: usize, reason: &str| HyperflowError::InvalidOverride {
        input: path.to_string(),
        reason: format!("'{}' {}", path.prefix(depth), reason),
    };
    let creates = mode != SetMode::Replace;
    let absent = "does not exist (use +key.path=value to add it)";

    let mut current = root;
    for (depth, segment) in parents.iter().enumerate() {
        current = match segment {
            Segment::Field(name) => {
                if creates && current.is_null() {
                    *current = Value::Object(Map::new());
                }
                let Value::Object(map) = current else {
                    return Err(blocked(depth, "is not a mapping"));
                };
                if creates {
                    map.entry(name.clone()).or_insert(Value::Null)
                } else {
                    map.get_mut(name).ok_or_else(|| blocked(depth + 1, absent))?
                }
            }
            Segment::Index(idx) => {
                let Value::Array(items) = current else {
                    return Err(blocked(depth, "is not a sequence"));
                };
                items
                    .get_mut(*idx)
                    .ok_or_else(|| blocked(depth + 1, "does not exist"))?
            }
        };
    }

    let depth = parents.len();
    let check = |exists: bool| match (mode, exists) {
        (SetMode::Replace, false) => Err(blocked(depth + 1, absent)),
        (SetMode::Add, true) => Err(blocked(depth + 1, "already exists (use key.path=value to replace it)")),
        _ => Ok(()),
    };

    match last {
        Segment::Field(name) => {
            if creates && current.is_null() {
                *current = Value::Object(Map::new());
            }
            let Value::Object(map) = current else {
                return Err(blocked(depth, "is not a mapping"));
            };
            check(map.contains_key(name))?;
            map.insert(name.clone(), value);
        }
        Segment::Index(idx) => {
            let Value::Array(items) = current else {
                return Err(blocked(depth, "is not a sequence"));
            };
            if *idx > items.len() {
                return Err(blocked(depth + 1, "is past the end of the sequence"));
            }
            check(*idx < items.len())?;
            if *idx < items.len() {
                items[*idx] = value;
            } else {
                items.push(value);
            }
        }
    }
    Ok(())
}

fn delete_path(root: &mut Value, path: &FieldPath) -> Result<()> {
    let missing = || HyperflowError::InvalidOverride {
        input: format!("~{}", path),
        reason: "nothing to delete at this path".to_string(),
    };

    let Some((last, _)) = path.segments().split_last() else {
        return Err(missing());
    };
    let parent_path = path.prefix(path.segments().len() - 1);

    let mut current = root;
    for segment in parent_path.segments() {
        current = match segment {
            Segment::Field(name) => current.get_mut(name.as_str()),
            Segment::Index(idx) => current.get_mut(*idx),
        }
        .ok_or_else(missing)?;
    }

    let removed = match (current, last) {
        (Value::Object(map), Segment::Field(name)) => map.remove(name).is_some(),
        (Value::Array(items), Segment::Index(idx)) if *idx < items.len() => {
            items.remove(*idx);
            true
        }
        _ => false,
    };

    if removed {
        Ok(())
    } else {
        Err(missing())
    }
}
