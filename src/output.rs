//! Output format for displayed payloads and reports

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{HyperflowError, Result};

/// Output format enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Scalars as-is, mappings and sequences as YAML (default)
    #[default]
    Text,

    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    pub fn render(&self, value: &Value) -> Result<String> {
        match self {
            OutputFormat::Text => match value {
                Value::String(s) => Ok(s.clone()),
                Value::Null => Ok("null".to_string()),
                Value::Bool(_) | Value::Number(_) => Ok(value.to_string()),
                Value::Array(_) | Value::Object(_) => {
                    let yaml = serde_yaml::to_string(value).map_err(HyperflowError::Render)?;
                    Ok(yaml.trim_end().to_string())
                }
            },
            OutputFormat::Json => Ok(serde_json::to_string_pretty(value)?),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("unknown format '{}' (expected text or json)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_format_from_yaml() {
        let format: OutputFormat = serde_yaml::from_str("json").unwrap();
        assert_eq!(format, OutputFormat::Json);
    }

    #[test]
    fn default_is_text() {
        assert_eq!(OutputFormat::default(), OutputFormat::Text);
    }

    #[test]
    fn from_str_accepts_either_case() {
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn text_renders_scalars_raw() {
        let text = OutputFormat::Text;
        assert_eq!(text.render(&json!(0.1)).unwrap(), "0.1");
        assert_eq!(text.render(&json!("huber")).unwrap(), "huber");
        assert_eq!(text.render(&json!(true)).unwrap(), "true");
    }

    #[test]
    fn text_renders_mappings_as_yaml() {
        let rendered = OutputFormat::Text
            .render(&json!({"name": "x1", "type": "float"}))
            .unwrap();
        assert!(rendered.contains("name: x1"));
        assert!(rendered.contains("type: float"));
        assert!(!rendered.ends_with('\n'));
    }

    #[test]
    fn json_is_pretty() {
        let rendered = OutputFormat::Json.render(&json!({"a": 1})).unwrap();
        assert_eq!(rendered, "{\n  \"a\": 1\n}");
    }
}
