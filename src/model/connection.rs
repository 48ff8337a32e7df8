//! Data source connection settings

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ValidationError;
use crate::extract::{construct, Collector, Node};

/// Characters of a secret left visible by [`Connection::redacted`]
const VISIBLE_SECRET_CHARS: usize = 2;

/// Credentials and target for a data source
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub struct Connection {
    pub driver: String,
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
}

impl Connection {
    pub(crate) const FIELDS: &'static [&'static str] =
        &["driver", "username", "password", "host", "port", "database"];

    /// Parse and validate a connection mapping
    pub fn from_value(value: &Value) -> Result<Self, ValidationError> {
        construct(value, Self::parse)
    }

    pub(crate) fn parse(node: &Node<'_>, c: &mut Collector) -> Option<Self> {
        let object = c.take(node.object())?;
        c.warn_unknown(&object, Self::FIELDS);

        let driver = c.take(object.field("driver").and_then(|n| n.text()));
        let username = c.take(object.field("username").and_then(|n| n.text()));
        let password = c.take(object.field("password").and_then(|n| n.text()));
        let host = c.take(object.field("host").and_then(|n| n.text()));
        let port = c.take(object.field("port").and_then(|n| parse_port(&n)));
        let database = c.take(object.field("database").and_then(|n| n.text()));

        Some(Self {
            driver: driver?,
            username: username?,
            password: password?,
            host: host?,
            port: port?,
            database: database?,
        })
    }

    /// Copy with the password masked, for anything that gets displayed
    pub fn redacted(&self) -> Self {
        Self {
            password: mask_secret(&self.password, VISIBLE_SECRET_CHARS),
            ..self.clone()
        }
    }
}

fn parse_port(node: &Node<'_>) -> Result<u16, ValidationError> {
    let port = node.integer()?;
    u16::try_from(port).map_err(|_| ValidationError::ConstraintViolation {
        path: node.path().clone(),
        constraint: "0 <= port <= 65535".to_string(),
        value: port.to_string(),
    })
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("driver", &self.driver)
            .field("username", &self.username)
            .field("password", &mask_secret(&self.password, VISIBLE_SECRET_CHARS))
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .finish()
    }
}

/// Mask a secret for display
///
/// Shows the first N chars + asterisks, e.g. "hu***". Secrets of at most
/// 2N chars are fully masked, so the visible prefix is never the whole secret.
pub fn mask_secret(secret: &str, visible_chars: usize) -> String {
    if secret.is_empty() {
        return String::new();
    }
    if secret.chars().count() <= visible_chars.saturating_mul(2) {
        return "***".to_string();
    }

    let visible: String = secret.chars().take(visible_chars).collect();
    format!("{}***", visible)
}
