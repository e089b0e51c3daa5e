//! Core connector data model.
//!
//! Connector options and credentials are untyped maps, modeled here as
//! `HashMap<String, Value>` where `Value` is a small tagged union rather
//! than `serde_json::Value` directly, so validators can match on shape
//! without pulling in a JSON-specific type at every call site.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// The distinguished tenant value meaning "visible to all tenants".
pub const WILDCARD_TENANT: &str = "*";

/// A dynamic configuration value. Mirrors the shape of JSON scalars/containers
/// without depending on `serde_json::Value` at the API boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

pub type Options = HashMap<String, Value>;
pub type Credentials = HashMap<String, String>;

/// The connector's type tag, e.g. `relational-db`, `cache`, `rest-api`.
/// Kept as an owned string (not an enum) since the registry's factory
/// indirection is keyed by arbitrary type strings registered at startup.
pub type ConnectorKind = String;

/// Everything the registry persists about one connector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub id: String,
    pub name: String,
    pub kind: ConnectorKind,
    /// Tenant identity, or [`WILDCARD_TENANT`] for "all tenants".
    pub tenant: String,
    pub options: Options,
    pub credentials: Credentials,
    pub timeout: Duration,
    pub retry_count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health: Option<ConnectorHealth>,
}

impl ConnectorConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: impl Into<String>, tenant: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            tenant: tenant.into(),
            options: Options::new(),
            credentials: Credentials::new(),
            timeout: Duration::from_secs(30),
            retry_count: 3,
            health: None,
        }
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn with_credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(key.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Whether this config is visible to `tenant`: exact match or wildcard.
    pub fn visible_to(&self, tenant: &str) -> bool {
        self.tenant == tenant || self.tenant == WILDCARD_TENANT
    }
}

/// Connector health, tracked per-instance and persisted alongside config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectorHealth {
    pub healthy: bool,
    pub last_checked_ms: i64,
    pub message: Option<String>,
}

impl ConnectorHealth {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            last_checked_ms: chrono::Utc::now().timestamp_millis(),
            message: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            last_checked_ms: chrono::Utc::now().timestamp_millis(),
            message: Some(message.into()),
        }
    }
}

/// A query/execute statement plus positional or named parameters.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Statement {
    pub statement: String,
    pub parameters: Vec<Value>,
}

/// Rows returned from `Connector::query`: each row is a column->value map.
pub type Rows = Vec<HashMap<String, Value>>;

/// The result of `Connector::execute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecuteResult {
    pub success: bool,
    pub rows_affected: u64,
    pub duration: Duration,
    pub message: Option<String>,
}
