//! Connector Registry error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("operation timed out after {0:?}")]
    Timeout(std::time::Duration),
    #[error("not supported: {0}")]
    NotSupported(String),
    #[error("blocked by SSRF guard: {0}")]
    SsrfBlocked(String),
    #[error("internal connector error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("connector '{0}' already registered")]
    AlreadyExists(String),
    #[error("connector '{0}' not found")]
    NotFound(String),
    #[error("no factory registered for connector type '{0}'")]
    NoFactory(String),
    #[error("tenant '{requested}' may not access connector '{name}' scoped to tenant '{owner}'")]
    TenantAccessDenied {
        name: String,
        requested: String,
        owner: String,
    },
    #[error(transparent)]
    Connector(#[from] ConnectorError),
    #[error("storage error: {0}")]
    Storage(String),
}
