//! AgentKern-Connectors: tenant-scoped connector registry with lazy
//! instantiation, persistence, and cross-replica synchronization.
//!
//! See [`registry::ConnectorRegistry`] for the entry point.

pub mod error;
pub mod http_connector;
pub mod mock;
pub mod registry;
pub mod storage;
pub mod traits;
pub mod types;
pub mod url_builder;

pub use error::{ConnectorError, RegistryError};
pub use registry::ConnectorRegistry;
pub use storage::{ConnectorStorage, NullConnectorStorage, PostgresConnectorStorage};
pub use traits::{Connector, ConnectorFactory};
pub use types::{ConnectorConfig, ConnectorHealth, ConnectorKind, Value, WILDCARD_TENANT};
