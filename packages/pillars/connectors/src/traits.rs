//! The connector wire contract and the factory indirection the registry
//! uses to create connectors by type string without knowing concrete types.

use crate::error::ConnectorError;
use crate::types::{ConnectorConfig, ExecuteResult, Rows, Statement};
use async_trait::async_trait;

/// A typed capability object brokering reads (`query`) and writes (`execute`)
/// to a backend system.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;
    fn kind(&self) -> &str;
    fn version(&self) -> &str;
    fn capabilities(&self) -> Vec<String>;

    async fn connect(&self, config: &ConnectorConfig) -> Result<(), ConnectorError>;
    async fn disconnect(&self) -> Result<(), ConnectorError>;
    async fn health_check(&self) -> Result<bool, ConnectorError>;

    async fn query(&self, stmt: &Statement) -> Result<Rows, ConnectorError>;
    async fn execute(&self, stmt: &Statement) -> Result<ExecuteResult, ConnectorError>;
}

/// Registered at startup per connector type string; the registry holds a
/// reference to this trait object but never knows the concrete connector
/// type it produces ("Factory indirection").
pub trait ConnectorFactory: Send + Sync {
    fn create(&self, kind: &str) -> Option<Box<dyn Connector>>;
}
