//! Test double for [`crate::traits::Connector`]: records calls, never
//! touches the network, and can be told to fail on demand.

use crate::error::ConnectorError;
use crate::traits::{Connector, ConnectorFactory};
use crate::types::{ConnectorConfig, ExecuteResult, Rows, Statement};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

#[derive(Default)]
pub struct MockConnector {
    connected: AtomicBool,
    pub connect_calls: AtomicU32,
    pub fail_connect: AtomicBool,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let m = Self::default();
        m.fail_connect.store(true, Ordering::SeqCst);
        m
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }
    fn kind(&self) -> &str {
        "mock"
    }
    fn version(&self) -> &str {
        "0.0.0"
    }
    fn capabilities(&self) -> Vec<String> {
        vec!["query".to_string(), "execute".to_string()]
    }

    async fn connect(&self, _config: &ConnectorConfig) -> Result<(), ConnectorError> {
        self.connect_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect.load(Ordering::SeqCst) {
            return Err(ConnectorError::ConnectionFailed("mock configured to fail".to_string()));
        }
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ConnectorError> {
        Ok(self.connected.load(Ordering::SeqCst))
    }

    async fn query(&self, _stmt: &Statement) -> Result<Rows, ConnectorError> {
        Ok(Vec::new())
    }

    async fn execute(&self, _stmt: &Statement) -> Result<ExecuteResult, ConnectorError> {
        Ok(ExecuteResult {
            success: true,
            rows_affected: 0,
            duration: std::time::Duration::from_millis(0),
            message: None,
        })
    }
}

/// A factory that always hands out fresh [`MockConnector`]s, tracking how
/// many times it was invoked so tests can assert lazy-load happens once.
#[derive(Default)]
pub struct MockConnectorFactory {
    pub calls: AtomicU32,
}

impl ConnectorFactory for MockConnectorFactory {
    fn create(&self, _kind: &str) -> Option<Box<dyn Connector>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Some(Box::new(MockConnector::new()))
    }
}
