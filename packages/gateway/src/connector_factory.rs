//! Dispatches connector creation by type string to a concrete connector
//! implementation, without the registry ever seeing the concrete type.

use agentkern_connectors::http_connector::HttpConnector;
use agentkern_connectors::mock::MockConnector;
use agentkern_connectors::{Connector, ConnectorFactory};

#[derive(Default)]
pub struct DefaultConnectorFactory;

impl ConnectorFactory for DefaultConnectorFactory {
    fn create(&self, kind: &str) -> Option<Box<dyn Connector>> {
        match kind {
            "http" | "rest-api" => Some(Box::new(HttpConnector::new())),
            _ => Some(Box::new(MockConnector::new())),
        }
    }
}
