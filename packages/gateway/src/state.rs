//! Shared application state composed from every pillar.

use agentkern_connectors::{ConnectorFactory, ConnectorRegistry};
use agentkern_gate::PolicyEngine;
use agentkern_kernel::{GatewayConfig, LicenseValidator};
use agentkern_nexus::Router;
use agentkern_replay::ExecutionReplayStore;
use std::sync::Arc;

pub struct AppState {
    pub config: GatewayConfig,
    pub policy_engine: Arc<PolicyEngine>,
    pub connector_registry: Arc<ConnectorRegistry>,
    pub connector_factory: Arc<dyn ConnectorFactory>,
    pub router: Arc<dyn Router>,
    pub replay_store: Arc<ExecutionReplayStore>,
    pub license_validator: Arc<dyn LicenseValidator>,
}
