//! The tenant-scoped connector registry: lazy instantiation, health
//! tracking, and the periodic reload task that keeps replica caches warm.
//!
//! One reader/writer lock guards the in-memory maps; writers are brief and
//! never hold the lock across network I/O. Lazy load uses double-checked
//! locking under the write lock.

use crate::error::RegistryError;
use crate::storage::ConnectorStorage;
use crate::traits::{Connector, ConnectorFactory};
use crate::types::{ConnectorConfig, ConnectorHealth, WILDCARD_TENANT};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

struct State {
    configs: HashMap<String, ConnectorConfig>,
    instances: HashMap<String, Arc<dyn Connector>>,
}

/// Persistent, multi-tenant registry of backend connectors.
///
/// Constructed with a storage backend (possibly the in-memory-only
/// [`crate::storage::NullConnectorStorage`]) and an optional factory for
/// lazy instantiation of connectors whose config is persisted but not yet
/// live in this replica.
pub struct ConnectorRegistry {
    state: RwLock<State>,
    storage: Arc<dyn ConnectorStorage>,
    factory: Option<Arc<dyn ConnectorFactory>>,
}

impl ConnectorRegistry {
    pub fn new(storage: Arc<dyn ConnectorStorage>) -> Self {
        Self {
            state: RwLock::new(State {
                configs: HashMap::new(),
                instances: HashMap::new(),
            }),
            storage,
            factory: None,
        }
    }

    pub fn with_factory(mut self, factory: Arc<dyn ConnectorFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Register `connector` under `name`/`config.id`. Fails if the name
    /// already exists; connects synchronously within `config.timeout`; on
    /// any failure the registry is left unchanged.
    pub async fn register(
        &self,
        connector: Arc<dyn Connector>,
        config: ConnectorConfig,
    ) -> Result<(), RegistryError> {
        {
            let state = self.state.read();
            if state.configs.contains_key(&config.id) {
                return Err(RegistryError::AlreadyExists(config.id));
            }
        }

        timeout(config.timeout, connector.connect(&config))
            .await
            .map_err(|_| RegistryError::Connector(crate::error::ConnectorError::Timeout(config.timeout)))?
            .map_err(RegistryError::Connector)?;

        self.storage.save(&config).await?;

        let mut state = self.state.write();
        state.configs.insert(config.id.clone(), config.clone());
        state.instances.insert(config.id.clone(), connector);
        tracing::info!(connector_id = %config.id, tenant = %config.tenant, "connector registered");
        Ok(())
    }

    /// Disconnect best-effort (failures are logged, not propagated), remove
    /// from memory, and delete the persisted row.
    pub async fn unregister(&self, id: &str) -> Result<(), RegistryError> {
        let instance = {
            let mut state = self.state.write();
            state.configs.remove(id);
            state.instances.remove(id)
        };

        if let Some(instance) = instance {
            if let Err(e) = instance.disconnect().await {
                tracing::warn!(connector_id = %id, error = %e, "disconnect failed during unregister");
            }
        }

        self.storage.delete(id).await?;
        tracing::info!(connector_id = %id, "connector unregistered");
        Ok(())
    }

    /// Fetch a live connector instance, lazily instantiating it from a
    /// persisted config + registered factory if necessary.
    pub async fn get(&self, id: &str) -> Result<Arc<dyn Connector>, RegistryError> {
        if let Some(instance) = self.state.read().instances.get(id).cloned() {
            return Ok(instance);
        }

        let config = {
            let cached = self.state.read().configs.get(id).cloned();
            match cached {
                Some(c) => c,
                None => self
                    .storage
                    .get(id)
                    .await?
                    .ok_or_else(|| RegistryError::NotFound(id.to_string()))?,
            }
        };

        let factory = self.factory.as_ref().ok_or_else(|| RegistryError::NoFactory(config.kind.clone()))?;

        // Double-checked locking: another task may have finished lazy-loading
        // while we were awaiting storage/factory lookups above.
        let mut state = self.state.write();
        if let Some(instance) = state.instances.get(id).cloned() {
            return Ok(instance);
        }

        let connector: Arc<dyn Connector> = factory
            .create(&config.kind)
            .ok_or_else(|| RegistryError::NoFactory(config.kind.clone()))?
            .into();

        state.configs.insert(id.to_string(), config.clone());
        state.instances.insert(id.to_string(), connector.clone());
        drop(state);

        connector
            .connect(&config)
            .await
            .map_err(RegistryError::Connector)?;

        tracing::info!(connector_id = %id, "connector lazily instantiated");
        Ok(connector)
    }

    pub fn get_config(&self, id: &str) -> Option<ConnectorConfig> {
        self.state.read().configs.get(id).cloned()
    }

    pub fn list(&self) -> Vec<String> {
        self.state.read().configs.keys().cloned().collect()
    }

    pub fn list_with_types(&self) -> Vec<(String, String)> {
        self.state
            .read()
            .configs
            .values()
            .map(|c| (c.id.clone(), c.kind.clone()))
            .collect()
    }

    pub fn count(&self) -> usize {
        self.state.read().configs.len()
    }

    /// Every connector config visible to `tenant`: exact match or wildcard.
    pub fn get_connectors_by_tenant(&self, tenant: &str) -> Vec<ConnectorConfig> {
        self.state
            .read()
            .configs
            .values()
            .filter(|c| c.visible_to(tenant))
            .cloned()
            .collect()
    }

    /// Error unless `name`'s tenant is `tenant` or the wildcard.
    pub fn validate_tenant_access(&self, name: &str, tenant: &str) -> Result<(), RegistryError> {
        let config = self
            .state
            .read()
            .configs
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        if config.tenant == tenant || config.tenant == WILDCARD_TENANT {
            Ok(())
        } else {
            Err(RegistryError::TenantAccessDenied {
                name: name.to_string(),
                requested: tenant.to_string(),
                owner: config.tenant,
            })
        }
    }

    /// Health-check a single connector and persist the result.
    pub async fn health_check_single(&self, id: &str) -> Result<ConnectorHealth, RegistryError> {
        let connector = self.get(id).await?;
        let health = match connector.health_check().await {
            Ok(true) => ConnectorHealth::healthy(),
            Ok(false) => ConnectorHealth::unhealthy("health check reported unhealthy"),
            Err(e) => ConnectorHealth::unhealthy(e.to_string()),
        };
        self.storage.update_health(id, &health).await?;
        if let Some(config) = self.state.write().configs.get_mut(id) {
            config.health = Some(health.clone());
        }
        Ok(health)
    }

    /// Health-check every registered connector, tolerating individual failures.
    pub async fn health_check(&self) -> HashMap<String, ConnectorHealth> {
        let ids = self.list();
        let mut results = HashMap::new();
        for id in ids {
            match self.health_check_single(&id).await {
                Ok(health) => {
                    results.insert(id, health);
                }
                Err(e) => {
                    tracing::warn!(connector_id = %id, error = %e, "health check failed");
                    results.insert(id, ConnectorHealth::unhealthy(e.to_string()));
                }
            }
        }
        results
    }

    /// Disconnect every live instance, best-effort.
    pub async fn disconnect_all(&self) {
        let instances: Vec<Arc<dyn Connector>> = self.state.read().instances.values().cloned().collect();
        for instance in instances {
            if let Err(e) = instance.disconnect().await {
                tracing::warn!(error = %e, "disconnect_all: one connector failed to disconnect");
            }
        }
        self.state.write().instances.clear();
    }

    /// Spawn the periodic reload task: at `interval`, fetch the persisted id
    /// list and cache any config not already present (not auto-connected —
    /// new configs become lazy-load candidates). Exits when `cancel` fires.
    pub fn spawn_reload_task(
        self: Arc<Self>,
        interval: Duration,
        cancel: tokio_util::sync::CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::info!("connector registry reload task stopping");
                        return;
                    }
                    _ = ticker.tick() => {
                        if let Err(e) = self.reload_once().await {
                            tracing::warn!(error = %e, "connector registry reload failed");
                        }
                    }
                }
            }
        })
    }

    async fn reload_once(&self) -> Result<(), RegistryError> {
        let configs = self.storage.list().await?;
        let mut state = self.state.write();
        for config in configs {
            state.configs.entry(config.id.clone()).or_insert(config);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnector, MockConnectorFactory};
    use crate::storage::NullConnectorStorage;
    use std::sync::atomic::Ordering;

    fn registry() -> Arc<ConnectorRegistry> {
        Arc::new(ConnectorRegistry::new(Arc::new(NullConnectorStorage)))
    }

    #[tokio::test]
    async fn register_then_get_round_trips() {
        let reg = registry();
        let config = ConnectorConfig::new("c1", "primary db", "postgres", "tenant-a");
        reg.register(Arc::new(MockConnector::new()), config.clone()).await.unwrap();

        assert_eq!(reg.get_config("c1").unwrap().name, "primary db");
        assert!(reg.get("c1").await.is_ok());
    }

    #[tokio::test]
    async fn register_rejects_duplicate_name() {
        let reg = registry();
        let config = ConnectorConfig::new("c1", "primary db", "postgres", "tenant-a");
        reg.register(Arc::new(MockConnector::new()), config.clone()).await.unwrap();
        let err = reg.register(Arc::new(MockConnector::new()), config).await.unwrap_err();
        assert!(matches!(err, RegistryError::AlreadyExists(_)));
    }

    #[tokio::test]
    async fn failed_connect_leaves_registry_unchanged() {
        let reg = registry();
        let config = ConnectorConfig::new("c1", "flaky", "postgres", "tenant-a");
        let err = reg.register(Arc::new(MockConnector::failing()), config).await.unwrap_err();
        assert!(matches!(err, RegistryError::Connector(_)));
        assert_eq!(reg.count(), 0);
    }

    #[tokio::test]
    async fn lazy_load_invokes_factory_exactly_once() {
        let factory = Arc::new(MockConnectorFactory::default());
        let reg = Arc::new(ConnectorRegistry::new(Arc::new(NullConnectorStorage)).with_factory(factory.clone()));

        // Seed a persisted-but-not-instantiated config directly into cache,
        // simulating a config loaded by the periodic reload task.
        let config = ConnectorConfig::new("pg1", "pg1", "postgres", "t1");
        reg.state.write().configs.insert(config.id.clone(), config);

        let a = reg.get("pg1").await.unwrap();
        let b = reg.get("pg1").await.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn get_without_factory_or_config_is_not_found() {
        let reg = registry();
        let err = reg.get("missing").await.unwrap_err();
        assert!(matches!(err, RegistryError::NotFound(_)));
    }

    #[tokio::test]
    async fn tenant_scoping() {
        let reg = registry();
        reg.register(
            Arc::new(MockConnector::new()),
            ConnectorConfig::new("c1", "shared", "postgres", WILDCARD_TENANT),
        )
        .await
        .unwrap();
        reg.register(
            Arc::new(MockConnector::new()),
            ConnectorConfig::new("c2", "scoped", "postgres", "tenant-a"),
        )
        .await
        .unwrap();

        let visible_to_b = reg.get_connectors_by_tenant("tenant-b");
        assert_eq!(visible_to_b.len(), 1);
        assert_eq!(visible_to_b[0].id, "c1");

        assert!(reg.validate_tenant_access("c1", "tenant-b").is_ok());
        assert!(reg.validate_tenant_access("c2", "tenant-b").is_err());
    }

    #[tokio::test]
    async fn unregister_removes_config_and_instance() {
        let reg = registry();
        reg.register(
            Arc::new(MockConnector::new()),
            ConnectorConfig::new("c1", "temp", "postgres", "tenant-a"),
        )
        .await
        .unwrap();
        reg.unregister("c1").await.unwrap();
        assert_eq!(reg.count(), 0);
        assert!(reg.get("c1").await.is_err());
    }
}
