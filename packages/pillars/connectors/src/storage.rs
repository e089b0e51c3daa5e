//! Pluggable connector persistence.
//!
//! A single `connectors` table keyed by id, JSON columns for
//! options/credentials/health, `(name, tenant_id)` uniqueness, indices on
//! `tenant_id` and `type`. Connection opening retries 5 times with quadratic
//! backoff (2s, 4s, 6s, 8s — i.e. `2 * attempt` seconds for attempts 1..=4)
//! to tolerate slow DNS init in containerized environments.

use crate::error::RegistryError;
use crate::types::{ConnectorConfig, ConnectorHealth};
use async_trait::async_trait;
use std::time::Duration;

#[async_trait]
pub trait ConnectorStorage: Send + Sync {
    async fn save(&self, config: &ConnectorConfig) -> Result<(), RegistryError>;
    async fn get(&self, id: &str) -> Result<Option<ConnectorConfig>, RegistryError>;
    async fn delete(&self, id: &str) -> Result<(), RegistryError>;
    async fn list(&self) -> Result<Vec<ConnectorConfig>, RegistryError>;
    async fn list_by_tenant(&self, tenant: &str) -> Result<Vec<ConnectorConfig>, RegistryError>;
    async fn update_health(&self, id: &str, health: &ConnectorHealth) -> Result<(), RegistryError>;
}

/// Postgres-backed [`ConnectorStorage`]. Schema is initialized once at
/// construction; connection opening retries with quadratic backoff.
pub struct PostgresConnectorStorage {
    pool: sqlx::PgPool,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS connectors (
    id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    type TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    options JSONB NOT NULL DEFAULT '{}',
    credentials JSONB NOT NULL DEFAULT '{}',
    timeout_ms BIGINT NOT NULL,
    retry_count INT NOT NULL,
    health JSONB,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    UNIQUE (name, tenant_id)
);
CREATE INDEX IF NOT EXISTS idx_connectors_tenant_id ON connectors (tenant_id);
CREATE INDEX IF NOT EXISTS idx_connectors_type ON connectors (type);
"#;

impl PostgresConnectorStorage {
    /// Connect with up to 5 attempts, waiting `2 * attempt` seconds between
    /// attempts 1..4 (2s, 4s, 6s, 8s) before the final attempt, then run the
    /// schema initializer once.
    pub async fn connect(database_url: &str) -> Result<Self, RegistryError> {
        let pool = Self::connect_with_retry(database_url).await?;
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| RegistryError::Storage(format!("schema init failed: {e}")))?;
        Ok(Self { pool })
    }

    async fn connect_with_retry(database_url: &str) -> Result<sqlx::PgPool, RegistryError> {
        const MAX_ATTEMPTS: u32 = 5;
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match sqlx::PgPool::connect(database_url).await {
                Ok(pool) => return Ok(pool),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "connector storage connect attempt failed");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
                    }
                }
            }
        }
        Err(RegistryError::Storage(format!(
            "failed to connect after {MAX_ATTEMPTS} attempts: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

#[async_trait]
impl ConnectorStorage for PostgresConnectorStorage {
    async fn save(&self, config: &ConnectorConfig) -> Result<(), RegistryError> {
        let options = serde_json::to_value(&config.options)
            .map_err(|e| RegistryError::Storage(e.to_string()))?;
        let credentials = serde_json::to_value(&config.credentials)
            .map_err(|e| RegistryError::Storage(e.to_string()))?;
        let health = config
            .health
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RegistryError::Storage(e.to_string()))?;

        sqlx::query(
            r#"
            INSERT INTO connectors (id, name, type, tenant_id, options, credentials, timeout_ms, retry_count, health, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, now())
            ON CONFLICT (id) DO UPDATE SET
                name = EXCLUDED.name,
                type = EXCLUDED.type,
                tenant_id = EXCLUDED.tenant_id,
                options = EXCLUDED.options,
                credentials = EXCLUDED.credentials,
                timeout_ms = EXCLUDED.timeout_ms,
                retry_count = EXCLUDED.retry_count,
                health = EXCLUDED.health,
                updated_at = now()
            "#,
        )
        .bind(&config.id)
        .bind(&config.name)
        .bind(&config.kind)
        .bind(&config.tenant)
        .bind(options)
        .bind(credentials)
        .bind(config.timeout.as_millis() as i64)
        .bind(config.retry_count as i32)
        .bind(health)
        .execute(&self.pool)
        .await
        .map_err(|e| RegistryError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<ConnectorConfig>, RegistryError> {
        let row: Option<ConnectorRow> = sqlx::query_as(
            "SELECT id, name, type, tenant_id, options, credentials, timeout_ms, retry_count, health FROM connectors WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RegistryError::Storage(e.to_string()))?;
        row.map(ConnectorRow::into_config).transpose()
    }

    async fn delete(&self, id: &str) -> Result<(), RegistryError> {
        sqlx::query("DELETE FROM connectors WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<ConnectorConfig>, RegistryError> {
        let rows: Vec<ConnectorRow> = sqlx::query_as(
            "SELECT id, name, type, tenant_id, options, credentials, timeout_ms, retry_count, health FROM connectors",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RegistryError::Storage(e.to_string()))?;
        rows.into_iter().map(ConnectorRow::into_config).collect()
    }

    async fn list_by_tenant(&self, tenant: &str) -> Result<Vec<ConnectorConfig>, RegistryError> {
        let rows: Vec<ConnectorRow> = sqlx::query_as(
            "SELECT id, name, type, tenant_id, options, credentials, timeout_ms, retry_count, health FROM connectors WHERE tenant_id = $1 OR tenant_id = '*'",
        )
        .bind(tenant)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RegistryError::Storage(e.to_string()))?;
        rows.into_iter().map(ConnectorRow::into_config).collect()
    }

    async fn update_health(&self, id: &str, health: &ConnectorHealth) -> Result<(), RegistryError> {
        let health_json = serde_json::to_value(health).map_err(|e| RegistryError::Storage(e.to_string()))?;
        sqlx::query("UPDATE connectors SET health = $1, updated_at = now() WHERE id = $2")
            .bind(health_json)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| RegistryError::Storage(e.to_string()))?;
        Ok(())
    }
}

#[derive(sqlx::FromRow)]
struct ConnectorRow {
    id: String,
    name: String,
    #[sqlx(rename = "type")]
    kind: String,
    tenant_id: String,
    options: serde_json::Value,
    credentials: serde_json::Value,
    timeout_ms: i64,
    retry_count: i32,
    health: Option<serde_json::Value>,
}

impl ConnectorRow {
    fn into_config(self) -> Result<ConnectorConfig, RegistryError> {
        Ok(ConnectorConfig {
            id: self.id,
            name: self.name,
            kind: self.kind,
            tenant: self.tenant_id,
            options: serde_json::from_value(self.options).map_err(|e| RegistryError::Storage(e.to_string()))?,
            credentials: serde_json::from_value(self.credentials).map_err(|e| RegistryError::Storage(e.to_string()))?,
            timeout: Duration::from_millis(self.timeout_ms as u64),
            retry_count: self.retry_count as u32,
            health: self
                .health
                .map(serde_json::from_value)
                .transpose()
                .map_err(|e| RegistryError::Storage(e.to_string()))?,
        })
    }
}

/// No-op storage: every read misses, every write succeeds silently. Used
/// when a tenant's registry has no backing store configured — the registry
/// still works purely in-memory.
#[derive(Default)]
pub struct NullConnectorStorage;

#[async_trait]
impl ConnectorStorage for NullConnectorStorage {
    async fn save(&self, _config: &ConnectorConfig) -> Result<(), RegistryError> {
        Ok(())
    }
    async fn get(&self, _id: &str) -> Result<Option<ConnectorConfig>, RegistryError> {
        Ok(None)
    }
    async fn delete(&self, _id: &str) -> Result<(), RegistryError> {
        Ok(())
    }
    async fn list(&self) -> Result<Vec<ConnectorConfig>, RegistryError> {
        Ok(Vec::new())
    }
    async fn list_by_tenant(&self, _tenant: &str) -> Result<Vec<ConnectorConfig>, RegistryError> {
        Ok(Vec::new())
    }
    async fn update_health(&self, _id: &str, _health: &ConnectorHealth) -> Result<(), RegistryError> {
        Ok(())
    }
}
