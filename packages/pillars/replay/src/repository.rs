//! Pluggable persistence for execution summaries and step snapshots.
//!
//! Summary and snapshot tables are keyed by request id. Summary writes are
//! UPSERTs, intentionally asynchronous with respect to step recording —
//! at-least-once, idempotent on `request_id`.

use crate::error::ReplayError;
use crate::types::{ExecutionFilter, ExecutionSnapshot, ExecutionSummary, Pagination};
use async_trait::async_trait;

#[async_trait]
pub trait Repository: Send + Sync {
    async fn save_summary(&self, summary: &ExecutionSummary) -> Result<(), ReplayError>;
    async fn get_summary(&self, request_id: &str) -> Result<Option<ExecutionSummary>, ReplayError>;
    async fn list_summaries(
        &self,
        filter: &ExecutionFilter,
        pagination: Pagination,
    ) -> Result<(Vec<ExecutionSummary>, u64), ReplayError>;
    async fn delete_execution(&self, request_id: &str) -> Result<(), ReplayError>;

    async fn save_step(&self, snapshot: &ExecutionSnapshot) -> Result<(), ReplayError>;
    async fn get_step(&self, request_id: &str, step_index: u32) -> Result<Option<ExecutionSnapshot>, ReplayError>;
    async fn get_steps(&self, request_id: &str) -> Result<Vec<ExecutionSnapshot>, ReplayError>;

    async fn is_healthy(&self) -> bool;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS execution_summaries (
    request_id TEXT PRIMARY KEY,
    workflow_name TEXT NOT NULL,
    status TEXT NOT NULL,
    total_steps INT NOT NULL,
    completed_steps INT NOT NULL,
    started_at TIMESTAMPTZ NOT NULL,
    completed_at TIMESTAMPTZ,
    duration_ms BIGINT,
    total_tokens BIGINT NOT NULL,
    total_cost_usd DOUBLE PRECISION NOT NULL,
    org_id TEXT NOT NULL,
    tenant_id TEXT NOT NULL,
    user_id TEXT NOT NULL,
    input_summary TEXT,
    output_summary TEXT,
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS idx_exec_summaries_tenant ON execution_summaries (tenant_id);
CREATE INDEX IF NOT EXISTS idx_exec_summaries_org ON execution_summaries (org_id);
CREATE INDEX IF NOT EXISTS idx_exec_summaries_status ON execution_summaries (status);
CREATE INDEX IF NOT EXISTS idx_exec_summaries_started_at ON execution_summaries (started_at);

CREATE TABLE IF NOT EXISTS execution_snapshots (
    request_id TEXT NOT NULL,
    step_index INT NOT NULL,
    payload JSONB NOT NULL,
    PRIMARY KEY (request_id, step_index)
);
"#;

/// Postgres-backed [`Repository`]. Connection opening retries with
/// quadratic backoff, matching the connector registry's storage bootstrap.
pub struct PostgresRepository {
    pool: sqlx::PgPool,
}

impl PostgresRepository {
    pub async fn connect(database_url: &str) -> Result<Self, ReplayError> {
        let pool = Self::connect_with_retry(database_url).await?;
        sqlx::query(SCHEMA)
            .execute(&pool)
            .await
            .map_err(|e| ReplayError::Storage(format!("schema init failed: {e}")))?;
        Ok(Self { pool })
    }

    async fn connect_with_retry(database_url: &str) -> Result<sqlx::PgPool, ReplayError> {
        const MAX_ATTEMPTS: u32 = 5;
        let mut last_err = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match sqlx::PgPool::connect(database_url).await {
                Ok(pool) => return Ok(pool),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "replay store connect attempt failed");
                    last_err = Some(e);
                    if attempt < MAX_ATTEMPTS {
                        tokio::time::sleep(std::time::Duration::from_secs(2 * attempt as u64)).await;
                    }
                }
            }
        }
        Err(ReplayError::Storage(format!(
            "failed to connect after {MAX_ATTEMPTS} attempts: {}",
            last_err.map(|e| e.to_string()).unwrap_or_default()
        )))
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn save_summary(&self, summary: &ExecutionSummary) -> Result<(), ReplayError> {
        let status = serde_json::to_value(summary.status)
            .map_err(|e| ReplayError::Serialization(e.to_string()))?
            .as_str()
            .unwrap_or_default()
            .to_string();
        sqlx::query(
            r#"
            INSERT INTO execution_summaries (
                request_id, workflow_name, status, total_steps, completed_steps,
                started_at, completed_at, duration_ms, total_tokens, total_cost_usd,
                org_id, tenant_id, user_id, input_summary, output_summary, error_message
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            ON CONFLICT (request_id) DO UPDATE SET
                workflow_name = EXCLUDED.workflow_name,
                status = EXCLUDED.status,
                total_steps = EXCLUDED.total_steps,
                completed_steps = EXCLUDED.completed_steps,
                completed_at = EXCLUDED.completed_at,
                duration_ms = EXCLUDED.duration_ms,
                total_tokens = EXCLUDED.total_tokens,
                total_cost_usd = EXCLUDED.total_cost_usd,
                input_summary = EXCLUDED.input_summary,
                output_summary = EXCLUDED.output_summary,
                error_message = EXCLUDED.error_message
            "#,
        )
        .bind(&summary.request_id)
        .bind(&summary.workflow_name)
        .bind(status)
        .bind(summary.total_steps as i32)
        .bind(summary.completed_steps as i32)
        .bind(summary.started_at)
        .bind(summary.completed_at)
        .bind(summary.duration_ms)
        .bind(summary.total_tokens as i64)
        .bind(summary.total_cost_usd)
        .bind(&summary.org_id)
        .bind(&summary.tenant_id)
        .bind(&summary.user_id)
        .bind(&summary.input_summary)
        .bind(&summary.output_summary)
        .bind(&summary.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| ReplayError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_summary(&self, request_id: &str) -> Result<Option<ExecutionSummary>, ReplayError> {
        let row: Option<SummaryRow> = sqlx::query_as(
            r#"SELECT request_id, workflow_name, status, total_steps, completed_steps,
                      started_at, completed_at, duration_ms, total_tokens, total_cost_usd,
                      org_id, tenant_id, user_id, input_summary, output_summary, error_message
               FROM execution_summaries WHERE request_id = $1"#,
        )
        .bind(request_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| ReplayError::Storage(e.to_string()))?;
        row.map(SummaryRow::into_summary).transpose()
    }

    async fn list_summaries(
        &self,
        filter: &ExecutionFilter,
        pagination: Pagination,
    ) -> Result<(Vec<ExecutionSummary>, u64), ReplayError> {
        // Filters are applied in-process after a full scan; the pillar is
        // sized for audit/replay volumes, not OLTP-scale execution history.
        let rows: Vec<SummaryRow> = sqlx::query_as(
            r#"SELECT request_id, workflow_name, status, total_steps, completed_steps,
                      started_at, completed_at, duration_ms, total_tokens, total_cost_usd,
                      org_id, tenant_id, user_id, input_summary, output_summary, error_message
               FROM execution_summaries ORDER BY started_at DESC"#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReplayError::Storage(e.to_string()))?;

        let all: Vec<ExecutionSummary> =
            rows.into_iter().map(SummaryRow::into_summary).collect::<Result<_, _>>()?;
        let matched: Vec<ExecutionSummary> = all.into_iter().filter(|s| crate::store::matches_filter(s, filter)).collect();
        let total = matched.len() as u64;
        let page = matched
            .into_iter()
            .skip(pagination.offset as usize)
            .take(pagination.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn delete_execution(&self, request_id: &str) -> Result<(), ReplayError> {
        sqlx::query("DELETE FROM execution_snapshots WHERE request_id = $1")
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ReplayError::Storage(e.to_string()))?;
        sqlx::query("DELETE FROM execution_summaries WHERE request_id = $1")
            .bind(request_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ReplayError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn save_step(&self, snapshot: &ExecutionSnapshot) -> Result<(), ReplayError> {
        let payload = serde_json::to_value(snapshot).map_err(|e| ReplayError::Serialization(e.to_string()))?;
        sqlx::query(
            r#"
            INSERT INTO execution_snapshots (request_id, step_index, payload)
            VALUES ($1, $2, $3)
            ON CONFLICT (request_id, step_index) DO UPDATE SET payload = EXCLUDED.payload
            "#,
        )
        .bind(&snapshot.request_id)
        .bind(snapshot.step_index as i32)
        .bind(payload)
        .execute(&self.pool)
        .await
        .map_err(|e| ReplayError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn get_step(&self, request_id: &str, step_index: u32) -> Result<Option<ExecutionSnapshot>, ReplayError> {
        let row: Option<(serde_json::Value,)> =
            sqlx::query_as("SELECT payload FROM execution_snapshots WHERE request_id = $1 AND step_index = $2")
                .bind(request_id)
                .bind(step_index as i32)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| ReplayError::Storage(e.to_string()))?;
        row.map(|(payload,)| serde_json::from_value(payload).map_err(|e| ReplayError::Serialization(e.to_string())))
            .transpose()
    }

    async fn get_steps(&self, request_id: &str) -> Result<Vec<ExecutionSnapshot>, ReplayError> {
        let rows: Vec<(serde_json::Value,)> = sqlx::query_as(
            "SELECT payload FROM execution_snapshots WHERE request_id = $1 ORDER BY step_index ASC",
        )
        .bind(request_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| ReplayError::Storage(e.to_string()))?;
        rows.into_iter()
            .map(|(payload,)| serde_json::from_value(payload).map_err(|e| ReplayError::Serialization(e.to_string())))
            .collect()
    }

    async fn is_healthy(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    request_id: String,
    workflow_name: String,
    status: String,
    total_steps: i32,
    completed_steps: i32,
    started_at: chrono::DateTime<chrono::Utc>,
    completed_at: Option<chrono::DateTime<chrono::Utc>>,
    duration_ms: Option<i64>,
    total_tokens: i64,
    total_cost_usd: f64,
    org_id: String,
    tenant_id: String,
    user_id: String,
    input_summary: Option<String>,
    output_summary: Option<String>,
    error_message: Option<String>,
}

impl SummaryRow {
    fn into_summary(self) -> Result<ExecutionSummary, ReplayError> {
        let status = serde_json::from_value(serde_json::Value::String(self.status))
            .map_err(|e| ReplayError::Serialization(e.to_string()))?;
        Ok(ExecutionSummary {
            request_id: self.request_id,
            workflow_name: self.workflow_name,
            status,
            total_steps: self.total_steps as u32,
            completed_steps: self.completed_steps as u32,
            started_at: self.started_at,
            completed_at: self.completed_at,
            duration_ms: self.duration_ms,
            total_tokens: self.total_tokens as u64,
            total_cost_usd: self.total_cost_usd,
            org_id: self.org_id,
            tenant_id: self.tenant_id,
            user_id: self.user_id,
            input_summary: self.input_summary,
            output_summary: self.output_summary,
            error_message: self.error_message,
        })
    }
}

/// No-op repository: reads miss, writes succeed silently. The store
/// degrades to in-memory-cache-only operation when this is configured.
#[derive(Default)]
pub struct NullRepository;

#[async_trait]
impl Repository for NullRepository {
    async fn save_summary(&self, _summary: &ExecutionSummary) -> Result<(), ReplayError> {
        Ok(())
    }
    async fn get_summary(&self, _request_id: &str) -> Result<Option<ExecutionSummary>, ReplayError> {
        Ok(None)
    }
    async fn list_summaries(
        &self,
        _filter: &ExecutionFilter,
        _pagination: Pagination,
    ) -> Result<(Vec<ExecutionSummary>, u64), ReplayError> {
        Ok((Vec::new(), 0))
    }
    async fn delete_execution(&self, _request_id: &str) -> Result<(), ReplayError> {
        Ok(())
    }
    async fn save_step(&self, _snapshot: &ExecutionSnapshot) -> Result<(), ReplayError> {
        Ok(())
    }
    async fn get_step(&self, _request_id: &str, _step_index: u32) -> Result<Option<ExecutionSnapshot>, ReplayError> {
        Ok(None)
    }
    async fn get_steps(&self, _request_id: &str) -> Result<Vec<ExecutionSnapshot>, ReplayError> {
        Ok(Vec::new())
    }
    async fn is_healthy(&self) -> bool {
        true
    }
}
