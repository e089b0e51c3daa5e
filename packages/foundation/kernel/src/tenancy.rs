//! Row-level security tenancy binding.
//!
//! Binds a per-connection, per-request session variable
//! (`app.current_org_id`) that the datastore's RLS policies consume. Set
//! before any query, reset in a deferred action, never carried across
//! requests, never set on a pooled connection without this explicit bind.

use std::future::Future;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

#[derive(Debug, Error)]
pub enum TenancyError {
    #[error("failed to acquire a pooled connection: {0}")]
    Acquire(String),
    #[error("timed out setting tenancy variable after {0:?}")]
    SetTimeout(Duration),
    #[error("database error setting tenancy variable: {0}")]
    Database(String),
}

/// Run `f` with `app.current_org_id` bound to `org_id` on a dedicated pooled
/// connection, then reset it. Reset failures are logged and swallowed
/// ("RLS reset failure... log warn, continue").
pub async fn with_tenancy<F, Fut, T>(
    pool: &sqlx::PgPool,
    org_id: &str,
    set_timeout: Duration,
    reset_timeout: Duration,
    f: F,
) -> Result<T, TenancyError>
where
    F: FnOnce(sqlx::pool::PoolConnection<sqlx::Postgres>) -> Fut,
    Fut: Future<Output = (T, sqlx::pool::PoolConnection<sqlx::Postgres>)>,
{
    let mut conn = pool
        .acquire()
        .await
        .map_err(|e| TenancyError::Acquire(e.to_string()))?;

    timeout(
        set_timeout,
        sqlx::query("SELECT set_config('app.current_org_id', $1, false)")
            .bind(org_id)
            .execute(&mut *conn),
    )
    .await
    .map_err(|_| TenancyError::SetTimeout(set_timeout))?
    .map_err(|e| TenancyError::Database(e.to_string()))?;

    let (result, mut conn) = f(conn).await;

    if let Err(e) = timeout(
        reset_timeout,
        sqlx::query("SELECT set_config('app.current_org_id', '', false)").execute(&mut *conn),
    )
    .await
    {
        tracing::warn!(error = %e, "timed out resetting tenancy variable");
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_messages_are_descriptive() {
        let err = TenancyError::SetTimeout(Duration::from_secs(2));
        assert!(err.to_string().contains("2s") || err.to_string().contains("2"));
    }
}
