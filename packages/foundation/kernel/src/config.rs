//! Gateway configuration, loaded once from the environment at startup.
//!
//! No runtime mutation, documented defaults.

use std::time::Duration;

/// Top-level gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Postgres connection string for the connector registry and replay store.
    pub database_url: String,
    /// HTTP bind port.
    pub port: u16,
    /// Timeout for `SET app.current_org_id` (2s).
    pub rls_set_timeout: Duration,
    /// Timeout for resetting the tenancy variable on cleanup (1s).
    pub rls_reset_timeout: Duration,
    /// Explicit CORS origin allow-list. Empty means no cross-origin requests allowed.
    pub cors_allowed_origins: Vec<String>,
    /// Interval for the connector registry's periodic reload task.
    pub reload_interval: Duration,
}

impl GatewayConfig {
    /// Load configuration from environment variables, applying documented
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgres://localhost/agentkern".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),
            rls_set_timeout: Duration::from_millis(
                std::env::var("RLS_SET_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(2_000),
            ),
            rls_reset_timeout: Duration::from_millis(
                std::env::var("RLS_RESET_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(1_000),
            ),
            cors_allowed_origins: std::env::var("CORS_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            reload_interval: Duration::from_secs(
                std::env::var("RELOAD_INTERVAL_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(60),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_unset() {
        // SAFETY: tests run single-threaded within this module's scope for env vars under test.
        std::env::remove_var("PORT");
        std::env::remove_var("CORS_ALLOWED_ORIGINS");
        let cfg = GatewayConfig::from_env();
        assert_eq!(cfg.port, 8080);
        assert!(cfg.cors_allowed_origins.is_empty());
        assert_eq!(cfg.rls_set_timeout, Duration::from_secs(2));
        assert_eq!(cfg.rls_reset_timeout, Duration::from_secs(1));
    }

    #[test]
    fn parses_cors_origin_list() {
        std::env::set_var("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example");
        let cfg = GatewayConfig::from_env();
        assert_eq!(
            cfg.cors_allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
        std::env::remove_var("CORS_ALLOWED_ORIGINS");
    }
}
