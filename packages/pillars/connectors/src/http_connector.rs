//! SSRF-guarded HTTP connector.
//!
//! Before connecting, resolve the base URL's hostname and reject the
//! connection if any resolved address is loopback, link-local, private
//! (RFC1918), unspecified, or within 169.254/16 — unless the connector's
//! `allow_private_ips` option is `true`.

use crate::error::ConnectorError;
use crate::traits::Connector;
use crate::types::{ConnectorConfig, ExecuteResult, Rows, Statement};
use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::RwLock;
use std::time::Instant;
use tokio::net::lookup_host;

fn is_blocked(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            v4.is_loopback() || v4.is_link_local() || v4.is_private() || v4.is_unspecified() || v4.octets()[0..2] == [169, 254]
        }
        IpAddr::V6(v6) => v6.is_loopback() || v6.is_unspecified() || (v6.segments()[0] & 0xffc0) == 0xfe80,
    }
}

/// Resolve `host` (a bare hostname or `host:port`) and return an error if
/// any resolved address falls in a blocked range, unless `allow_private_ips`.
pub async fn guard_ssrf(host_port: &str, allow_private_ips: bool) -> Result<(), ConnectorError> {
    if allow_private_ips {
        return Ok(());
    }
    let addrs = lookup_host(host_port)
        .await
        .map_err(|e| ConnectorError::ConnectionFailed(format!("DNS resolution failed: {e}")))?;
    for addr in addrs {
        if is_blocked(addr.ip()) {
            return Err(ConnectorError::SsrfBlocked(format!(
                "{host_port} resolved to disallowed address {}",
                addr.ip()
            )));
        }
    }
    Ok(())
}

/// A generic REST connector. `query`/`execute` issue the statement as a
/// JSON-bodied POST against `base_url`; this is intentionally thin since
/// vendor wire formats are opaque HTTP
pub struct HttpConnector {
    client: reqwest::Client,
    base_url: RwLock<Option<String>>,
    allow_private_ips: RwLock<bool>,
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpConnector {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::builder()
                .pool_max_idle_per_host(10)
                .timeout(std::time::Duration::from_secs(120))
                .build()
                .expect("reqwest client builder failed"),
            base_url: RwLock::new(None),
            allow_private_ips: RwLock::new(false),
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    fn name(&self) -> &str {
        "http"
    }
    fn kind(&self) -> &str {
        "rest-api"
    }
    fn version(&self) -> &str {
        "1.0"
    }
    fn capabilities(&self) -> Vec<String> {
        vec!["query".to_string(), "execute".to_string()]
    }

    async fn connect(&self, config: &ConnectorConfig) -> Result<(), ConnectorError> {
        let base_url = config
            .options
            .get("base_url")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ConnectorError::ConnectionFailed("missing base_url option".to_string()))?
            .to_string();
        let allow_private_ips = config
            .options
            .get("allow_private_ips")
            .and_then(|v| v.as_bool())
            .unwrap_or(false);

        let url = url::Url::parse(&base_url).map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;
        let host = url
            .host_str()
            .ok_or_else(|| ConnectorError::ConnectionFailed("base_url has no host".to_string()))?;
        let port = url.port_or_known_default().unwrap_or(443);
        guard_ssrf(&format!("{host}:{port}"), allow_private_ips).await?;

        *self.base_url.write().expect("lock poisoned") = Some(base_url);
        *self.allow_private_ips.write().expect("lock poisoned") = allow_private_ips;
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConnectorError> {
        *self.base_url.write().expect("lock poisoned") = None;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ConnectorError> {
        let base_url = self.base_url.read().expect("lock poisoned").clone();
        let Some(base_url) = base_url else {
            return Ok(false);
        };
        let resp = self
            .client
            .get(&base_url)
            .send()
            .await
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;
        Ok(resp.status().is_success() || resp.status().is_redirection())
    }

    async fn query(&self, stmt: &Statement) -> Result<Rows, ConnectorError> {
        let base_url = self
            .base_url
            .read()
            .expect("lock poisoned")
            .clone()
            .ok_or_else(|| ConnectorError::ConnectionFailed("not connected".to_string()))?;
        let resp = self
            .client
            .post(&base_url)
            .json(&stmt)
            .send()
            .await
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;
        let rows: Rows = resp.json().await.unwrap_or_default();
        Ok(rows)
    }

    async fn execute(&self, stmt: &Statement) -> Result<ExecuteResult, ConnectorError> {
        let base_url = self
            .base_url
            .read()
            .expect("lock poisoned")
            .clone()
            .ok_or_else(|| ConnectorError::ConnectionFailed("not connected".to_string()))?;
        let start = Instant::now();
        let resp = self
            .client
            .post(&base_url)
            .json(&stmt)
            .send()
            .await
            .map_err(|e| ConnectorError::ConnectionFailed(e.to_string()))?;
        let success = resp.status().is_success();
        Ok(ExecuteResult {
            success,
            rows_affected: 0,
            duration: start.elapsed(),
            message: (!success).then(|| resp.status().to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_and_link_local_are_blocked() {
        assert!(is_blocked("127.0.0.1".parse().unwrap()));
        assert!(is_blocked("169.254.1.1".parse().unwrap()));
        assert!(is_blocked("10.0.0.5".parse().unwrap()));
        assert!(is_blocked("192.168.1.1".parse().unwrap()));
        assert!(is_blocked("0.0.0.0".parse().unwrap()));
    }

    #[test]
    fn public_address_is_not_blocked() {
        assert!(!is_blocked("93.184.216.34".parse().unwrap()));
    }

    #[tokio::test]
    async fn guard_allows_private_when_overridden() {
        assert!(guard_ssrf("127.0.0.1:80", true).await.is_ok());
    }
}
