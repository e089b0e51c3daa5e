//! The provider HTTP contract, exemplified by an Azure-style chat completions
//! endpoint. Other vendor wire formats are treated as opaque HTTP.

use crate::error::{ApiError, RouterError};
use crate::streaming::consume_sse;
use crate::types::{detect_auth_type, AuthType, ChatResponse, ProviderInfo, RouteRequest, StreamChunk, Usage};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

/// A pluggable LLM backend. Providers are composed by [`crate::router`] and
/// wrapped by [`crate::cache::CachingRouter`]; this trait is the seam both
/// depend on.
#[async_trait]
pub trait Provider: Send + Sync {
    fn info(&self) -> ProviderInfo;
    fn is_healthy(&self) -> bool;
    async fn complete(&self, req: &RouteRequest) -> Result<ChatResponse, RouterError>;
    async fn stream(
        &self,
        req: &RouteRequest,
        handler: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<ChatResponse, RouterError>;
}

/// Exponential backoff for transient **transport** errors only. POST/PATCH
/// calls are retried on network errors but never replayed after an HTTP
/// error response reaches us.
async fn retry_transport<T, F, Fut>(max_retries: u32, mut f: F) -> Result<T, RouterError>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, RouterError>>,
{
    let base = Duration::from_millis(100);
    let cap = Duration::from_secs(5);
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(RouterError::Transport(msg)) if attempt < max_retries => {
                let delay = base.saturating_mul(2u32.saturating_pow(attempt)).min(cap);
                tracing::warn!(attempt, error = %msg, delay_ms = delay.as_millis() as u64, "retrying after transport error");
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(other) => return Err(other),
        }
    }
}

/// An Azure-style chat completions provider.
pub struct AzureProvider {
    client: reqwest::Client,
    name: String,
    endpoint: String,
    deployment: String,
    api_version: String,
    credential: String,
    cost_per_1k_tokens_usd: f64,
    max_retries: u32,
    healthy: AtomicBool,
}

impl AzureProvider {
    pub fn new(
        name: impl Into<String>,
        endpoint: impl Into<String>,
        deployment: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(crate::types::DEFAULT_PROVIDER_TIMEOUT)
                .build()
                .expect("reqwest client builder failed"),
            name: name.into(),
            endpoint: endpoint.into(),
            deployment: deployment.into(),
            api_version: "2024-06-01".to_string(),
            credential: credential.into(),
            cost_per_1k_tokens_usd: 0.0,
            max_retries: 3,
            healthy: AtomicBool::new(true),
        }
    }

    pub fn with_cost(mut self, cost_per_1k_tokens_usd: f64) -> Self {
        self.cost_per_1k_tokens_usd = cost_per_1k_tokens_usd;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    fn auth_type(&self) -> AuthType {
        detect_auth_type(&self.endpoint)
    }

    fn url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint.trim_end_matches('/'),
            self.deployment,
            self.api_version
        )
    }

    fn body(&self, req: &RouteRequest, stream: bool) -> Result<serde_json::Value, RouterError> {
        if req.temperature < 0.0 {
            return Err(RouterError::Transport("temperature must not be negative".to_string()));
        }
        let mut messages = Vec::new();
        if let Some(system) = &req.system_message {
            messages.push(json!({"role": "system", "content": system}));
        }
        messages.push(json!({"role": "user", "content": req.user_message}));

        let mut body = json!({
            "messages": messages,
            "max_tokens": req.max_tokens,
            "temperature": req.temperature,
            "stream": stream,
        });
        if let Some(top_p) = req.top_p {
            body["top_p"] = json!(top_p);
        }
        if !req.stop.is_empty() {
            body["stop"] = json!(req.stop);
        }
        Ok(body)
    }

    fn request(&self, req: &RouteRequest, stream: bool) -> Result<reqwest::RequestBuilder, RouterError> {
        let body = self.body(req, stream)?;
        let mut builder = self.client.post(self.url()).header("Content-Type", "application/json");
        builder = match self.auth_type() {
            AuthType::Bearer => builder.bearer_auth(&self.credential),
            AuthType::ApiKey => builder.header("api-key", &self.credential),
        };
        Ok(builder.json(&body))
    }

    async fn classify_error(resp: reqwest::Response) -> RouterError {
        let status = resp.status().as_u16();
        let body: serde_json::Value = resp.json().await.unwrap_or_default();
        let message = body
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .unwrap_or("provider returned an error")
            .to_string();
        let code = body
            .get("error")
            .and_then(|e| e.get("code"))
            .and_then(|c| c.as_str())
            .unwrap_or("unknown")
            .to_string();
        let error_type = body
            .get("error")
            .and_then(|e| e.get("type"))
            .and_then(|t| t.as_str())
            .unwrap_or("unknown")
            .to_string();
        RouterError::Provider(ApiError::new(status, code, error_type, message))
    }
}

#[async_trait]
impl Provider for AzureProvider {
    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name.clone(),
            endpoint: self.endpoint.clone(),
            model: self.deployment.clone(),
            auth_type_is_bearer: matches!(self.auth_type(), AuthType::Bearer),
            cost_per_1k_tokens_usd: self.cost_per_1k_tokens_usd,
        }
    }

    fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    async fn complete(&self, req: &RouteRequest) -> Result<ChatResponse, RouterError> {
        let result = retry_transport(self.max_retries, || async {
            let builder = self.request(req, false)?;
            let resp = builder.send().await.map_err(|e| RouterError::Transport(e.to_string()))?;
            if !resp.status().is_success() {
                let err = Self::classify_error(resp).await;
                if let RouterError::Provider(api_err) = &err {
                    if api_err.is_transient() {
                        self.healthy.store(false, Ordering::SeqCst);
                    }
                }
                return Err(err);
            }
            let json: serde_json::Value = resp.json().await.map_err(|e| RouterError::Transport(e.to_string()))?;
            let content = json["choices"][0]["message"]["content"].as_str().unwrap_or_default().to_string();
            let stop_reason = json["choices"][0]["finish_reason"].as_str().map(str::to_string);
            let usage = Usage {
                tokens_in: json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
                tokens_out: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
                is_estimated: json.get("usage").is_none(),
            };
            Ok(ChatResponse { content, stop_reason, usage })
        })
        .await;
        if result.is_ok() {
            self.healthy.store(true, Ordering::SeqCst);
        }
        result
    }

    async fn stream(
        &self,
        req: &RouteRequest,
        handler: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<ChatResponse, RouterError> {
        let builder = self.request(req, true)?;
        let resp = builder.send().await.map_err(|e| RouterError::Transport(e.to_string()))?;
        if !resp.status().is_success() {
            let err = Self::classify_error(resp).await;
            if let RouterError::Provider(api_err) = &err {
                if api_err.is_transient() {
                    self.healthy.store(false, Ordering::SeqCst);
                }
            }
            return Err(err);
        }
        let stream = resp.bytes_stream();
        let response = consume_sse(stream, |chunk| handler(chunk)).await?;
        self.healthy.store(true, Ordering::SeqCst);
        Ok(response)
    }
}

/// Shared health flag storage, used by callers that need to mark a provider
/// down without routing through `complete`/`stream` (e.g. router-level
/// circuit breaking). Deliberately a separate small lock
/// ("Provider health flags use a dedicated small lock").
#[derive(Default)]
pub struct HealthFlags {
    flags: RwLock<std::collections::HashMap<String, bool>>,
}

impl HealthFlags {
    pub fn set(&self, provider: &str, healthy: bool) {
        self.flags.write().insert(provider.to_string(), healthy);
    }

    pub fn is_healthy(&self, provider: &str) -> bool {
        self.flags.read().get(provider).copied().unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auth_type_detected_from_host_suffix() {
        assert_eq!(detect_auth_type("https://foo.cognitiveservices.azure.com"), AuthType::Bearer);
        assert_eq!(detect_auth_type("https://foo.openai.azure.com"), AuthType::ApiKey);
    }

    #[test]
    fn url_includes_deployment_and_api_version() {
        let provider = AzureProvider::new("p1", "https://foo.openai.azure.com", "gpt4", "key");
        assert_eq!(
            provider.url(),
            "https://foo.openai.azure.com/openai/deployments/gpt4/chat/completions?api-version=2024-06-01"
        );
    }

    #[test]
    fn negative_temperature_is_rejected() {
        let provider = AzureProvider::new("p1", "https://foo.openai.azure.com", "gpt4", "key");
        let mut req = RouteRequest::new("hi");
        req.temperature = -0.1;
        assert!(provider.body(&req, false).is_err());
    }

    #[test]
    fn health_flags_default_to_healthy() {
        let flags = HealthFlags::default();
        assert!(flags.is_healthy("unknown"));
        flags.set("p1", false);
        assert!(!flags.is_healthy("p1"));
    }
}
