//! Request/response/provider types for the LLM Router.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How sensitive the request's content was classified by upstream policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sensitivity {
    Normal,
    Confidential,
}

/// The subset of request attributes the router's priority rules consult.
/// residency region, PII classification (as judged by
/// the Policy Engine), sensitivity, and caller role all factor into routing
/// before any request ever reaches a provider.
#[derive(Debug, Clone)]
pub struct RouteRequest {
    pub system_message: Option<String>,
    pub user_message: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: Option<f32>,
    pub stop: Vec<String>,
    /// e.g. "EU" — residency-restricted regions force a local provider.
    pub residency_region: Option<String>,
    pub contains_pii: bool,
    pub sensitivity: Sensitivity,
    pub caller_role: String,
}

impl RouteRequest {
    pub fn new(user_message: impl Into<String>) -> Self {
        Self {
            system_message: None,
            user_message: user_message.into(),
            max_tokens: 4096,
            temperature: 0.7,
            top_p: None,
            stop: Vec::new(),
            residency_region: None,
            contains_pii: false,
            sensitivity: Sensitivity::Normal,
            caller_role: String::new(),
        }
    }

    pub fn is_eu_resident(&self) -> bool {
        self.residency_region.as_deref() == Some("EU")
    }

    pub fn is_manager_or_admin(&self) -> bool {
        matches!(self.caller_role.as_str(), "manager" | "admin")
    }
}

/// Auth header style a provider endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthType {
    ApiKey,
    Bearer,
}

/// Detect auth type from an Azure-style endpoint host suffix, per
/// `*.cognitiveservices.*` (foundry) -> Bearer, else api-key.
pub fn detect_auth_type(endpoint: &str) -> AuthType {
    if endpoint.contains("cognitiveservices.") {
        AuthType::Bearer
    } else {
        AuthType::ApiKey
    }
}

/// Static provider metadata, surfaced to callers alongside every response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderInfo {
    pub name: String,
    pub endpoint: String,
    pub model: String,
    pub auth_type_is_bearer: bool,
    pub cost_per_1k_tokens_usd: f64,
}

/// Estimated or reported token usage. Some endpoints never emit a usage
/// frame, so `is_estimated` tells callers whether `tokens_in + tokens_out`
/// came from the provider or was inferred.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub tokens_in: u32,
    pub tokens_out: u32,
    pub is_estimated: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

/// One unit of a streamed response's streaming protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamChunk {
    #[serde(rename = "type")]
    pub kind: StreamChunkKind,
    pub content: Option<String>,
    pub done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamChunkKind {
    Content,
    Done,
}

impl StreamChunk {
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            kind: StreamChunkKind::Content,
            content: Some(text.into()),
            done: false,
        }
    }

    pub fn done() -> Self {
        Self {
            kind: StreamChunkKind::Done,
            content: None,
            done: true,
        }
    }
}

/// Default provider HTTP timeout
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(120);
