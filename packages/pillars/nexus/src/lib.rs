//! LLM provider routing, caching, and streaming.
//!
//! Requests are routed to a provider by [`router::PriorityRouter`] following
//! a fixed precedence (data residency, PII, confidentiality, caller role,
//! weighted fallback) before anything leaves the process; non-streaming
//! completions can additionally be wrapped in [`cache::CachingRouter`] for
//! TTL-based response reuse.

pub mod cache;
pub mod error;
pub mod provider;
pub mod router;
pub mod streaming;
pub mod types;

pub use cache::CachingRouter;
pub use error::{ApiError, RouterError};
pub use provider::{AzureProvider, HealthFlags, Provider};
pub use router::{PriorityRouter, Router};
pub use types::{
    detect_auth_type, AuthType, ChatResponse, ProviderInfo, RouteRequest, Sensitivity, StreamChunk, StreamChunkKind,
    Usage, DEFAULT_PROVIDER_TIMEOUT,
};
