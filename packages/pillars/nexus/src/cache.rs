//! Response caching wrapper around a [`Router`].
//!
//! A cache key is derived from the request payload, an in-memory TTL map
//! is consulted before forwarding to the upstream router, and hits/misses
//! are tracked with atomic counters. Expired entries are evicted lazily,
//! on the access that finds them stale.

use crate::error::RouterError;
use crate::router::Router;
use crate::types::{ChatResponse, ProviderInfo, RouteRequest};
use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

struct CacheEntry {
    response: ChatResponse,
    info: ProviderInfo,
    expires_at: Instant,
}

/// Wraps a [`Router`] with a TTL response cache keyed on request content.
/// Caching only applies to non-streaming `route_request` calls — streamed
/// responses are never cached, since a cached reply can't be replayed
/// chunk-by-chunk without misrepresenting latency.
pub struct CachingRouter<R: Router> {
    inner: Arc<R>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<R: Router> CachingRouter<R> {
    pub fn new(inner: Arc<R>, ttl: Duration) -> Self {
        Self {
            inner,
            entries: RwLock::new(HashMap::new()),
            ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }

    fn cache_key(req: &RouteRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(req.system_message.as_deref().unwrap_or(""));
        hasher.update([0u8]);
        hasher.update(&req.user_message);
        hasher.update([0u8]);
        hasher.update(req.max_tokens.to_le_bytes());
        hasher.update(req.temperature.to_le_bytes());
        if let Some(top_p) = req.top_p {
            hasher.update(top_p.to_le_bytes());
        }
        for s in &req.stop {
            hasher.update(s.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }

    fn lookup(&self, key: &str) -> Option<(ChatResponse, ProviderInfo)> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        Some((entry.response.clone(), entry.info.clone()))
    }

    fn evict_if_stale(&self, key: &str) {
        let mut entries = self.entries.write();
        if entries.get(key).is_some_and(|e| e.expires_at <= Instant::now()) {
            entries.remove(key);
        }
    }
}

#[async_trait]
impl<R: Router> Router for CachingRouter<R> {
    async fn route_request(&self, req: &RouteRequest) -> Result<(ChatResponse, ProviderInfo), RouterError> {
        let key = Self::cache_key(req);

        if let Some(hit) = self.lookup(&key) {
            self.hits.fetch_add(1, Ordering::SeqCst);
            return Ok(hit);
        }
        self.evict_if_stale(&key);
        self.misses.fetch_add(1, Ordering::SeqCst);

        let (response, info) = self.inner.route_request(req).await?;
        self.entries.write().insert(
            key,
            CacheEntry {
                response: response.clone(),
                info: info.clone(),
                expires_at: Instant::now() + self.ttl,
            },
        );
        Ok((response, info))
    }

    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }

    fn provider_status(&self) -> HashMap<String, bool> {
        self.inner.provider_status()
    }

    fn update_provider_weights(&self, weights: HashMap<String, u32>) {
        self.inner.update_provider_weights(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RouterError;
    use std::sync::atomic::AtomicU32;

    struct CountingRouter {
        calls: AtomicU32,
    }

    #[async_trait]
    impl Router for CountingRouter {
        async fn route_request(&self, req: &RouteRequest) -> Result<(ChatResponse, ProviderInfo), RouterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok((
                ChatResponse {
                    content: format!("reply to {}", req.user_message),
                    stop_reason: Some("stop".to_string()),
                    usage: Default::default(),
                },
                ProviderInfo {
                    name: "stub".to_string(),
                    endpoint: "stub".to_string(),
                    model: "stub".to_string(),
                    auth_type_is_bearer: false,
                    cost_per_1k_tokens_usd: 0.0,
                },
            ))
        }

        fn is_healthy(&self) -> bool {
            true
        }

        fn provider_status(&self) -> HashMap<String, bool> {
            HashMap::new()
        }

        fn update_provider_weights(&self, _weights: HashMap<String, u32>) {}
    }

    #[tokio::test]
    async fn identical_requests_hit_cache() {
        let inner = Arc::new(CountingRouter { calls: AtomicU32::new(0) });
        let cache = CachingRouter::new(inner.clone(), Duration::from_secs(60));

        let req = RouteRequest::new("hello");
        cache.route_request(&req).await.unwrap();
        cache.route_request(&req).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[tokio::test]
    async fn differing_requests_miss() {
        let inner = Arc::new(CountingRouter { calls: AtomicU32::new(0) });
        let cache = CachingRouter::new(inner.clone(), Duration::from_secs(60));

        cache.route_request(&RouteRequest::new("a")).await.unwrap();
        cache.route_request(&RouteRequest::new("b")).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.misses(), 2);
        assert_eq!(cache.hits(), 0);
    }

    #[tokio::test]
    async fn expired_entry_is_refetched() {
        let inner = Arc::new(CountingRouter { calls: AtomicU32::new(0) });
        let cache = CachingRouter::new(inner.clone(), Duration::from_millis(10));

        let req = RouteRequest::new("hello");
        cache.route_request(&req).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.route_request(&req).await.unwrap();

        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }
}
