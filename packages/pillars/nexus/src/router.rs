//! Provider selection: a fixed priority-rule chain plus weighted-random
//! selection among healthy fallback-tier providers.

use crate::error::RouterError;
use crate::provider::Provider;
use crate::types::{ChatResponse, ProviderInfo, RouteRequest, StreamChunk};
use async_trait::async_trait;
use parking_lot::RwLock;
use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;

/// Anything that can route a request to a provider and report on provider
/// health. Implemented by [`PriorityRouter`] and wrapped by
/// [`crate::cache::CachingRouter`] — both satisfy this trait, so callers
/// never need to know whether caching is in the chain.
#[async_trait]
pub trait Router: Send + Sync {
    async fn route_request(&self, req: &RouteRequest) -> Result<(ChatResponse, ProviderInfo), RouterError>;
    fn is_healthy(&self) -> bool;
    fn provider_status(&self) -> HashMap<String, bool>;
    fn update_provider_weights(&self, weights: HashMap<String, u32>);
}

/// Which routing tier selected a provider; `Fallback` is the only tier
/// weighted selection applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Residency,
    Pii,
    Confidential,
    Role,
    Fallback,
}

struct ProviderSlot {
    provider: Arc<dyn Provider>,
    tier: Tier,
}

/// Routes requests using the fixed priority chain: residency-restricted
/// region -> PII -> confidential/sensitive -> manager/admin role -> default
/// fallback (weighted among healthy fallback providers).
pub struct PriorityRouter {
    slots: Vec<ProviderSlot>,
    weights: RwLock<HashMap<String, u32>>,
}

impl PriorityRouter {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            weights: RwLock::new(HashMap::new()),
        }
    }

    fn with_slot(mut self, tier: Tier, provider: Arc<dyn Provider>) -> Self {
        let name = provider.info().name;
        self.weights.write().entry(name).or_insert(1);
        self.slots.push(ProviderSlot { provider, tier });
        self
    }

    /// Data-sovereignty tier: EU-resident requests must use this provider.
    pub fn with_local_provider(self, provider: Arc<dyn Provider>) -> Self {
        self.with_slot(Tier::Residency, provider)
    }

    /// PII tier. If no residency provider is configured, PII-carrying
    /// requests route here instead; this call is cheap to make alongside
    /// `with_local_provider` sharing the same instance.
    pub fn with_pii_provider(self, provider: Arc<dyn Provider>) -> Self {
        self.with_slot(Tier::Pii, provider)
    }

    pub fn with_safety_provider(self, provider: Arc<dyn Provider>) -> Self {
        self.with_slot(Tier::Confidential, provider)
    }

    pub fn with_high_capability_provider(self, provider: Arc<dyn Provider>) -> Self {
        self.with_slot(Tier::Role, provider)
    }

    pub fn with_fallback_provider(self, provider: Arc<dyn Provider>) -> Self {
        self.with_slot(Tier::Fallback, provider)
    }

    fn slots_for(&self, tier: Tier) -> Vec<&ProviderSlot> {
        self.slots.iter().filter(|s| s.tier == tier).collect()
    }

    /// Pick the provider for this request following the fixed rule order.
    /// Rules 1-4 always pick the single designated provider for their tier
    /// (weights don't apply); rule 5 performs weighted-random selection
    /// among healthy fallback providers.
    fn select(&self, req: &RouteRequest) -> Result<Arc<dyn Provider>, RouterError> {
        if req.is_eu_resident() {
            if let Some(slot) = self.slots_for(Tier::Residency).into_iter().next() {
                return Ok(slot.provider.clone());
            }
        }
        if req.contains_pii {
            if let Some(slot) = self.slots_for(Tier::Pii).into_iter().next() {
                return Ok(slot.provider.clone());
            }
        }
        if req.sensitivity == crate::types::Sensitivity::Confidential {
            if let Some(slot) = self.slots_for(Tier::Confidential).into_iter().next() {
                return Ok(slot.provider.clone());
            }
        }
        if req.is_manager_or_admin() {
            if let Some(slot) = self.slots_for(Tier::Role).into_iter().next() {
                return Ok(slot.provider.clone());
            }
        }

        let fallback_slots = self.slots_for(Tier::Fallback);
        let healthy: Vec<&ProviderSlot> = fallback_slots.into_iter().filter(|s| s.provider.is_healthy()).collect();
        if healthy.is_empty() {
            return Err(RouterError::NoProviderAvailable);
        }
        if healthy.len() == 1 {
            return Ok(healthy[0].provider.clone());
        }

        let weights = self.weights.read();
        let weighted: Vec<(u32, &ProviderSlot)> = healthy
            .iter()
            .map(|slot| (*weights.get(&slot.provider.info().name).unwrap_or(&1), *slot))
            .collect();
        let total: u32 = weighted.iter().map(|(w, _)| w).sum();
        if total == 0 {
            return Ok(healthy[0].provider.clone());
        }
        let mut pick = rand::rng().random_range(0..total);
        for (weight, slot) in &weighted {
            if pick < *weight {
                return Ok(slot.provider.clone());
            }
            pick -= weight;
        }
        Ok(healthy[0].provider.clone())
    }
}

impl Default for PriorityRouter {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Router for PriorityRouter {
    async fn route_request(&self, req: &RouteRequest) -> Result<(ChatResponse, ProviderInfo), RouterError> {
        let provider = self.select(req)?;
        let info = provider.info();
        let response = provider.complete(req).await?;
        Ok((response, info))
    }

    fn is_healthy(&self) -> bool {
        self.slots.iter().any(|s| s.provider.is_healthy())
    }

    fn provider_status(&self) -> HashMap<String, bool> {
        self.slots.iter().map(|s| (s.provider.info().name, s.provider.is_healthy())).collect()
    }

    fn update_provider_weights(&self, weights: HashMap<String, u32>) {
        let mut current = self.weights.write();
        for (name, weight) in weights {
            current.insert(name, weight);
        }
    }
}

impl PriorityRouter {
    /// Streaming counterpart of `route_request`, used by callers that want
    /// per-chunk delivery instead of a single awaited response.
    pub async fn route_stream(
        &self,
        req: &RouteRequest,
        handler: &mut (dyn FnMut(StreamChunk) + Send),
    ) -> Result<(ChatResponse, ProviderInfo), RouterError> {
        let provider = self.select(req)?;
        let info = provider.info();
        let response = provider.stream(req, handler).await?;
        Ok((response, info))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChatResponse, Sensitivity, Usage};
    use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

    struct StubProvider {
        name: String,
        healthy: AtomicBool,
        calls: AtomicU32,
    }

    impl StubProvider {
        fn new(name: &str) -> Arc<Self> {
            Arc::new(Self {
                name: name.to_string(),
                healthy: AtomicBool::new(true),
                calls: AtomicU32::new(0),
            })
        }
    }

    #[async_trait]
    impl Provider for StubProvider {
        fn info(&self) -> ProviderInfo {
            ProviderInfo {
                name: self.name.clone(),
                endpoint: "stub".to_string(),
                model: "stub-model".to_string(),
                auth_type_is_bearer: false,
                cost_per_1k_tokens_usd: 0.0,
            }
        }

        fn is_healthy(&self) -> bool {
            self.healthy.load(Ordering::SeqCst)
        }

        async fn complete(&self, _req: &RouteRequest) -> Result<ChatResponse, RouterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(ChatResponse {
                content: format!("from {}", self.name),
                stop_reason: Some("stop".to_string()),
                usage: Usage::default(),
            })
        }

        async fn stream(
            &self,
            _req: &RouteRequest,
            _handler: &mut (dyn FnMut(StreamChunk) + Send),
        ) -> Result<ChatResponse, RouterError> {
            unimplemented!()
        }
    }

    #[tokio::test]
    async fn eu_residency_overrides_everything() {
        let local = StubProvider::new("local-eu");
        let fallback = StubProvider::new("fallback");
        let router = PriorityRouter::new().with_local_provider(local.clone()).with_fallback_provider(fallback);

        let mut req = RouteRequest::new("hola");
        req.residency_region = Some("EU".to_string());
        req.caller_role = "admin".to_string();

        let (response, info) = router.route_request(&req).await.unwrap();
        assert_eq!(info.name, "local-eu");
        assert_eq!(response.content, "from local-eu");
    }

    #[tokio::test]
    async fn pii_routes_to_pii_provider() {
        let pii = StubProvider::new("pii-safe");
        let fallback = StubProvider::new("fallback");
        let router = PriorityRouter::new().with_pii_provider(pii).with_fallback_provider(fallback);

        let mut req = RouteRequest::new("ssn 123-45-6789");
        req.contains_pii = true;
        let (_, info) = router.route_request(&req).await.unwrap();
        assert_eq!(info.name, "pii-safe");
    }

    #[tokio::test]
    async fn confidential_routes_to_safety_provider() {
        let safety = StubProvider::new("safety");
        let fallback = StubProvider::new("fallback");
        let router = PriorityRouter::new().with_safety_provider(safety).with_fallback_provider(fallback);

        let mut req = RouteRequest::new("merger plans");
        req.sensitivity = Sensitivity::Confidential;
        let (_, info) = router.route_request(&req).await.unwrap();
        assert_eq!(info.name, "safety");
    }

    #[tokio::test]
    async fn manager_role_routes_to_high_capability_provider() {
        let capable = StubProvider::new("gpt-max");
        let fallback = StubProvider::new("fallback");
        let router = PriorityRouter::new().with_high_capability_provider(capable).with_fallback_provider(fallback);

        let mut req = RouteRequest::new("plan Q3");
        req.caller_role = "manager".to_string();
        let (_, info) = router.route_request(&req).await.unwrap();
        assert_eq!(info.name, "gpt-max");
    }

    #[tokio::test]
    async fn default_falls_back_and_skips_unhealthy() {
        let unhealthy = StubProvider::new("sick");
        unhealthy.healthy.store(false, Ordering::SeqCst);
        let healthy = StubProvider::new("ok");
        let router = PriorityRouter::new().with_fallback_provider(unhealthy).with_fallback_provider(healthy);

        let req = RouteRequest::new("anything");
        let (_, info) = router.route_request(&req).await.unwrap();
        assert_eq!(info.name, "ok");
    }

    #[tokio::test]
    async fn no_healthy_fallback_is_an_error() {
        let unhealthy = StubProvider::new("sick");
        unhealthy.healthy.store(false, Ordering::SeqCst);
        let router = PriorityRouter::new().with_fallback_provider(unhealthy);
        let req = RouteRequest::new("anything");
        assert!(matches!(router.route_request(&req).await, Err(RouterError::NoProviderAvailable)));
    }

    #[tokio::test]
    async fn weight_of_zero_excludes_provider_from_random_draw() {
        let a = StubProvider::new("a");
        let b = StubProvider::new("b");
        let router = PriorityRouter::new().with_fallback_provider(a).with_fallback_provider(b);
        router.update_provider_weights(HashMap::from([("a".to_string(), 0), ("b".to_string(), 10)]));

        let req = RouteRequest::new("anything");
        for _ in 0..20 {
            let (_, info) = router.route_request(&req).await.unwrap();
            assert_eq!(info.name, "b");
        }
    }
}
