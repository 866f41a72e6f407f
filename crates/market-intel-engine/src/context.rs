//! Process-wide collaborators threaded explicitly through every node:
//! market-data provider, LLM registry, checkpoint store, and one rate
//! limiter/circuit breaker pair per external data source. Grounded in the
//! teacher's "one shared client, many services" pooling, generalized from a
//! single `polygon_client` to a small set of named collaborators rather than
//! a global static.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use llm_client::LlmProviderRegistry;
use market_data_client::{CircuitBreaker, RateLimiter};
use market_intel_core::{
    CheckpointStore, EngineConfig, ExternalDataProvider, ExternalDataResponse, ExternalDataSource,
    MarketDataProvider,
};

struct ExternalCollaborator {
    provider: Arc<dyn ExternalDataProvider>,
    breaker: CircuitBreaker,
    limiter: RateLimiter,
}

struct CacheEntry {
    response: ExternalDataResponse,
    cached_at: chrono::DateTime<Utc>,
}

pub struct EngineContext {
    pub config: EngineConfig,
    pub market_data: Arc<dyn MarketDataProvider>,
    pub llm_registry: Arc<LlmProviderRegistry>,
    pub checkpoint_store: Arc<dyn CheckpointStore>,
    /// Agent groups an operator has disabled (§4.2 rule 3's configuration
    /// filter). Kept separate from `EngineConfig` since it is a set, not a
    /// scalar knob, and most deployments leave it empty.
    pub disabled_agent_groups: Vec<String>,
    news: Option<ExternalCollaborator>,
    polling: Option<ExternalCollaborator>,
    social: Option<ExternalCollaborator>,
    external_cache: DashMap<(ExternalDataSource, String), CacheEntry>,
}

impl EngineContext {
    pub fn new(
        config: EngineConfig,
        market_data: Arc<dyn MarketDataProvider>,
        llm_registry: Arc<LlmProviderRegistry>,
        checkpoint_store: Arc<dyn CheckpointStore>,
    ) -> Self {
        Self {
            news: None,
            polling: None,
            social: None,
            external_cache: DashMap::new(),
            disabled_agent_groups: Vec::new(),
            config,
            market_data,
            llm_registry,
            checkpoint_store,
        }
    }

    /// Wires a news/polling/social collaborator behind its own rate limiter
    /// and circuit breaker, sized from `self.config`.
    pub fn with_external_provider(mut self, provider: Arc<dyn ExternalDataProvider>) -> Self {
        let collaborator = ExternalCollaborator {
            breaker: CircuitBreaker::new(
                self.config.circuit_breaker_failure_threshold,
                Duration::from_secs(self.config.circuit_breaker_reset_secs),
            ),
            limiter: RateLimiter::new(
                self.config.rate_limit_max_calls as usize,
                Duration::from_secs(self.config.rate_limit_window_secs),
            ),
            provider: provider.clone(),
        };
        match provider.source() {
            ExternalDataSource::News => self.news = Some(collaborator),
            ExternalDataSource::Polling => self.polling = Some(collaborator),
            ExternalDataSource::Social => self.social = Some(collaborator),
        }
        self
    }

    pub(crate) fn external_collaborator(
        &self,
        source: ExternalDataSource,
    ) -> Option<(&Arc<dyn ExternalDataProvider>, &CircuitBreaker, &RateLimiter)> {
        let collaborator = match source {
            ExternalDataSource::News => self.news.as_ref(),
            ExternalDataSource::Polling => self.polling.as_ref(),
            ExternalDataSource::Social => self.social.as_ref(),
        }?;
        Some((&collaborator.provider, &collaborator.breaker, &collaborator.limiter))
    }

    /// Cheap pre-fetch probe for Dynamic Agent Selection's data-availability
    /// filter: is a collaborator configured for this source at all. Does not
    /// consult the circuit breaker state, since a transient open breaker
    /// should demote an already-selected agent during the actual fetch, not
    /// exclude it from selection altogether.
    pub(crate) fn probe_available(&self, source: ExternalDataSource) -> bool {
        self.external_collaborator(source).is_some()
    }

    pub(crate) fn cached_external(&self, source: ExternalDataSource, query: &str) -> Option<ExternalDataResponse> {
        let key = (source, query.to_string());
        let entry = self.external_cache.get(&key)?;
        let age_secs = (Utc::now() - entry.cached_at).num_seconds().max(0) as u64;
        if age_secs < self.config.cache_ttl_secs {
            Some(entry.response.clone())
        } else {
            None
        }
    }

    pub(crate) fn cache_external(&self, source: ExternalDataSource, query: &str, response: ExternalDataResponse) {
        let key = (source, query.to_string());
        self.external_cache.insert(key, CacheEntry { response, cached_at: Utc::now() });
    }

    /// A fully self-contained context for local smoke-testing and for the
    /// demonstration binary: in-memory market data, mock LLM providers, an
    /// in-memory checkpoint store, no external data collaborators wired.
    /// Mirrors the teacher's `data-loader` binary pulling required env vars
    /// via `.expect(...)` at process startup rather than propagating a
    /// `Result` through a demo entry point.
    pub fn mock() -> Self {
        let config = EngineConfig::from_env().expect("EngineConfig::from_env should load from defaults");
        let market_data = market_data_client::InMemoryMarketDataProvider::new();
        market_data.seed(market_intel_core::RawMarket {
            market_id: "demo-market-001".to_string(),
            condition_id: "demo-market-001".to_string(),
            question: "Will the incumbent party win the 2028 presidential election?".to_string(),
            resolution_criteria: "Resolves YES if the incumbent party's nominee wins the presidency.".to_string(),
            event_type_hint: Some("presidential election".to_string()),
            expiry_timestamp: Utc::now() + chrono::Duration::days(120),
            current_probability: 0.52,
            best_bid: 0.51,
            best_ask: 0.53,
            order_book_depth: 25_000.0,
            recent_prices: vec![0.49, 0.50, 0.505, 0.51, 0.52],
            volume_24h: 40_000.0,
        });
        Self::new(
            config,
            Arc::new(market_data),
            Arc::new(LlmProviderRegistry::mock()),
            Arc::new(crate::checkpoint::InMemoryCheckpointStore::new()),
        )
    }
}
