use async_trait::async_trait;
use dashmap::DashMap;
use market_intel_core::{MarketDataError, MarketDataProvider, RawMarket};

/// In-memory fixture used by tests and the demonstration binary to exercise
/// the pipeline without live network access.
#[derive(Default)]
pub struct InMemoryMarketDataProvider {
    markets: DashMap<String, RawMarket>,
}

impl InMemoryMarketDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, market: RawMarket) {
        self.markets.insert(market.condition_id.clone(), market);
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryMarketDataProvider {
    async fn get_market(&self, condition_id: &str) -> Result<RawMarket, MarketDataError> {
        self.markets
            .get(condition_id)
            .map(|m| m.clone())
            .ok_or_else(|| MarketDataError::NotFound(condition_id.to_string()))
    }
}
