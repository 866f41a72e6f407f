use async_trait::async_trait;
use chrono::{DateTime, Utc};
use market_intel_core::{MarketDataError, MarketDataProvider, RawMarket};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::rate_limiter::RateLimiter;

const DEFAULT_BASE_URL: &str = "https://gamma-api.polymarket.com";

/// HTTP-backed market-data client for the binary-market protocol. Follows
/// the shared-client-plus-sliding-window-limiter shape used throughout the
/// rest of the external provider layer.
#[derive(Clone)]
pub struct PolymarketClient {
    base_url: String,
    client: Client,
    rate_limiter: RateLimiter,
}

impl PolymarketClient {
    pub fn new(base_url: Option<String>, max_requests_per_minute: usize) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client,
            rate_limiter: RateLimiter::new(max_requests_per_minute, Duration::from_secs(60)),
        }
    }
}

impl Default for PolymarketClient {
    fn default() -> Self {
        Self::new(None, 100)
    }
}

#[async_trait]
impl MarketDataProvider for PolymarketClient {
    async fn get_market(&self, condition_id: &str) -> Result<RawMarket, MarketDataError> {
        self.rate_limiter.acquire().await;

        let url = format!("{}/markets", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("condition_ids", condition_id)])
            .send()
            .await
            .map_err(|e| MarketDataError::Unreachable(e.to_string()))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(MarketDataError::NotFound(condition_id.to_string()));
        }
        if !response.status().is_success() {
            return Err(MarketDataError::Unreachable(format!(
                "HTTP {}",
                response.status()
            )));
        }

        let mut markets: Vec<GammaMarket> = response
            .json()
            .await
            .map_err(|e| MarketDataError::NonConformant(e.to_string()))?;

        let market = markets
            .pop()
            .ok_or_else(|| MarketDataError::NotFound(condition_id.to_string()))?;

        market.try_into_raw()
    }
}

/// Wire shape returned by the Polymarket gamma markets endpoint, trimmed to
/// the fields Market Ingestion needs.
#[derive(Debug, Deserialize)]
struct GammaMarket {
    id: String,
    condition_id: String,
    question: String,
    #[serde(default)]
    description: Option<String>,
    end_date_iso: String,
    #[serde(default)]
    last_trade_price: Option<f64>,
    #[serde(default)]
    best_bid: Option<f64>,
    #[serde(default)]
    best_ask: Option<f64>,
    #[serde(default)]
    liquidity_num: Option<f64>,
    #[serde(default)]
    volume_24hr: Option<f64>,
    #[serde(default)]
    event_type: Option<String>,
    #[serde(default)]
    outcome_prices: Option<Vec<f64>>,
}

impl GammaMarket {
    fn try_into_raw(self) -> Result<RawMarket, MarketDataError> {
        let expiry_timestamp: DateTime<Utc> = DateTime::parse_from_rfc3339(&self.end_date_iso)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| MarketDataError::NonConformant(format!("end_date_iso: {e}")))?;

        let current_probability = self
            .last_trade_price
            .or_else(|| self.outcome_prices.as_ref().and_then(|p| p.first().copied()))
            .ok_or_else(|| MarketDataError::NonConformant("no price field present".to_string()))?;

        let best_bid = self.best_bid.unwrap_or(current_probability);
        let best_ask = self.best_ask.unwrap_or(current_probability);

        Ok(RawMarket {
            market_id: self.id,
            condition_id: self.condition_id,
            question: self.question,
            resolution_criteria: self.description.unwrap_or_default(),
            event_type_hint: self.event_type,
            expiry_timestamp,
            current_probability,
            best_bid,
            best_ask,
            order_book_depth: self.liquidity_num.unwrap_or(0.0),
            recent_prices: self.outcome_prices.unwrap_or_default(),
            volume_24h: self.volume_24hr.unwrap_or(0.0),
        })
    }
}
