use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{
    AgentError, AgentSignal, ExternalDataBundle, ExternalDataResponse, ExternalDataSource,
    GraphState, MarketBriefingDocument,
};

// ---------------------------------------------------------------------------
// Market data protocol
// ---------------------------------------------------------------------------

/// Raw read from the upstream market-data protocol, before Market Ingestion
/// derives `MarketBriefingDocument`'s computed fields from it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMarket {
    pub market_id: String,
    pub condition_id: String,
    pub question: String,
    pub resolution_criteria: String,
    pub event_type_hint: Option<String>,
    pub expiry_timestamp: DateTime<Utc>,
    pub current_probability: f64,
    pub best_bid: f64,
    pub best_ask: f64,
    pub order_book_depth: f64,
    pub recent_prices: Vec<f64>,
    pub volume_24h: f64,
}

#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("market {0} not found")]
    NotFound(String),
    #[error("market data provider unreachable: {0}")]
    Unreachable(String),
    #[error("non-conformant market payload: {0}")]
    NonConformant(String),
}

/// Contract for the out-of-scope market-data collaborator (Polymarket in
/// production, an in-memory fixture in tests).
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    async fn get_market(&self, condition_id: &str) -> Result<RawMarket, MarketDataError>;
}

// ---------------------------------------------------------------------------
// External data protocol (news / polling / social)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalDataParams {
    pub query: String,
    pub limit: u32,
}

#[derive(Error, Debug)]
pub enum ExternalDataError {
    #[error("request timed out")]
    Timeout,
    #[error("circuit open for source")]
    CircuitOpen,
    #[error("rate limited")]
    RateLimited,
    #[error("source unavailable: {0}")]
    Unavailable(String),
}

/// Contract for the out-of-scope news/polling/social collaborators.
#[async_trait]
pub trait ExternalDataProvider: Send + Sync {
    fn source(&self) -> ExternalDataSource;
    async fn fetch(
        &self,
        params: &ExternalDataParams,
    ) -> Result<ExternalDataResponse, ExternalDataError>;
}

// ---------------------------------------------------------------------------
// LLM protocol
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmErrorKind {
    RateLimited,
    Validation,
    ProviderError,
    Timeout,
}

#[derive(Error, Debug)]
#[error("llm error ({kind:?}): {message}")]
pub struct LlmError {
    pub kind: LlmErrorKind,
    pub message: String,
    pub retryable: bool,
}

impl LlmError {
    pub fn provider_error(message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::ProviderError,
            message: message.into(),
            retryable: true,
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            kind: LlmErrorKind::Validation,
            message: message.into(),
            retryable: false,
        }
    }
}

/// Contract for the out-of-scope LLM collaborator. `invoke` returns a
/// structured JSON value validated by the caller against `schema_name`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn invoke(&self, prompt: &str, schema_name: &str) -> Result<serde_json::Value, LlmError>;
}

// ---------------------------------------------------------------------------
// Checkpoint store
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub thread_id: String,
    pub node: String,
    pub timestamp: DateTime<Utc>,
    pub schema_version: u32,
    pub state: GraphState,
}

/// Contract for durable checkpoint persistence, keyed by `thread_id`
/// (the market's condition id) so a crashed run resumes idempotently.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn put(&self, thread_id: &str, node: &str, state: &GraphState) -> Result<(), crate::error::EngineError>;
    async fn latest(&self, thread_id: &str) -> Result<Option<CheckpointRecord>, crate::error::EngineError>;
    async fn history(&self, thread_id: &str) -> Result<Vec<CheckpointRecord>, crate::error::EngineError>;
}

// ---------------------------------------------------------------------------
// Specialist agents
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    MarketMicrostructure,
    Momentum,
    MeanReversion,
    PriceAction,
    ProbabilityBaseline,
    RiskAssessment,
    HistoricalPattern,
    TailRisk,
    Catalyst,
    MediaSentiment,
    SocialSentiment,
    NarrativeVelocity,
    BreakingNews,
    EventImpact,
    PollingIntelligence,
    Aggressive,
    Conservative,
    Neutral,
}

impl AgentKind {
    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::MarketMicrostructure => "market_microstructure",
            AgentKind::Momentum => "momentum",
            AgentKind::MeanReversion => "mean_reversion",
            AgentKind::PriceAction => "price_action",
            AgentKind::ProbabilityBaseline => "probability_baseline",
            AgentKind::RiskAssessment => "risk_assessment",
            AgentKind::HistoricalPattern => "historical_pattern",
            AgentKind::TailRisk => "tail_risk",
            AgentKind::Catalyst => "catalyst",
            AgentKind::MediaSentiment => "media_sentiment",
            AgentKind::SocialSentiment => "social_sentiment",
            AgentKind::NarrativeVelocity => "narrative_velocity",
            AgentKind::BreakingNews => "breaking_news",
            AgentKind::EventImpact => "event_impact",
            AgentKind::PollingIntelligence => "polling_intelligence",
            AgentKind::Aggressive => "aggressive",
            AgentKind::Conservative => "conservative",
            AgentKind::Neutral => "neutral",
        }
    }

    /// Whether this agent shapes the recommendation only, and must never
    /// feed into signal fusion's fair-probability estimate.
    pub fn is_risk_philosophy(&self) -> bool {
        matches!(
            self,
            AgentKind::Aggressive | AgentKind::Conservative | AgentKind::Neutral
        )
    }
}

/// Contract shared by every specialist agent so the fan-out loop can dispatch
/// over `Vec<Arc<dyn SpecialistAgent>>` homogeneously.
#[async_trait]
pub trait SpecialistAgent: Send + Sync {
    fn kind(&self) -> AgentKind;

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError>;
}
