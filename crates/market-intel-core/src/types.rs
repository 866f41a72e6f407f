use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::EngineError;

/// Epsilon band around p=0.5 within which `Direction::Neutral` is permitted.
pub const NEUTRAL_EPSILON: f64 = 0.02;

// ---------------------------------------------------------------------------
// Market Briefing Document
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Election,
    Policy,
    Court,
    Geopolitical,
    Economic,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolatilityRegime {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalyst {
    pub event: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketMetadata {
    pub ambiguity_flags: Vec<String>,
    pub key_catalysts: Vec<Catalyst>,
}

/// Canonical analytic input produced by Market Ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketBriefingDocument {
    pub market_id: String,
    pub condition_id: String,
    pub event_type: EventType,
    pub question: String,
    pub resolution_criteria: String,
    pub expiry_timestamp: DateTime<Utc>,
    pub current_probability: f64,
    pub liquidity_score: f64,
    pub bid_ask_spread: f64,
    pub volatility_regime: VolatilityRegime,
    pub volume_24h: f64,
    pub metadata: MarketMetadata,
}

impl MarketBriefingDocument {
    /// Enforce the invariants named in the data model: probability in [0,1]
    /// and an expiry that has not already passed.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.current_probability) {
            return Err(EngineError::InvalidData(format!(
                "current_probability {} out of [0,1]",
                self.current_probability
            )));
        }
        if self.expiry_timestamp <= now {
            return Err(EngineError::InvalidData(format!(
                "expiry_timestamp {} is not in the future",
                self.expiry_timestamp
            )));
        }
        if self.volume_24h < 0.0 {
            return Err(EngineError::InvalidData("volume_24h is negative".into()));
        }
        if !(0.0..=10.0).contains(&self.liquidity_score) {
            return Err(EngineError::InvalidData(format!(
                "liquidity_score {} out of [0,10]",
                self.liquidity_score
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Agent signal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Yes,
    No,
    Neutral,
}

impl Direction {
    /// Derive the direction implied by a fair-probability read, honoring the
    /// neutral epsilon band documented on `AgentSignal`.
    pub fn from_probability(p: f64, epsilon: f64) -> Self {
        if (p - 0.5).abs() < epsilon {
            Direction::Neutral
        } else if p > 0.5 {
            Direction::Yes
        } else {
            Direction::No
        }
    }
}

/// One agent's probabilistic read, produced at most once per agent per analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSignal {
    pub agent_name: String,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub direction: Direction,
    pub fair_probability: f64,
    pub key_drivers: Vec<String>,
    pub risk_factors: Vec<String>,
    pub metadata: serde_json::Value,
    pub processing_time_ms: u64,
}

impl AgentSignal {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !(0.0..=1.0).contains(&self.fair_probability) {
            return Err(EngineError::InvalidData(format!(
                "{}: fair_probability {} out of [0,1]",
                self.agent_name, self.fair_probability
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(EngineError::InvalidData(format!(
                "{}: confidence {} out of [0,1]",
                self.agent_name, self.confidence
            )));
        }
        if self.key_drivers.is_empty() || self.key_drivers.len() > 5 {
            return Err(EngineError::InvalidData(format!(
                "{}: key_drivers must contain 1..=5 entries, got {}",
                self.agent_name,
                self.key_drivers.len()
            )));
        }
        let implied = Direction::from_probability(self.fair_probability, NEUTRAL_EPSILON);
        let consistent = match (self.direction, implied) {
            (Direction::Neutral, _) | (_, Direction::Neutral) => true,
            (a, b) => a == b,
        };
        if !consistent {
            return Err(EngineError::InvalidData(format!(
                "{}: direction {:?} inconsistent with fair_probability {}",
                self.agent_name, self.direction, self.fair_probability
            )));
        }
        Ok(())
    }
}

/// A per-agent failure captured without ever propagating out of the agent node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentError {
    pub agent_name: String,
    pub kind: AgentErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentErrorKind {
    Timeout,
    Validation,
    ProviderError,
    Cancelled,
}

// ---------------------------------------------------------------------------
// Fused signal
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalConflict {
    pub agent_a: String,
    pub agent_b: String,
    pub disagreement: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FusedSignal {
    pub fair_probability: f64,
    pub confidence: f64,
    pub weights: HashMap<String, f64>,
    pub conflicting_signals: Vec<SignalConflict>,
    pub signal_alignment: f64,
}

// ---------------------------------------------------------------------------
// Thesis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ThesisDirection {
    Yes,
    No,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thesis {
    pub direction: ThesisDirection,
    pub fair_probability: f64,
    pub market_probability: f64,
    pub edge: f64,
    pub core_argument: String,
    pub catalysts: Vec<String>,
    pub failure_conditions: Vec<String>,
    pub supporting_signals: Vec<String>,
}

// ---------------------------------------------------------------------------
// Debate
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestType {
    Evidence,
    Causality,
    Timing,
    Liquidity,
    TailRisk,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Survived,
    Weakened,
    Refuted,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdversarialTest {
    pub side: ThesisDirection,
    pub test_type: TestType,
    pub claim: String,
    pub challenge: String,
    pub outcome: TestOutcome,
    pub score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRecord {
    pub tests: Vec<AdversarialTest>,
    pub bull_score: f64,
    pub bear_score: f64,
    pub key_disagreements: Vec<String>,
}

// ---------------------------------------------------------------------------
// Consensus
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Regime {
    HighConfidence,
    ModerateConfidence,
    HighUncertainty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvictionTier {
    High,
    Moderate,
    Low,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConfidenceBand {
    pub lo: f64,
    pub hi: f64,
}

impl ConfidenceBand {
    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Consensus {
    pub consensus_probability: f64,
    pub confidence_band: ConfidenceBand,
    pub disagreement_index: f64,
    pub regime: Regime,
    pub conviction_tier: ConvictionTier,
    pub contributing_signals: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ConsensusError {
    InsufficientData(String),
    ConsensusFailed(String),
}

// ---------------------------------------------------------------------------
// Recommendation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    LongYes,
    LongNo,
    NoTrade,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiquidityRisk {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceZone {
    pub lo_cents: i32,
    pub hi_cents: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Explanation {
    pub summary: String,
    pub core_thesis: String,
    pub key_catalysts: Vec<String>,
    pub failure_scenarios: Vec<String>,
    pub uncertainty_note: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationMetadata {
    pub market_probability: f64,
    pub consensus_probability: f64,
    pub edge: f64,
    pub confidence_band: ConfidenceBand,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecommendation {
    pub action: Action,
    pub entry_zone: PriceZone,
    pub target_zone: PriceZone,
    pub expected_value: f64,
    pub win_probability: f64,
    pub liquidity_risk: LiquidityRisk,
    pub explanation: Explanation,
    pub metadata: RecommendationMetadata,
}

// ---------------------------------------------------------------------------
// Risk philosophy & agent performance (recommendation shaping only)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskPhilosophy {
    Aggressive,
    Conservative,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskPhilosophySignal {
    pub philosophy: RiskPhilosophy,
    pub sizing_multiplier: f64,
    pub rationale: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentPerformanceRecord {
    pub agent_name: String,
    pub agreed_with_consensus: bool,
    pub fair_probability: f64,
    pub confidence: f64,
}

// ---------------------------------------------------------------------------
// Audit log
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub stage: String,
    pub timestamp: DateTime<Utc>,
    pub data: serde_json::Value,
}

// ---------------------------------------------------------------------------
// External data bundle (news / polling / social)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExternalDataSource {
    News,
    Polling,
    Social,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub summary: String,
    pub published_at: DateTime<Utc>,
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSnapshot {
    pub pollster: String,
    pub sample_size: u32,
    pub yes_share: f64,
    pub taken_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialMention {
    pub platform: String,
    pub text: String,
    pub sentiment: f64,
    pub posted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExternalDataPayload {
    Articles(Vec<NewsArticle>),
    Polls(Vec<PollSnapshot>),
    Mentions(Vec<SocialMention>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalDataResponse {
    pub payload: ExternalDataPayload,
    pub freshness_seconds: u64,
    pub stale: bool,
}

/// Snapshot of everything External Data Fetch managed to acquire for one analysis.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExternalDataBundle {
    pub news: Option<ExternalDataResponse>,
    pub polling: Option<ExternalDataResponse>,
    pub social: Option<ExternalDataResponse>,
    /// Agents demoted to skipped because a feed they require was unreachable.
    pub demoted_agents: Vec<String>,
}

// ---------------------------------------------------------------------------
// Graph state: the append-only monotone bag
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSelectionDecision {
    pub agent_name: String,
    pub outcome: SelectionOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionOutcome {
    Admitted,
    ConfigDisabled,
    DataUnavailable,
    CostCut,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GraphState {
    pub condition_id: String,
    pub mbd: Option<MarketBriefingDocument>,
    pub ingestion_error: Option<String>,
    pub active_agents: Vec<String>,
    pub agent_selection_audit: Vec<AgentSelectionDecision>,
    pub external_data: Option<ExternalDataBundle>,
    pub agent_signals: Vec<AgentSignal>,
    pub agent_errors: Vec<AgentError>,
    pub fused_signal: Option<FusedSignal>,
    pub bull_thesis: Option<Thesis>,
    pub bear_thesis: Option<Thesis>,
    pub debate_record: Option<DebateRecord>,
    pub consensus: Option<Consensus>,
    pub consensus_error: Option<ConsensusError>,
    pub risk_philosophy_signals: Vec<RiskPhilosophySignal>,
    pub agent_performance: Vec<AgentPerformanceRecord>,
    pub recommendation: Option<TradeRecommendation>,
    pub audit_log: Vec<AuditLogEntry>,
}

impl GraphState {
    pub fn new(condition_id: impl Into<String>) -> Self {
        Self {
            condition_id: condition_id.into(),
            ..Default::default()
        }
    }

    /// Merge a node's partial update into the shared state. Scalars follow
    /// last-non-null-wins; list fields that are keyed by name (signals,
    /// errors) append with dedup by key so a re-run from a checkpoint never
    /// double-applies a node's contribution; the audit log is a plain append.
    pub fn apply(&mut self, update: GraphStateUpdate) {
        if update.mbd.is_some() {
            self.mbd = update.mbd;
        }
        if update.ingestion_error.is_some() {
            self.ingestion_error = update.ingestion_error;
        }
        if let Some(agents) = update.active_agents {
            self.active_agents = agents;
        }
        if !update.agent_selection_audit.is_empty() {
            self.agent_selection_audit = update.agent_selection_audit;
        }
        if update.external_data.is_some() {
            self.external_data = update.external_data;
        }
        for signal in update.agent_signals {
            self.agent_signals.retain(|s| s.agent_name != signal.agent_name);
            self.agent_signals.push(signal);
        }
        for err in update.agent_errors {
            self.agent_errors.retain(|e| e.agent_name != err.agent_name);
            self.agent_errors.push(err);
        }
        if update.fused_signal.is_some() {
            self.fused_signal = update.fused_signal;
        }
        if update.bull_thesis.is_some() {
            self.bull_thesis = update.bull_thesis;
        }
        if update.bear_thesis.is_some() {
            self.bear_thesis = update.bear_thesis;
        }
        if update.debate_record.is_some() {
            self.debate_record = update.debate_record;
        }
        if update.consensus.is_some() {
            self.consensus = update.consensus;
        }
        if update.consensus_error.is_some() {
            self.consensus_error = update.consensus_error;
        }
        if !update.risk_philosophy_signals.is_empty() {
            self.risk_philosophy_signals = update.risk_philosophy_signals;
        }
        if !update.agent_performance.is_empty() {
            self.agent_performance = update.agent_performance;
        }
        if update.recommendation.is_some() {
            self.recommendation = update.recommendation;
        }
        self.audit_log.extend(update.audit_log);
    }
}

/// Partial update a node returns; `GraphState::apply` reduces it into the bag.
#[derive(Debug, Clone, Default)]
pub struct GraphStateUpdate {
    pub mbd: Option<MarketBriefingDocument>,
    pub ingestion_error: Option<String>,
    pub active_agents: Option<Vec<String>>,
    pub agent_selection_audit: Vec<AgentSelectionDecision>,
    pub external_data: Option<ExternalDataBundle>,
    pub agent_signals: Vec<AgentSignal>,
    pub agent_errors: Vec<AgentError>,
    pub fused_signal: Option<FusedSignal>,
    pub bull_thesis: Option<Thesis>,
    pub bear_thesis: Option<Thesis>,
    pub debate_record: Option<DebateRecord>,
    pub consensus: Option<Consensus>,
    pub consensus_error: Option<ConsensusError>,
    pub risk_philosophy_signals: Vec<RiskPhilosophySignal>,
    pub agent_performance: Vec<AgentPerformanceRecord>,
    pub recommendation: Option<TradeRecommendation>,
    pub audit_log: Vec<AuditLogEntry>,
}

impl GraphStateUpdate {
    pub fn audit(stage: &str, data: serde_json::Value) -> Self {
        Self {
            audit_log: vec![AuditLogEntry {
                stage: stage.to_string(),
                timestamp: Utc::now(),
                data,
            }],
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_signal(name: &str, p: f64) -> AgentSignal {
        AgentSignal {
            agent_name: name.to_string(),
            timestamp: Utc::now(),
            confidence: 0.7,
            direction: Direction::from_probability(p, NEUTRAL_EPSILON),
            fair_probability: p,
            key_drivers: vec!["driver".to_string()],
            risk_factors: vec![],
            metadata: serde_json::json!({}),
            processing_time_ms: 10,
        }
    }

    #[test]
    fn signal_validate_rejects_inconsistent_direction() {
        let mut s = sample_signal("a", 0.8);
        s.direction = Direction::No;
        assert!(s.validate().is_err());
    }

    #[test]
    fn signal_validate_accepts_neutral_near_half() {
        let s = sample_signal("a", 0.505);
        assert!(s.validate().is_ok());
        assert_eq!(s.direction, Direction::Neutral);
    }

    #[test]
    fn apply_dedups_agent_signals_by_name() {
        let mut state = GraphState::new("cond-1");
        let update1 = GraphStateUpdate {
            agent_signals: vec![sample_signal("a", 0.6)],
            ..Default::default()
        };
        let update2 = GraphStateUpdate {
            agent_signals: vec![sample_signal("a", 0.65)],
            ..Default::default()
        };
        state.apply(update1);
        state.apply(update2);
        assert_eq!(state.agent_signals.len(), 1);
        assert!((state.agent_signals[0].fair_probability - 0.65).abs() < 1e-9);
    }

    #[test]
    fn apply_appends_audit_log_in_order() {
        let mut state = GraphState::new("cond-1");
        state.apply(GraphStateUpdate::audit("ingestion", serde_json::json!({})));
        state.apply(GraphStateUpdate::audit("selection", serde_json::json!({})));
        let stages: Vec<_> = state.audit_log.iter().map(|e| e.stage.as_str()).collect();
        assert_eq!(stages, vec!["ingestion", "selection"]);
    }
}
