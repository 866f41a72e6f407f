//! Specialist agents grounding a market's price against reference-class base
//! rates, structural risk, catalyst timing, and historical pattern cues.
//! The ratio-calculator shape (small pure functions returning `Option<f64>`
//! when a read needs data the market doesn't have) carries over from the
//! teacher's fundamental-ratio helpers, retargeted at event markets instead
//! of balance sheets.

mod signal_stack;

use async_trait::async_trait;
use chrono::Utc;
use market_intel_core::{
    AgentError, AgentErrorKind, AgentKind, AgentSignal, Direction, EventType, ExternalDataBundle,
    MarketBriefingDocument, SpecialistAgent, VolatilityRegime, NEUTRAL_EPSILON,
};
use signal_stack::SignalStack;
use std::time::Instant;

/// Rough reference-class base rate for "yes" resolution by event category,
/// used as an anchor independent of the market's current price. These are
/// priors, not forecasts, and are deliberately coarse.
fn reference_class_base_rate(event_type: &EventType) -> f64 {
    match event_type {
        EventType::Election => 0.5,
        EventType::Policy => 0.35,
        EventType::Court => 0.45,
        EventType::Geopolitical => 0.3,
        EventType::Economic => 0.4,
        EventType::Other => 0.5,
    }
}

/// Fraction of a market's life remaining, used to weight base rate vs.
/// market price: far from expiry, the crowd has priced in little; close
/// to expiry, the market price itself is the better-informed read.
fn life_remaining_fraction(mbd: &MarketBriefingDocument) -> Option<f64> {
    let now = Utc::now();
    let total = (mbd.expiry_timestamp - (now - chrono::Duration::days(90))).num_seconds();
    let remaining = (mbd.expiry_timestamp - now).num_seconds();
    if total <= 0 {
        return None;
    }
    Some((remaining as f64 / total as f64).clamp(0.0, 1.0))
}

fn build_signal(
    kind: AgentKind,
    mbd: &MarketBriefingDocument,
    stack: SignalStack,
    started: Instant,
) -> Result<AgentSignal, AgentError> {
    if stack.is_empty() {
        return Err(AgentError {
            agent_name: kind.name().to_string(),
            kind: AgentErrorKind::Validation,
            message: "no baseline signals were triggered".to_string(),
        });
    }

    let tilt = stack.combined_tilt();
    let fair_probability = (mbd.current_probability + tilt).clamp(0.01, 0.99);
    let direction = Direction::from_probability(fair_probability, NEUTRAL_EPSILON);
    let confidence = stack.confidence(mbd.liquidity_score / 10.0);

    Ok(AgentSignal {
        agent_name: kind.name().to_string(),
        timestamp: Utc::now(),
        confidence,
        direction,
        fair_probability,
        key_drivers: stack.driver_names(),
        risk_factors: mbd.metadata.ambiguity_flags.clone(),
        metadata: serde_json::json!({ "tilt": tilt }),
        processing_time_ms: started.elapsed().as_millis() as u64,
    })
}

/// Anchors the market's price against a reference-class base rate, pulling
/// toward the base rate in proportion to how much of the market's life is
/// still ahead of it.
pub struct ProbabilityBaselineAgent;

#[async_trait]
impl SpecialistAgent for ProbabilityBaselineAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::ProbabilityBaseline
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();

        let base_rate = reference_class_base_rate(&mbd.event_type);
        let pull = base_rate - mbd.current_probability;

        if let Some(remaining) = life_remaining_fraction(mbd) {
            if remaining > 0.1 {
                stack.push("reference class base rate", 2, pull * remaining * 0.3);
            }
        } else {
            stack.push("reference class base rate, weak time anchor", 1, pull * 0.1);
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

/// Reads liquidity, spread, and volatility as structural risk rather than
/// directional signal: it rarely moves the fair price, but it tempers
/// confidence when the market is too thin or too jumpy to trust.
pub struct RiskAssessmentAgent;

#[async_trait]
impl SpecialistAgent for RiskAssessmentAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::RiskAssessment
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();

        stack.push("structural liquidity read", 2, 0.0);
        if mbd.bid_ask_spread > 0.08 {
            stack.push("spread too wide to trust the quote", 2, 0.0);
        }
        if matches!(mbd.volatility_regime, VolatilityRegime::High) {
            stack.push("elevated volatility regime", 1, 0.0);
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

/// Reads the density and recency of recorded catalysts as a proxy for
/// whether the market is in an active-news regime or a quiet one, which
/// shapes how much weight a historical-pattern read should carry.
pub struct HistoricalPatternAgent;

#[async_trait]
impl SpecialistAgent for HistoricalPatternAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::HistoricalPattern
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();

        let catalyst_count = mbd.metadata.key_catalysts.len();
        if catalyst_count >= 3 {
            let drift = (mbd.current_probability - 0.5).signum() * 0.02;
            stack.push("dense catalyst history, trend continuation pattern", 2, drift);
        } else if catalyst_count == 0 {
            stack.push("no recorded catalyst history", 1, 0.0);
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

/// Flags markets where a wrong-tail outcome would be unusually costly:
/// near-boundary prices combined with high volatility or unresolved
/// ambiguity in the resolution criteria.
pub struct TailRiskAgent;

#[async_trait]
impl SpecialistAgent for TailRiskAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::TailRisk
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();

        let near_boundary = mbd.current_probability > 0.92 || mbd.current_probability < 0.08;
        if near_boundary && matches!(mbd.volatility_regime, VolatilityRegime::High) {
            let toward_center = -(mbd.current_probability - 0.5).signum() * 0.03;
            stack.push("near-boundary price under high volatility", 3, toward_center);
        }
        if !mbd.metadata.ambiguity_flags.is_empty() {
            stack.push("unresolved ambiguity in resolution criteria", 2, 0.0);
        }
        if stack.is_empty() {
            stack.push("no elevated tail risk detected", 1, 0.0);
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

/// Reads catalysts that fall between now and expiry as scheduled
/// information events the market has not fully priced in yet.
pub struct CatalystAgent;

#[async_trait]
impl SpecialistAgent for CatalystAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Catalyst
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();
        let now = Utc::now();

        let upcoming = mbd
            .metadata
            .key_catalysts
            .iter()
            .filter(|c| c.timestamp > now && c.timestamp < mbd.expiry_timestamp)
            .count();

        if upcoming > 0 {
            stack.push("scheduled catalyst ahead of expiry", 2, 0.0);
        } else {
            stack.push("no scheduled catalysts remaining", 1, 0.0);
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_intel_core::MarketMetadata;

    fn sample_mbd() -> MarketBriefingDocument {
        MarketBriefingDocument {
            market_id: "m1".into(),
            condition_id: "c1".into(),
            event_type: EventType::Election,
            question: "Will X happen?".into(),
            resolution_criteria: "Resolves YES if X".into(),
            expiry_timestamp: Utc::now() + chrono::Duration::days(60),
            current_probability: 0.8,
            liquidity_score: 5.0,
            bid_ask_spread: 0.02,
            volatility_regime: VolatilityRegime::Medium,
            volume_24h: 20_000.0,
            metadata: MarketMetadata::default(),
        }
    }

    #[tokio::test]
    async fn probability_baseline_pulls_toward_reference_class() {
        let mbd = sample_mbd();
        let external = ExternalDataBundle::default();
        let signal = ProbabilityBaselineAgent.analyze(&mbd, &external).await.unwrap();
        assert!(signal.fair_probability < mbd.current_probability);
        signal.validate().unwrap();
    }

    #[tokio::test]
    async fn tail_risk_flags_near_boundary_high_volatility_markets() {
        let mut mbd = sample_mbd();
        mbd.current_probability = 0.97;
        mbd.volatility_regime = VolatilityRegime::High;
        let external = ExternalDataBundle::default();
        let signal = TailRiskAgent.analyze(&mbd, &external).await.unwrap();
        assert!(signal.fair_probability < mbd.current_probability);
    }
}
