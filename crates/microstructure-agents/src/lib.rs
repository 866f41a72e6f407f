//! Specialist agents reading a market's order-book microstructure: spread,
//! depth, and short-run price behavior implied by the briefing document's
//! aggregate fields. Adapted from the teacher's indicator-stacking shape
//! (collect weighted signals, combine into a score, derive confidence from
//! data richness and signal agreement) applied to probability markets rather
//! than OHLCV bars.

mod signal_stack;

use async_trait::async_trait;
use chrono::Utc;
use market_intel_core::{
    AgentError, AgentErrorKind, AgentKind, AgentSignal, Direction, ExternalDataBundle,
    MarketBriefingDocument, SpecialistAgent, VolatilityRegime, NEUTRAL_EPSILON,
};
use signal_stack::SignalStack;
use std::time::Instant;

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
            message: "no microstructure signals were triggered".to_string(),
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

/// Reads spread and depth: a wide spread relative to liquidity signals a
/// market the crowd hasn't converged on yet, which pulls the fair read
/// toward the book's implied mid rather than the last trade.
pub struct MarketMicrostructureAgent;

#[async_trait]
impl SpecialistAgent for MarketMicrostructureAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::MarketMicrostructure
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();

        if mbd.bid_ask_spread > 0.05 {
            stack.push("wide bid-ask spread", 2, -0.03 * mbd.bid_ask_spread.min(1.0));
        } else if mbd.bid_ask_spread < 0.01 {
            stack.push("tight bid-ask spread", 1, 0.0);
        }

        if mbd.liquidity_score < 2.0 {
            stack.push("thin order book depth", 3, -0.02);
        } else if mbd.liquidity_score > 7.0 {
            stack.push("deep order book", 1, 0.01);
        }

        if matches!(mbd.volatility_regime, VolatilityRegime::High) {
            stack.push("high realized volatility", 2, 0.0);
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

/// Treats heavy 24h volume as confirmation that the crowd is still pricing
/// in new information, nudging the fair read further in the direction the
/// market has already been moving.
pub struct MomentumAgent;

#[async_trait]
impl SpecialistAgent for MomentumAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Momentum
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();
        let away_from_half = mbd.current_probability - 0.5;

        if mbd.volume_24h > 50_000.0 && away_from_half.abs() > 0.05 {
            let direction_sign = away_from_half.signum();
            stack.push("high volume extends the prevailing read", 3, 0.04 * direction_sign);
        }
        if mbd.volume_24h < 1_000.0 {
            stack.push("low volume, momentum unconfirmed", 1, -0.01 * away_from_half.signum());
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

/// The mirror image of momentum: extreme prices on thin volume are read as
/// overextended and due to drift back toward 0.5.
pub struct MeanReversionAgent;

#[async_trait]
impl SpecialistAgent for MeanReversionAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::MeanReversion
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();
        let extremity = (mbd.current_probability - 0.5).abs();

        if extremity > 0.40 && mbd.volume_24h < 10_000.0 {
            let pull_toward_half = -(mbd.current_probability - 0.5).signum() * 0.03;
            stack.push("extreme price on thin volume, pulled toward 0.5", 2, pull_toward_half);
        }
        if matches!(mbd.volatility_regime, VolatilityRegime::High) && extremity > 0.30 {
            stack.push("high volatility regime at an extreme price", 1, 0.0);
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

/// Reads the raw distance of the last trade from a no-information prior,
/// independent of momentum or liquidity context — the most literal possible
/// specialist, included as a baseline the others are measured against.
pub struct PriceActionAgent;

#[async_trait]
impl SpecialistAgent for PriceActionAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::PriceAction
    }

    async fn analyze(
        &self,
        mbd: &MarketBriefingDocument,
        _external: &ExternalDataBundle,
    ) -> Result<AgentSignal, AgentError> {
        let started = Instant::now();
        let mut stack = SignalStack::new();
        stack.push("last traded price", 2, 0.0);
        if mbd.current_probability > 0.9 || mbd.current_probability < 0.1 {
            stack.push("near-boundary price", 1, 0.0);
        }

        build_signal(self.kind(), mbd, stack, started)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_intel_core::{EventType, MarketMetadata};

    fn sample_mbd() -> MarketBriefingDocument {
        MarketBriefingDocument {
            market_id: "m1".into(),
            condition_id: "c1".into(),
            event_type: EventType::Election,
            question: "Will X happen?".into(),
            resolution_criteria: "Resolves YES if X".into(),
            expiry_timestamp: Utc::now() + chrono::Duration::days(10),
            current_probability: 0.62,
            liquidity_score: 6.0,
            bid_ask_spread: 0.02,
            volatility_regime: VolatilityRegime::Medium,
            volume_24h: 80_000.0,
            metadata: MarketMetadata::default(),
        }
    }

    #[tokio::test]
    async fn momentum_agent_extends_confident_reads_on_high_volume() {
        let mbd = sample_mbd();
        let external = ExternalDataBundle::default();
        let signal = MomentumAgent.analyze(&mbd, &external).await.unwrap();
        assert!(signal.fair_probability > mbd.current_probability);
        signal.validate().unwrap();
    }

    #[tokio::test]
    async fn market_microstructure_penalizes_thin_books() {
        let mut mbd = sample_mbd();
        mbd.liquidity_score = 0.5;
        let external = ExternalDataBundle::default();
        let signal = MarketMicrostructureAgent.analyze(&mbd, &external).await.unwrap();
        assert!(signal.fair_probability < mbd.current_probability);
    }
}
