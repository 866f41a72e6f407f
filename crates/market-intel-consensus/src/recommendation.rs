//! Recommendation synthesis: turns a `Consensus` into an actionable
//! `TradeRecommendation` with entry/target zones in cents and an
//! expected-value estimate.

use market_intel_core::{
    Action, Consensus, DebateRecord, Explanation, LiquidityRisk, MarketBriefingDocument,
    PriceZone, Regime, RecommendationMetadata, Thesis, ThesisDirection, TradeRecommendation,
};
use market_intel_debate::winning_side;

use crate::consensus::is_efficiently_priced;
use market_intel_core::EngineConfig;

fn select_action(
    consensus_probability: f64,
    market_probability: f64,
    edge: f64,
    efficiently_priced: bool,
    regime: Regime,
    config: &EngineConfig,
) -> Action {
    if efficiently_priced || (matches!(regime, Regime::HighUncertainty) && edge < 2.0 * config.min_edge_threshold) {
        return Action::NoTrade;
    }
    if consensus_probability > market_probability + config.min_edge_threshold {
        Action::LongYes
    } else if consensus_probability < market_probability - config.min_edge_threshold {
        Action::LongNo
    } else {
        Action::NoTrade
    }
}

fn liquidity_risk(liquidity_score: f64, bid_ask_spread: f64) -> LiquidityRisk {
    if liquidity_score < 2.0 || bid_ask_spread > 0.08 {
        LiquidityRisk::High
    } else if liquidity_score < 5.0 || bid_ask_spread > 0.04 {
        LiquidityRisk::Medium
    } else {
        LiquidityRisk::Low
    }
}

fn widen(center_cents: i32, half_width_cents: i32) -> PriceZone {
    PriceZone {
        lo_cents: (center_cents - half_width_cents).clamp(1, 99),
        hi_cents: (center_cents + half_width_cents).clamp(1, 99),
    }
}

fn liquidity_multiplier(risk: LiquidityRisk) -> f64 {
    match risk {
        LiquidityRisk::Low => 1.0,
        LiquidityRisk::Medium => 1.5,
        LiquidityRisk::High => 2.2,
    }
}

/// Synthesizes the final `TradeRecommendation` from a completed Consensus
/// Engine pass, the winning debate side, and the underlying market document.
pub fn build_recommendation(
    consensus: &Consensus,
    bull: &Thesis,
    bear: &Thesis,
    debate: &DebateRecord,
    mbd: &MarketBriefingDocument,
    config: &EngineConfig,
) -> TradeRecommendation {
    let edge = (consensus.consensus_probability - mbd.current_probability).abs();
    let efficiently_priced = is_efficiently_priced(consensus.consensus_probability, mbd.current_probability, config);
    let action = select_action(
        consensus.consensus_probability,
        mbd.current_probability,
        edge,
        efficiently_priced,
        consensus.regime,
        config,
    );

    let liquidity_risk = liquidity_risk(mbd.liquidity_score, mbd.bid_ask_spread);

    let current_cents = (mbd.current_probability * 100.0).round() as i32;
    let entry_half_width = (2.0 + consensus.confidence_band.width() * 50.0 * liquidity_multiplier(liquidity_risk)).round() as i32;
    let entry_zone = widen(current_cents, entry_half_width.max(1));

    let target_cents = (consensus.consensus_probability * 100.0).round() as i32;
    let target_half_width = (consensus.confidence_band.width() * 50.0).round() as i32;
    let target_zone = widen(target_cents.clamp(5, 95), target_half_width.max(1));

    let entry_mid = (entry_zone.lo_cents + entry_zone.hi_cents) as f64 / 200.0;
    let payoff_yes = 1.0 - entry_mid;
    let payoff_no = entry_mid;
    let cost = entry_mid;
    let expected_value = 100.0
        * (consensus.consensus_probability * payoff_yes + (1.0 - consensus.consensus_probability) * payoff_no - cost);

    let bull_tests: Vec<_> = debate.tests.iter().filter(|t| t.side == ThesisDirection::Yes).cloned().collect();
    let bear_tests: Vec<_> = debate.tests.iter().filter(|t| t.side == ThesisDirection::No).cloned().collect();
    let side = winning_side(&bull_tests, &bear_tests, debate.bull_score, debate.bear_score);
    let winning_thesis = match side {
        ThesisDirection::Yes => bull,
        ThesisDirection::No => bear,
    };

    let mut key_catalysts = bull.catalysts.clone();
    for c in &bear.catalysts {
        if !key_catalysts.contains(c) {
            key_catalysts.push(c.clone());
        }
    }
    let mut failure_scenarios = bull.failure_conditions.clone();
    for f in &bear.failure_conditions {
        if !failure_scenarios.contains(f) {
            failure_scenarios.push(f.clone());
        }
    }

    let uncertainty_note = if matches!(consensus.regime, Regime::HighConfidence) {
        None
    } else {
        Some(format!(
            "disagreement_index {:.2} places this read in a {:?} regime; size accordingly",
            consensus.disagreement_index, consensus.regime
        ))
    };

    let summary = format!(
        "Consensus probability {:.0}c against a market price of {:.0}c ({} action, {:?} liquidity risk).",
        consensus.consensus_probability * 100.0,
        mbd.current_probability * 100.0,
        match action {
            Action::LongYes => "LONG_YES",
            Action::LongNo => "LONG_NO",
            Action::NoTrade => "NO_TRADE",
        },
        liquidity_risk
    );

    TradeRecommendation {
        action,
        entry_zone,
        target_zone,
        expected_value,
        win_probability: consensus.consensus_probability,
        liquidity_risk,
        explanation: Explanation {
            summary,
            core_thesis: winning_thesis.core_argument.clone(),
            key_catalysts,
            failure_scenarios,
            uncertainty_note,
        },
        metadata: RecommendationMetadata {
            market_probability: mbd.current_probability,
            consensus_probability: consensus.consensus_probability,
            edge,
            confidence_band: consensus.confidence_band,
        },
    }
}
