//! Consensus Engine: reconciles the fused signal, the bull/bear theses and
//! the debate record into one consensus probability with a confidence band
//! and a regime classification. Grounded in the teacher's
//! `confidence-calibrator::uncertainty` bucket-threshold style for the band
//! width and regime ladder.

use market_intel_core::{
    AgentSignal, Consensus, ConsensusError, ConvictionTier, DebateRecord, EngineConfig,
    FusedSignal, Regime, Thesis, ThesisDirection,
};
use market_intel_debate::winning_side;
use market_stats::{clamp_unit, population_std_dev};

fn classify_regime(disagreement_index: f64) -> Regime {
    if disagreement_index < 0.10 {
        Regime::HighConfidence
    } else if disagreement_index < 0.20 {
        Regime::ModerateConfidence
    } else {
        Regime::HighUncertainty
    }
}

fn classify_conviction(regime: Regime, signal_alignment: f64) -> ConvictionTier {
    match regime {
        Regime::HighConfidence if signal_alignment >= 0.6 => ConvictionTier::High,
        Regime::HighConfidence => ConvictionTier::Moderate,
        Regime::ModerateConfidence => ConvictionTier::Moderate,
        Regime::HighUncertainty => ConvictionTier::Low,
    }
}

/// Runs the Consensus Engine. Requires both theses, a debate record and at
/// least two agent signals; anything short of that is `INSUFFICIENT_DATA`.
/// A disagreement index above `config.consensus_fail_threshold` aborts with
/// `CONSENSUS_FAILED` rather than widening the band further.
pub fn build_consensus(
    signals: &[AgentSignal],
    fused: &FusedSignal,
    bull: &Thesis,
    bear: &Thesis,
    debate: &DebateRecord,
    config: &EngineConfig,
) -> Result<Consensus, ConsensusError> {
    if signals.len() < 2 {
        return Err(ConsensusError::InsufficientData(format!(
            "consensus requires at least 2 agent signals, got {}",
            signals.len()
        )));
    }

    let probabilities: Vec<f64> = signals.iter().map(|s| s.fair_probability).collect();
    let disagreement_index = clamp_unit(population_std_dev(&probabilities));

    if disagreement_index > config.consensus_fail_threshold {
        return Err(ConsensusError::ConsensusFailed(format!(
            "disagreement_index {:.3} exceeds the consensus-fail threshold {:.3}",
            disagreement_index, config.consensus_fail_threshold
        )));
    }

    let bull_tests: Vec<_> = debate.tests.iter().filter(|t| t.side == ThesisDirection::Yes).cloned().collect();
    let bear_tests: Vec<_> = debate.tests.iter().filter(|t| t.side == ThesisDirection::No).cloned().collect();
    let side = winning_side(&bull_tests, &bear_tests, debate.bull_score, debate.bear_score);
    let thesis_probability = match side {
        ThesisDirection::Yes => bull.fair_probability,
        ThesisDirection::No => bear.fair_probability,
    };

    let debate_margin = (debate.bull_score - debate.bear_score).abs();
    let nudge_weight = clamp_unit(debate_margin / 2.0) * 0.3;
    let consensus_probability = clamp_unit(
        fused.fair_probability * (1.0 - nudge_weight) + thesis_probability * nudge_weight,
    );

    let half_width = clamp_unit(config.base_confidence_band_width + disagreement_index).min(0.5) / 2.0;
    let confidence_band = market_intel_core::ConfidenceBand {
        lo: (consensus_probability - half_width).max(0.0),
        hi: (consensus_probability + half_width).min(1.0),
    };

    let regime = classify_regime(disagreement_index);
    let conviction_tier = classify_conviction(regime, fused.signal_alignment);

    Ok(Consensus {
        consensus_probability,
        confidence_band,
        disagreement_index,
        regime,
        conviction_tier,
        contributing_signals: signals.iter().map(|s| s.agent_name.clone()).collect(),
    })
}

/// Whether the market is already pricing the consensus read, per
/// `min_edge_threshold`.
pub fn is_efficiently_priced(consensus_probability: f64, market_probability: f64, config: &EngineConfig) -> bool {
    (consensus_probability - market_probability).abs() < config.min_edge_threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_intel_core::{Direction, ProviderMode};
    use std::collections::HashMap;

    fn signal(name: &str, p: f64) -> AgentSignal {
        AgentSignal {
            agent_name: name.to_string(),
            timestamp: Utc::now(),
            confidence: 0.6,
            direction: Direction::from_probability(p, market_intel_core::NEUTRAL_EPSILON),
            fair_probability: p,
            key_drivers: vec!["d".to_string()],
            risk_factors: vec![],
            metadata: serde_json::json!({}),
            processing_time_ms: 1,
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            conflict_threshold: 0.20,
            alignment_bonus: 0.20,
            min_agents_required: 2,
            high_disagreement_threshold: 0.15,
            consensus_fail_threshold: 0.30,
            base_confidence_band_width: 0.05,
            min_edge_threshold: 0.03,
            cache_ttl_secs: 300,
            rate_limit_max_calls: 30,
            rate_limit_window_secs: 60,
            circuit_breaker_failure_threshold: 5,
            circuit_breaker_reset_secs: 30,
            provider_mode: ProviderMode::Single,
            node_timeout_secs: 20,
            checkpoint_database_url: "sqlite://test.db".to_string(),
            min_volume_threshold: 5_000.0,
            max_cost_per_analysis: 1.0,
        }
    }

    fn sample_fused(p: f64, alignment: f64) -> FusedSignal {
        FusedSignal {
            fair_probability: p,
            confidence: 0.6,
            weights: HashMap::new(),
            conflicting_signals: vec![],
            signal_alignment: alignment,
        }
    }

    fn sample_thesis(direction: ThesisDirection, p: f64) -> Thesis {
        Thesis {
            direction,
            fair_probability: p,
            market_probability: 0.5,
            edge: (p - 0.5).abs(),
            core_argument: "x".into(),
            catalysts: vec!["c".into()],
            failure_conditions: vec!["f".into()],
            supporting_signals: vec!["agent".into()],
        }
    }

    #[test]
    fn high_disagreement_fails_consensus() {
        let signals = vec![signal("a", 0.1), signal("b", 0.9)];
        let fused = sample_fused(0.5, 0.1);
        let bull = sample_thesis(ThesisDirection::Yes, 0.6);
        let bear = sample_thesis(ThesisDirection::No, 0.4);
        let debate = DebateRecord { tests: vec![], bull_score: 0.2, bear_score: 0.1, key_disagreements: vec![] };
        let config = test_config();
        let err = build_consensus(&signals, &fused, &bull, &bear, &debate, &config).unwrap_err();
        assert!(matches!(err, ConsensusError::ConsensusFailed(_)));
    }

    #[test]
    fn low_disagreement_produces_high_confidence_regime() {
        let signals = vec![signal("a", 0.51), signal("b", 0.52), signal("c", 0.5)];
        let fused = sample_fused(0.51, 0.9);
        let bull = sample_thesis(ThesisDirection::Yes, 0.51);
        let bear = sample_thesis(ThesisDirection::No, 0.49);
        let debate = DebateRecord { tests: vec![], bull_score: 0.3, bear_score: 0.1, key_disagreements: vec![] };
        let config = test_config();
        let consensus = build_consensus(&signals, &fused, &bull, &bear, &debate, &config).unwrap();
        assert!(matches!(consensus.regime, Regime::HighConfidence));
        assert!(consensus.confidence_band.width() >= config.base_confidence_band_width);
    }

    #[test]
    fn identical_signals_yield_exactly_the_base_band_width() {
        let signals = vec![signal("a", 0.6), signal("b", 0.6), signal("c", 0.6)];
        let fused = sample_fused(0.6, 1.0);
        let bull = sample_thesis(ThesisDirection::Yes, 0.6);
        let bear = sample_thesis(ThesisDirection::No, 0.4);
        let debate = DebateRecord { tests: vec![], bull_score: 0.0, bear_score: 0.0, key_disagreements: vec![] };
        let config = test_config();
        let consensus = build_consensus(&signals, &fused, &bull, &bear, &debate, &config).unwrap();
        assert_eq!(consensus.disagreement_index, 0.0);
        assert_eq!(consensus.confidence_band.width(), config.base_confidence_band_width);
    }
}
