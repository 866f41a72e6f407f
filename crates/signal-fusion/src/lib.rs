//! Weighted aggregation of specialist agent signals into one fused read.
//! Weight computation, pairwise conflict detection, and the alignment
//! bonus are grounded in the `wynnforthework-polymarket-bot` fusion
//! module's `calculate_consensus`/`get_effective_weight`/regime-adjustment
//! shape, adapted from a directional ensemble (long/short/flat) to
//! continuous probability fusion.

use market_intel_core::{
    AgentSignal, EngineConfig, EngineError, EventType, FusedSignal, MarketBriefingDocument,
    SignalConflict, VolatilityRegime,
};
use market_stats::{clamp_unit, population_std_dev, weighted_mean};
use std::collections::HashMap;

/// Baseline importance per agent before any context adjustment. Agents not
/// listed default to 1.0.
fn base_weight(agent_name: &str) -> f64 {
    match agent_name {
        "market_microstructure" => 1.1,
        "probability_baseline" => 1.2,
        "polling_intelligence" => 1.3,
        _ => 1.0,
    }
}

/// Context adjustment keyed on event type and volatility regime, mirroring
/// the teacher's regime-adjustment step: the same agent is trusted more or
/// less depending on what kind of market it's reading.
fn context_adjustment(agent_name: &str, event_type: &EventType, regime: &VolatilityRegime) -> f64 {
    let mut adjustment = 1.0;

    let is_narrative = matches!(
        agent_name,
        "media_sentiment" | "social_sentiment" | "narrative_velocity" | "breaking_news"
            | "event_impact" | "polling_intelligence"
    );
    let is_microstructure = matches!(
        agent_name,
        "market_microstructure" | "momentum" | "mean_reversion" | "price_action"
    );

    if is_narrative && matches!(event_type, EventType::Election | EventType::Policy | EventType::Geopolitical) {
        adjustment *= 1.15;
    }
    if is_microstructure && matches!(regime, VolatilityRegime::High) {
        adjustment *= 1.2;
    }
    if is_microstructure && matches!(regime, VolatilityRegime::Low) {
        adjustment *= 0.9;
    }

    adjustment
}

/// Runs Signal Fusion over a completed agent fan-out. Requires at least
/// `config.min_agents_required` signals; fewer than that is an
/// `INSUFFICIENT_DATA` precondition failure, not a degraded fusion.
pub fn fuse_signals(
    signals: &[AgentSignal],
    mbd: &MarketBriefingDocument,
    config: &EngineConfig,
) -> Result<FusedSignal, EngineError> {
    if signals.len() < config.min_agents_required {
        return Err(EngineError::InsufficientData(format!(
            "signal fusion requires at least {} agent signals, got {}",
            config.min_agents_required,
            signals.len()
        )));
    }

    let probabilities: Vec<f64> = signals.iter().map(|s| s.fair_probability).collect();
    let confidences: Vec<f64> = signals.iter().map(|s| s.confidence).collect();

    let raw_weights: Vec<f64> = signals
        .iter()
        .map(|s| base_weight(&s.agent_name) * context_adjustment(&s.agent_name, &mbd.event_type, &mbd.volatility_regime))
        .collect();
    let weight_sum: f64 = raw_weights.iter().sum();
    let normalized_weights: Vec<f64> = if weight_sum > 0.0 {
        raw_weights.iter().map(|w| w / weight_sum).collect()
    } else {
        vec![1.0 / signals.len() as f64; signals.len()]
    };

    let mut weights = HashMap::new();
    for (signal, w) in signals.iter().zip(normalized_weights.iter()) {
        weights.insert(signal.agent_name.clone(), *w);
    }

    let mut conflicting_signals = Vec::new();
    for i in 0..signals.len() {
        for j in (i + 1)..signals.len() {
            let disagreement = (signals[i].fair_probability - signals[j].fair_probability).abs();
            if disagreement >= config.conflict_threshold {
                conflicting_signals.push(SignalConflict {
                    agent_a: signals[i].agent_name.clone(),
                    agent_b: signals[j].agent_name.clone(),
                    disagreement,
                });
            }
        }
    }

    let signal_alignment = clamp_unit(1.0 - 2.0 * population_std_dev(&probabilities));

    let fair_probability = clamp_unit(weighted_mean(&probabilities, &normalized_weights));

    let conflict_penalty = (1.0 - 0.05 * conflicting_signals.len() as f64).max(0.5);
    let alignment_boost = 1.0 + signal_alignment * config.alignment_bonus;
    let confidence = clamp_unit(weighted_mean(&confidences, &normalized_weights) * conflict_penalty * alignment_boost);

    Ok(FusedSignal {
        fair_probability,
        confidence,
        weights,
        conflicting_signals,
        signal_alignment,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_intel_core::{Direction, MarketMetadata};

    fn signal(name: &str, p: f64, confidence: f64) -> AgentSignal {
        AgentSignal {
            agent_name: name.to_string(),
            timestamp: Utc::now(),
            confidence,
            direction: Direction::from_probability(p, market_intel_core::NEUTRAL_EPSILON),
            fair_probability: p,
            key_drivers: vec!["driver".to_string()],
            risk_factors: vec![],
            metadata: serde_json::json!({}),
            processing_time_ms: 1,
        }
    }

    fn sample_mbd() -> MarketBriefingDocument {
        MarketBriefingDocument {
            market_id: "m1".into(),
            condition_id: "c1".into(),
            event_type: EventType::Election,
            question: "Will X happen?".into(),
            resolution_criteria: "Resolves YES if X".into(),
            expiry_timestamp: Utc::now() + chrono::Duration::days(10),
            current_probability: 0.5,
            liquidity_score: 5.0,
            bid_ask_spread: 0.02,
            volatility_regime: VolatilityRegime::Medium,
            volume_24h: 10_000.0,
            metadata: MarketMetadata::default(),
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
            provider_mode: market_intel_core::ProviderMode::Single,
            node_timeout_secs: 20,
            checkpoint_database_url: "sqlite://test.db".to_string(),
            min_volume_threshold: 5_000.0,
            max_cost_per_analysis: 1.0,
        }
    }

    #[test]
    fn single_signal_is_insufficient_data() {
        let mbd = sample_mbd();
        let config = test_config();
        let signals = vec![signal("momentum", 0.6, 0.7)];
        let err = fuse_signals(&signals, &mbd, &config).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientData(_)));
    }

    #[test]
    fn efficient_market_scenario_fuses_near_the_mean() {
        let mbd = sample_mbd();
        let config = test_config();
        let signals = vec![
            signal("momentum", 0.51, 0.6),
            signal("mean_reversion", 0.52, 0.6),
            signal("price_action", 0.53, 0.6),
        ];
        let fused = fuse_signals(&signals, &mbd, &config).unwrap();
        assert!((fused.fair_probability - 0.52).abs() < 0.02);
        assert!(fused.conflicting_signals.is_empty());
    }

    #[test]
    fn wide_disagreement_is_flagged_as_conflicting() {
        let mbd = sample_mbd();
        let config = test_config();
        let signals = vec![signal("momentum", 0.10, 0.5), signal("polling_intelligence", 0.90, 0.5)];
        let fused = fuse_signals(&signals, &mbd, &config).unwrap();
        assert_eq!(fused.conflicting_signals.len(), 1);
        assert!(fused.signal_alignment < 0.3);
    }
}
