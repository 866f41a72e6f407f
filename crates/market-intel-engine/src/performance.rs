//! Agent Performance Tracking (SPEC_FULL §4.10): a pure, within-analysis
//! read of each contributing agent's directional agreement with the final
//! consensus, exposed for the out-of-scope CLI's `--show-performance` flag.
//! No outcome learning or cross-thread history, grounded in the teacher's
//! `confidence-calibrator::history` rolling-bucket idea but deliberately
//! narrowed to a single thread's own `agent_signals`.

use market_intel_core::{AgentPerformanceRecord, AgentSignal, Consensus};

/// An agent "agreed" when its own fair-probability side of 0.5 matches the
/// consensus probability's side of 0.5. Agents that landed exactly at 0.5
/// are recorded as disagreeing, since they took no directional position.
pub fn record_performance(signals: &[AgentSignal], consensus: &Consensus) -> Vec<AgentPerformanceRecord> {
    let consensus_bullish = consensus.consensus_probability > 0.5;
    signals
        .iter()
        .map(|signal| {
            let agent_bullish = signal.fair_probability > 0.5;
            AgentPerformanceRecord {
                agent_name: signal.agent_name.clone(),
                agreed_with_consensus: signal.fair_probability != 0.5 && agent_bullish == consensus_bullish,
                fair_probability: signal.fair_probability,
                confidence: signal.confidence,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_intel_core::{ConfidenceBand, ConvictionTier, Direction, Regime};

    fn signal(name: &str, fair_probability: f64) -> AgentSignal {
        AgentSignal {
            agent_name: name.to_string(),
            timestamp: Utc::now(),
            confidence: 0.7,
            direction: Direction::from_probability(fair_probability, 0.02),
            fair_probability,
            key_drivers: vec![],
            risk_factors: vec![],
            metadata: serde_json::Value::Null,
            processing_time_ms: 1,
        }
    }

    fn consensus(consensus_probability: f64) -> Consensus {
        Consensus {
            consensus_probability,
            confidence_band: ConfidenceBand { lo: 0.4, hi: 0.6 },
            disagreement_index: 0.05,
            regime: Regime::ModerateConfidence,
            conviction_tier: ConvictionTier::Moderate,
            contributing_signals: vec![],
        }
    }

    #[test]
    fn agent_on_same_side_of_half_agrees() {
        let records = record_performance(&[signal("a", 0.7)], &consensus(0.65));
        assert!(records[0].agreed_with_consensus);
    }

    #[test]
    fn agent_on_opposite_side_disagrees() {
        let records = record_performance(&[signal("a", 0.3)], &consensus(0.65));
        assert!(!records[0].agreed_with_consensus);
    }

    #[test]
    fn agent_exactly_neutral_disagrees() {
        let records = record_performance(&[signal("a", 0.5)], &consensus(0.65));
        assert!(!records[0].agreed_with_consensus);
    }
}
