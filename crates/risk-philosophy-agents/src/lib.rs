//! Risk-philosophy agents shape how a recommendation is sized once the
//! consensus has already been formed; they never see or feed the fused
//! probability. Each philosophy reads the same [`Consensus`] and returns a
//! [`RiskPhilosophySignal`] carrying a position-sizing multiplier and the
//! rationale behind it.
//!
//! Kept deliberately separate from [`SpecialistAgent`]: mixing risk sizing
//! into the signal-fusion pool would let an agent that knows nothing about
//! the market's fundamentals move the probability estimate just by being
//! more or less risk tolerant.

use market_intel_core::{Consensus, ConvictionTier, Regime, RiskPhilosophy, RiskPhilosophySignal};

/// Contract for position-sizing philosophies. Separate from
/// `SpecialistAgent` on purpose: these run only after consensus exists,
/// and their output never re-enters fusion.
pub trait RiskPhilosophyAgent: Send + Sync {
    fn philosophy(&self) -> RiskPhilosophy;
    fn assess(&self, consensus: &Consensus) -> RiskPhilosophySignal;
}

fn conviction_scale(tier: ConvictionTier) -> f64 {
    match tier {
        ConvictionTier::High => 1.0,
        ConvictionTier::Moderate => 0.6,
        ConvictionTier::Low => 0.25,
    }
}

/// Sizes up aggressively when conviction is high and the market has moved
/// meaningfully off a coin flip, and tolerates more disagreement among
/// specialists than the other two philosophies.
pub struct AggressivePhilosophy;

impl RiskPhilosophyAgent for AggressivePhilosophy {
    fn philosophy(&self) -> RiskPhilosophy {
        RiskPhilosophy::Aggressive
    }

    fn assess(&self, consensus: &Consensus) -> RiskPhilosophySignal {
        let distance_from_coin_flip = (consensus.consensus_probability - 0.5).abs();
        let disagreement_tolerance = (1.0 - consensus.disagreement_index * 0.5).max(0.3);
        let multiplier = (0.8 + distance_from_coin_flip * 1.5)
            * conviction_scale(consensus.conviction_tier)
            * disagreement_tolerance;

        RiskPhilosophySignal {
            philosophy: self.philosophy(),
            sizing_multiplier: multiplier.clamp(0.0, 2.0),
            rationale: format!(
                "aggressive sizing: {:.0}% off a coin flip at {:?} conviction, disagreement {:.2}",
                distance_from_coin_flip * 100.0,
                consensus.conviction_tier,
                consensus.disagreement_index,
            ),
        }
    }
}

/// Refuses to size meaningfully unless conviction is high and the
/// specialists agree with each other; a wide confidence band or any
/// meaningful disagreement collapses the multiplier toward zero.
pub struct ConservativePhilosophy;

impl RiskPhilosophyAgent for ConservativePhilosophy {
    fn philosophy(&self) -> RiskPhilosophy {
        RiskPhilosophy::Conservative
    }

    fn assess(&self, consensus: &Consensus) -> RiskPhilosophySignal {
        let band_width = consensus.confidence_band.width();
        if consensus.conviction_tier != ConvictionTier::High || consensus.disagreement_index > 0.25 {
            return RiskPhilosophySignal {
                philosophy: self.philosophy(),
                sizing_multiplier: 0.1,
                rationale: format!(
                    "conservative stand-down: conviction {:?}, disagreement {:.2} exceeds tolerance",
                    consensus.conviction_tier, consensus.disagreement_index,
                ),
            };
        }

        let tightness = (1.0 - band_width).max(0.0);
        let multiplier = 0.4 * tightness;

        RiskPhilosophySignal {
            philosophy: self.philosophy(),
            sizing_multiplier: multiplier.clamp(0.0, 1.0),
            rationale: format!(
                "conservative sizing: high conviction with a {:.2}-wide confidence band",
                band_width,
            ),
        }
    }
}

/// Middle-of-the-road sizing: scales with conviction tier, damps
/// volatile-regime markets, and does not reward or punish disagreement
/// beyond what conviction already captures.
pub struct NeutralPhilosophy;

impl RiskPhilosophyAgent for NeutralPhilosophy {
    fn philosophy(&self) -> RiskPhilosophy {
        RiskPhilosophy::Neutral
    }

    fn assess(&self, consensus: &Consensus) -> RiskPhilosophySignal {
        let regime_damping = if matches!(consensus.regime, Regime::HighUncertainty) { 0.7 } else { 1.0 };
        let multiplier = 0.6 * conviction_scale(consensus.conviction_tier) * regime_damping;

        RiskPhilosophySignal {
            philosophy: self.philosophy(),
            sizing_multiplier: multiplier.clamp(0.0, 1.0),
            rationale: format!(
                "neutral sizing: {:?} conviction in a {:?} regime",
                consensus.conviction_tier, consensus.regime,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_intel_core::ConfidenceBand;

    fn sample_consensus(tier: ConvictionTier, disagreement: f64, band_width: f64) -> Consensus {
        Consensus {
            consensus_probability: 0.72,
            confidence_band: ConfidenceBand { lo: 0.72 - band_width / 2.0, hi: 0.72 + band_width / 2.0 },
            disagreement_index: disagreement,
            regime: Regime::HighConfidence,
            conviction_tier: tier,
            contributing_signals: vec!["momentum".to_string()],
        }
    }

    #[test]
    fn conservative_stands_down_on_low_conviction() {
        let consensus = sample_consensus(ConvictionTier::Low, 0.1, 0.1);
        let signal = ConservativePhilosophy.assess(&consensus);
        assert!(signal.sizing_multiplier < 0.2);
    }

    #[test]
    fn aggressive_sizes_up_with_high_conviction_and_distance_from_half() {
        let consensus = sample_consensus(ConvictionTier::High, 0.05, 0.08);
        let signal = AggressivePhilosophy.assess(&consensus);
        assert!(signal.sizing_multiplier > 0.8);
    }

    #[test]
    fn neutral_damps_uncertain_regimes() {
        let mut stable = sample_consensus(ConvictionTier::High, 0.05, 0.1);
        let mut uncertain = stable.clone();
        stable.regime = Regime::HighConfidence;
        uncertain.regime = Regime::HighUncertainty;

        let stable_signal = NeutralPhilosophy.assess(&stable);
        let uncertain_signal = NeutralPhilosophy.assess(&uncertain);
        assert!(uncertain_signal.sizing_multiplier < stable_signal.sizing_multiplier);
    }
}
