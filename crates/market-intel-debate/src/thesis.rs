use market_intel_core::{AgentSignal, FusedSignal, MarketBriefingDocument, Thesis, ThesisDirection};

fn fallback(items: Vec<String>, placeholder: &str) -> Vec<String> {
    if items.is_empty() {
        vec![placeholder.to_string()]
    } else {
        items
    }
}

/// Builds the bull thesis: the fused probability projected onto the YES
/// side, never below a coin flip.
fn build_bull(fused: &FusedSignal, signals: &[AgentSignal], mbd: &MarketBriefingDocument) -> Thesis {
    let fair_probability = fused.fair_probability.max(0.5);
    let edge = (fair_probability - mbd.current_probability).abs();

    let supporting_signals: Vec<String> = signals
        .iter()
        .filter(|s| s.fair_probability >= 0.5)
        .map(|s| s.agent_name.clone())
        .collect();

    let catalysts = fallback(
        mbd.metadata.key_catalysts.iter().map(|c| c.event.clone()).collect(),
        "no distinguishing catalyst recorded",
    );

    let failure_conditions = fallback(
        signals
            .iter()
            .filter(|s| s.fair_probability < 0.5)
            .flat_map(|s| s.risk_factors.clone())
            .collect(),
        "no specific failure scenario identified",
    );

    let core_argument = if supporting_signals.is_empty() {
        "fused signal favors YES even without majority agent support".to_string()
    } else {
        format!(
            "{} of {} specialist signals place fair probability at or above 0.5, backing a YES read",
            supporting_signals.len(),
            signals.len()
        )
    };

    Thesis {
        direction: ThesisDirection::Yes,
        fair_probability,
        market_probability: mbd.current_probability,
        edge,
        core_argument,
        catalysts,
        failure_conditions,
        supporting_signals: fallback(supporting_signals, "fused_signal".to_string()),
    }
}

fn build_bear(fused: &FusedSignal, signals: &[AgentSignal], mbd: &MarketBriefingDocument) -> Thesis {
    let fair_probability = fused.fair_probability.min(0.5);
    let edge = (fair_probability - mbd.current_probability).abs();

    let supporting_signals: Vec<String> = signals
        .iter()
        .filter(|s| s.fair_probability < 0.5)
        .map(|s| s.agent_name.clone())
        .collect();

    let catalysts = fallback(
        mbd.metadata.key_catalysts.iter().map(|c| c.event.clone()).collect(),
        "no distinguishing catalyst recorded",
    );

    let failure_conditions = fallback(
        signals
            .iter()
            .filter(|s| s.fair_probability >= 0.5)
            .flat_map(|s| s.risk_factors.clone())
            .collect(),
        "no specific failure scenario identified",
    );

    let core_argument = if supporting_signals.is_empty() {
        "fused signal favors NO even without majority agent support".to_string()
    } else {
        format!(
            "{} of {} specialist signals place fair probability below 0.5, backing a NO read",
            supporting_signals.len(),
            signals.len()
        )
    };

    Thesis {
        direction: ThesisDirection::No,
        fair_probability,
        market_probability: mbd.current_probability,
        edge,
        core_argument,
        catalysts,
        failure_conditions,
        supporting_signals: fallback(supporting_signals, "fused_signal".to_string()),
    }
}

/// Produces the bull/bear thesis pair from a completed Signal Fusion pass.
/// Both sides always carry at least the `fused_signal` placeholder in
/// `supporting_signals` even when no individual agent backs that side.
pub fn construct_theses(
    fused: &FusedSignal,
    signals: &[AgentSignal],
    mbd: &MarketBriefingDocument,
) -> (Thesis, Thesis) {
    (build_bull(fused, signals, mbd), build_bear(fused, signals, mbd))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_intel_core::{Direction, EventType, MarketMetadata, VolatilityRegime};
    use std::collections::HashMap;

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

    fn signal(name: &str, p: f64) -> AgentSignal {
        AgentSignal {
            agent_name: name.to_string(),
            timestamp: Utc::now(),
            confidence: 0.6,
            direction: Direction::from_probability(p, market_intel_core::NEUTRAL_EPSILON),
            fair_probability: p,
            key_drivers: vec!["d".to_string()],
            risk_factors: vec!["thin liquidity".to_string()],
            metadata: serde_json::json!({}),
            processing_time_ms: 1,
        }
    }

    #[test]
    fn bull_never_projects_below_a_coin_flip() {
        let mbd = sample_mbd();
        let fused = FusedSignal {
            fair_probability: 0.3,
            confidence: 0.5,
            weights: HashMap::new(),
            conflicting_signals: vec![],
            signal_alignment: 0.8,
        };
        let signals = vec![signal("a", 0.3), signal("b", 0.35)];
        let (bull, bear) = construct_theses(&fused, &signals, &mbd);
        assert!(bull.fair_probability >= 0.5);
        assert!(bear.fair_probability <= 0.5);
        assert!(!bull.catalysts.is_empty());
        assert!(!bull.failure_conditions.is_empty());
    }
}
