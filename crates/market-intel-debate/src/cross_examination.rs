use market_intel_core::{
    AdversarialTest, AgentSignal, DebateRecord, FusedSignal, MarketBriefingDocument, Thesis,
    ThesisDirection, TestOutcome, TestType,
};

const TEST_TYPES: [TestType; 5] = [
    TestType::Evidence,
    TestType::Causality,
    TestType::Timing,
    TestType::Liquidity,
    TestType::TailRisk,
];

fn outcome_for(score: f64) -> TestOutcome {
    if score > 0.3 {
        TestOutcome::Survived
    } else if score < -0.3 {
        TestOutcome::Refuted
    } else {
        TestOutcome::Weakened
    }
}

fn score_evidence(thesis: &Thesis, total_signals: usize) -> f64 {
    if total_signals == 0 {
        return 0.0;
    }
    let ratio = thesis.supporting_signals.len() as f64 / total_signals as f64;
    ((ratio - 0.5) * 2.0).clamp(-1.0, 1.0)
}

fn score_causality(thesis: &Thesis) -> f64 {
    if thesis.catalysts.iter().any(|c| c != "no distinguishing catalyst recorded") {
        0.5
    } else {
        -0.4
    }
}

fn score_timing(mbd: &MarketBriefingDocument) -> f64 {
    let days_remaining = (mbd.expiry_timestamp - chrono::Utc::now()).num_days();
    if days_remaining < 2 {
        0.6
    } else if days_remaining > 60 {
        -0.3
    } else {
        0.1
    }
}

fn score_liquidity(mbd: &MarketBriefingDocument) -> f64 {
    if mbd.liquidity_score < 2.0 || mbd.bid_ask_spread > 0.08 {
        -0.5
    } else if mbd.liquidity_score > 6.0 {
        0.4
    } else {
        0.0
    }
}

fn score_tail_risk(thesis: &Thesis, mbd: &MarketBriefingDocument) -> f64 {
    let ambiguous = !mbd.metadata.ambiguity_flags.is_empty();
    let large_edge = thesis.edge > 0.25;
    if ambiguous && large_edge {
        -0.6
    } else if ambiguous {
        -0.2
    } else {
        0.3
    }
}

fn build_tests(
    side: ThesisDirection,
    thesis: &Thesis,
    mbd: &MarketBriefingDocument,
    total_signals: usize,
) -> Vec<AdversarialTest> {
    let scores = [
        score_evidence(thesis, total_signals),
        score_causality(thesis),
        score_timing(mbd),
        score_liquidity(mbd),
        score_tail_risk(thesis, mbd),
    ];

    TEST_TYPES
        .iter()
        .zip(scores.iter())
        .map(|(test_type, score)| AdversarialTest {
            side,
            test_type: *test_type,
            claim: format!("{:?} supports the {:?} thesis", test_type, side),
            challenge: format!("challenge the {:?} evidence behind the {:?} thesis", test_type, side),
            outcome: outcome_for(*score),
            score: *score,
        })
        .collect()
}

fn mean_where(tests: &[AdversarialTest], outcome: TestOutcome) -> f64 {
    let matching: Vec<f64> = tests
        .iter()
        .filter(|t| t.outcome == outcome)
        .map(|t| t.score)
        .collect();
    if matching.is_empty() {
        0.0
    } else {
        matching.iter().sum::<f64>() / matching.len() as f64
    }
}

fn distinct_test_type_span(tests: &[AdversarialTest], outcome: TestOutcome) -> usize {
    let mut seen = std::collections::HashSet::new();
    for t in tests.iter().filter(|t| t.outcome == outcome) {
        seen.insert(format!("{:?}", t.test_type));
    }
    seen.len()
}

/// Determines which side the debate favors, tie-breaking by whichever
/// side's surviving tests span more distinct test types when the scores
/// themselves are equal.
pub fn winning_side(bull_tests: &[AdversarialTest], bear_tests: &[AdversarialTest], bull_score: f64, bear_score: f64) -> ThesisDirection {
    if (bull_score - bear_score).abs() > 1e-9 {
        return if bull_score > bear_score { ThesisDirection::Yes } else { ThesisDirection::No };
    }
    let bull_span = distinct_test_type_span(bull_tests, TestOutcome::Survived);
    let bear_span = distinct_test_type_span(bear_tests, TestOutcome::Survived);
    if bull_span >= bear_span { ThesisDirection::Yes } else { ThesisDirection::No }
}

/// Runs cross-examination for both theses: one adversarial test per test
/// type per side, scored deterministically from the market's own
/// structural data rather than a language model, so the resulting debate
/// record reproduces exactly given the same inputs.
pub fn run_cross_examination(
    bull: &Thesis,
    bear: &Thesis,
    signals: &[AgentSignal],
    mbd: &MarketBriefingDocument,
    _fused: &FusedSignal,
) -> DebateRecord {
    let total = signals.len();
    let bull_tests = build_tests(ThesisDirection::Yes, bull, mbd, total);
    let bear_tests = build_tests(ThesisDirection::No, bear, mbd, total);

    let bull_score = mean_where(&bull_tests, TestOutcome::Survived) - mean_where(&bull_tests, TestOutcome::Refuted);
    let bear_score = mean_where(&bear_tests, TestOutcome::Survived) - mean_where(&bear_tests, TestOutcome::Refuted);

    let mut key_disagreements = Vec::new();
    for conflict in &_fused.conflicting_signals {
        key_disagreements.push(format!(
            "{} vs {} disagree by {:.2}",
            conflict.agent_a, conflict.agent_b, conflict.disagreement
        ));
    }

    let mut tests = bull_tests;
    tests.extend(bear_tests);

    DebateRecord { tests, bull_score, bear_score, key_disagreements }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_intel_core::{EventType, MarketMetadata, VolatilityRegime};
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

    fn sample_thesis(direction: ThesisDirection, supporting: usize) -> Thesis {
        Thesis {
            direction,
            fair_probability: 0.65,
            market_probability: 0.5,
            edge: 0.15,
            core_argument: "test".to_string(),
            catalysts: vec!["scheduled hearing".to_string()],
            failure_conditions: vec!["reversal".to_string()],
            supporting_signals: (0..supporting).map(|i| format!("agent_{i}")).collect(),
        }
    }

    #[test]
    fn produces_two_tests_per_side_per_type() {
        let mbd = sample_mbd();
        let bull = sample_thesis(ThesisDirection::Yes, 3);
        let bear = sample_thesis(ThesisDirection::No, 1);
        let fused = FusedSignal {
            fair_probability: 0.6,
            confidence: 0.6,
            weights: HashMap::new(),
            conflicting_signals: vec![],
            signal_alignment: 0.7,
        };
        let record = run_cross_examination(&bull, &bear, &[], &mbd, &fused);
        assert_eq!(record.tests.len(), 10);
    }
}
