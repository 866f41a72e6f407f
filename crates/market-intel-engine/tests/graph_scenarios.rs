//! Integration tests driving the full graph and the consensus/recommendation
//! slice against in-memory test doubles, covering the six literal scenarios
//! plus the checkpoint-resumption case.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use market_intel_consensus::build_consensus;
use market_intel_core::{
    Action, AgentKind, AgentSignal, CheckpointStore, ConsensusError, Direction, EngineConfig,
    EventType, ExternalDataBundle, GraphState, MarketBriefingDocument, MarketMetadata,
    ProviderMode, Regime, TradeRecommendation, VolatilityRegime,
};
use market_intel_debate::{construct_theses, run_cross_examination};
use market_intel_engine::agents::run_agents;
use market_intel_engine::checkpoint::InMemoryCheckpointStore;
use market_intel_engine::{run_analysis, EngineContext};
use signal_fusion::fuse_signals;

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

fn sample_mbd(current_probability: f64) -> MarketBriefingDocument {
    MarketBriefingDocument {
        market_id: "m1".into(),
        condition_id: "c1".into(),
        event_type: EventType::Election,
        question: "Will X happen?".into(),
        resolution_criteria: "Resolves YES if X occurs by the stated deadline".into(),
        expiry_timestamp: Utc::now() + chrono::Duration::days(30),
        current_probability,
        liquidity_score: 6.0,
        bid_ask_spread: 0.02,
        volatility_regime: VolatilityRegime::Medium,
        volume_24h: 40_000.0,
        metadata: MarketMetadata::default(),
    }
}

fn signal(name: &str, fair_probability: f64) -> AgentSignal {
    AgentSignal {
        agent_name: name.to_string(),
        timestamp: Utc::now(),
        confidence: 0.7,
        direction: Direction::from_probability(fair_probability, 0.02),
        fair_probability,
        key_drivers: vec!["synthetic fixture driver".to_string()],
        risk_factors: vec![],
        metadata: serde_json::Value::Null,
        processing_time_ms: 1,
    }
}

/// Runs the signal-fusion through recommendation-synthesis slice of the
/// graph exactly as `run_analysis` sequences it, over a hand-built signal
/// set instead of a live agent fan-out.
fn run_decision_pipeline(
    mbd: &MarketBriefingDocument,
    signals: Vec<AgentSignal>,
    config: &EngineConfig,
) -> Result<TradeRecommendation, ConsensusError> {
    let fused = fuse_signals(&signals, mbd, config).expect("fixture always has enough signals");
    let (bull, bear) = construct_theses(&fused, &signals, mbd);
    let debate = run_cross_examination(&bull, &bear, &signals, mbd, &fused);
    let consensus = build_consensus(&signals, &fused, &bull, &bear, &debate, config)?;
    Ok(market_intel_consensus::build_recommendation(&consensus, &bull, &bear, &debate, mbd, config))
}

#[test]
fn efficient_market_yields_no_trade() {
    let mbd = sample_mbd(0.55);
    let signals = vec![signal("a", 0.55), signal("b", 0.54), signal("c", 0.56), signal("d", 0.55)];
    let rec = run_decision_pipeline(&mbd, signals, &test_config()).expect("low disagreement never fails consensus");
    assert_eq!(rec.action, Action::NoTrade);
}

#[test]
fn clear_edge_yields_a_directional_trade() {
    let mbd = sample_mbd(0.50);
    let signals = vec![signal("a", 0.72), signal("b", 0.70), signal("c", 0.71), signal("d", 0.69)];
    let rec = run_decision_pipeline(&mbd, signals, &test_config()).expect("low disagreement never fails consensus");
    assert_eq!(rec.action, Action::LongYes);
    assert!(rec.expected_value.is_finite());
}

#[test]
fn high_but_tolerable_disagreement_still_yields_a_recommendation() {
    let mbd = sample_mbd(0.50);
    let signals = vec![signal("a", 0.90), signal("b", 0.30), signal("c", 0.70), signal("d", 0.50)];
    let config = test_config();
    let consensus = {
        let fused = fuse_signals(&signals, &mbd, &config).unwrap();
        let (bull, bear) = construct_theses(&fused, &signals, &mbd);
        let debate = run_cross_examination(&bull, &bear, &signals, &mbd, &fused);
        build_consensus(&signals, &fused, &bull, &bear, &debate, &config)
            .expect("disagreement below the consensus-fail threshold")
    };
    assert!(consensus.disagreement_index > config.high_disagreement_threshold);
    assert!(consensus.disagreement_index <= config.consensus_fail_threshold);
    assert!(matches!(consensus.regime, Regime::HighUncertainty));

    let rec = run_decision_pipeline(&mbd, signals, &config).expect("disagreement below the consensus-fail threshold");
    assert!(!rec.explanation.summary.is_empty());
}

#[test]
fn extreme_disagreement_fails_consensus() {
    let mbd = sample_mbd(0.50);
    let signals = vec![signal("a", 0.95), signal("b", 0.05), signal("c", 0.95), signal("d", 0.05)];
    let err = run_decision_pipeline(&mbd, signals, &test_config()).unwrap_err();
    assert!(matches!(err, ConsensusError::ConsensusFailed(_)));
}

#[tokio::test]
async fn resumes_from_a_mid_graph_checkpoint_without_rerunning_ingestion() {
    let condition_id = "resume-market-001";
    let config = test_config();

    let mbd = sample_mbd(0.50);
    let mut seeded_state = GraphState::new(condition_id.to_string());
    seeded_state.mbd = Some(mbd.clone());
    seeded_state.active_agents = vec!["probability_baseline".to_string(), "risk_assessment".to_string()];
    seeded_state.agent_selection_audit = vec![];
    seeded_state.external_data = Some(ExternalDataBundle::default());

    let checkpoint_store = InMemoryCheckpointStore::new();
    checkpoint_store.put(condition_id, "external_data_fetch", &seeded_state).await.unwrap();

    // Deliberately left unseeded: if `run_analysis` tried to re-run Market
    // Ingestion it would hit `MarketDataError::NotFound`.
    let market_data = market_data_client::InMemoryMarketDataProvider::new();

    let ctx = EngineContext::new(
        config,
        Arc::new(market_data),
        Arc::new(llm_client::LlmProviderRegistry::mock()),
        Arc::new(checkpoint_store),
    );

    let state = run_analysis(condition_id, &ctx).await;

    assert!(state.ingestion_error.is_none());
    assert!(state.mbd.is_some());
    assert!(state.recommendation.is_some());
    assert!(!state.agent_signals.is_empty());
}

/// Scenario: a selected agent that requires a feed External Data Fetch never
/// populated fails with a clean `AgentError`, while the rest of the fan-out
/// still produces usable signals.
#[tokio::test]
async fn partial_failure_does_not_block_the_rest_of_the_fan_out() {
    let mbd = sample_mbd(0.55);
    let external = ExternalDataBundle::default();
    let active = [
        AgentKind::ProbabilityBaseline,
        AgentKind::RiskAssessment,
        AgentKind::MediaSentiment,
    ];

    let update = run_agents(&active, &mbd, &external, Duration::from_secs(5)).await;

    assert_eq!(update.agent_signals.len(), 2);
    assert!(update.agent_signals.iter().any(|s| s.agent_name == "probability_baseline"));
    assert!(update.agent_signals.iter().any(|s| s.agent_name == "risk_assessment"));

    assert_eq!(update.agent_errors.len(), 1);
    assert_eq!(update.agent_errors[0].agent_name, "media_sentiment");
}
