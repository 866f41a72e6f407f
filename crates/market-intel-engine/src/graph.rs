//! Analysis graph orchestrator: runs Market Ingestion through Recommendation
//! Synthesis as an explicit node sequence over one shared `GraphState`,
//! checkpointing after every node so a crash or restart resumes from the
//! last completed node rather than re-running the whole thread. Grounded in
//! the teacher's `AnalysisOrchestrator::analyze` method-call chain,
//! generalized from an in-memory-only run to a checkpoint-and-resume one.

use std::time::Duration;

use market_intel_consensus::{build_consensus, build_recommendation};
use market_intel_core::{AgentKind, ConsensusError, ExternalDataSource, GraphState, GraphStateUpdate};
use market_intel_debate::{construct_theses, run_cross_examination};
use risk_philosophy_agents::{AggressivePhilosophy, ConservativePhilosophy, NeutralPhilosophy, RiskPhilosophyAgent};
use signal_fusion::fuse_signals;

use crate::context::EngineContext;
use crate::selection::{select_agents, DataAvailability};
use crate::{agents, external_data, ingestion, narrative, performance};

/// Runs the full analysis graph for `condition_id`, resuming from the last
/// checkpoint under that thread id if one exists. Each node below is a
/// no-op when the state it would produce is already present, which is what
/// makes resumption safe to call unconditionally.
pub async fn run_analysis(condition_id: &str, ctx: &EngineContext) -> GraphState {
    let thread_id = condition_id;
    let mut state = match ctx.checkpoint_store.latest(thread_id).await {
        Ok(Some(record)) => {
            tracing::info!(node = %record.node, "resuming analysis from checkpoint");
            record.state
        }
        Ok(None) => GraphState::new(condition_id.to_string()),
        Err(e) => {
            tracing::warn!(error = %e, "checkpoint lookup failed, starting fresh");
            GraphState::new(condition_id.to_string())
        }
    };

    macro_rules! checkpoint {
        ($node:expr) => {
            if let Err(e) = ctx.checkpoint_store.put(thread_id, $node, &state).await {
                tracing::warn!(node = $node, error = %e, "failed to persist checkpoint");
            }
        };
    }

    if state.mbd.is_none() && state.ingestion_error.is_none() {
        let update = ingestion::ingest(condition_id, ctx.market_data.as_ref()).await;
        state.apply(update);
        checkpoint!("market_ingestion");
    }

    let Some(mbd) = state.mbd.clone() else {
        return state;
    };

    if state.active_agents.is_empty() {
        let availability = DataAvailability {
            news: ctx.probe_available(ExternalDataSource::News),
            polling: ctx.probe_available(ExternalDataSource::Polling),
            social: ctx.probe_available(ExternalDataSource::Social),
        };
        let (active, audit) = select_agents(&mbd, &availability, &ctx.config, &ctx.disabled_agent_groups);
        let mut update = GraphStateUpdate::audit(
            "agent_selection",
            serde_json::json!({ "active_agents": active.iter().map(|k| k.name()).collect::<Vec<_>>() }),
        );
        update.active_agents = Some(active.iter().map(|k| k.name().to_string()).collect());
        update.agent_selection_audit = audit;
        state.apply(update);
        checkpoint!("agent_selection");
    }

    let active_kinds: Vec<AgentKind> = state
        .active_agents
        .iter()
        .filter_map(|name| agents::kind_by_name(name))
        .collect();

    if state.external_data.is_none() {
        let update = external_data::fetch_external_data(&mbd, &active_kinds, ctx).await;
        state.apply(update);
        checkpoint!("external_data_fetch");
    }

    if state.agent_signals.is_empty() && state.agent_errors.is_empty() {
        let external = state.external_data.clone().unwrap_or_default();
        let node_timeout = Duration::from_secs(ctx.config.node_timeout_secs);
        let update = agents::run_agents(&active_kinds, &mbd, &external, node_timeout).await;
        state.apply(update);
        checkpoint!("agent_fan_out");
    }

    if state.fused_signal.is_none() {
        match fuse_signals(&state.agent_signals, &mbd, &ctx.config) {
            Ok(fused) => {
                let mut update = GraphStateUpdate::audit(
                    "signal_fusion",
                    serde_json::json!({ "fair_probability": fused.fair_probability }),
                );
                update.fused_signal = Some(fused);
                state.apply(update);
            }
            Err(e) => {
                tracing::warn!(error = %e, "signal fusion could not produce a fused signal");
                state.apply(GraphStateUpdate::audit(
                    "signal_fusion",
                    serde_json::json!({ "error": e.to_string() }),
                ));
                checkpoint!("signal_fusion");
                return state;
            }
        }
        checkpoint!("signal_fusion");
    }

    let Some(fused) = state.fused_signal.clone() else {
        return state;
    };

    if state.bull_thesis.is_none() || state.bear_thesis.is_none() {
        let (bull, bear) = construct_theses(&fused, &state.agent_signals, &mbd);
        let mut update = GraphStateUpdate::audit("thesis_construction", serde_json::Value::Null);
        update.bull_thesis = Some(bull);
        update.bear_thesis = Some(bear);
        state.apply(update);
        checkpoint!("thesis_construction");
    }

    let (Some(bull), Some(bear)) = (state.bull_thesis.clone(), state.bear_thesis.clone()) else {
        return state;
    };

    if state.debate_record.is_none() {
        let debate = run_cross_examination(&bull, &bear, &state.agent_signals, &mbd, &fused);
        let mut update = GraphStateUpdate::audit("cross_examination", serde_json::Value::Null);
        update.debate_record = Some(debate);
        state.apply(update);
        checkpoint!("cross_examination");
    }

    let Some(debate) = state.debate_record.clone() else {
        return state;
    };

    if state.consensus.is_none() && state.consensus_error.is_none() {
        match build_consensus(&state.agent_signals, &fused, &bull, &bear, &debate, &ctx.config) {
            Ok(consensus) => {
                let mut update = GraphStateUpdate::audit(
                    "consensus",
                    serde_json::json!({ "consensus_probability": consensus.consensus_probability }),
                );
                update.consensus = Some(consensus);
                state.apply(update);
            }
            Err(e) => {
                let mut update = GraphStateUpdate::audit(
                    "consensus",
                    serde_json::json!({ "error": consensus_error_message(&e) }),
                );
                update.consensus_error = Some(e);
                state.apply(update);
            }
        }
        checkpoint!("consensus");
    }

    if state.consensus_error.is_some() {
        return state;
    }

    let Some(consensus) = state.consensus.clone() else {
        return state;
    };

    if state.risk_philosophy_signals.is_empty() {
        let philosophies: Vec<&dyn RiskPhilosophyAgent> =
            vec![&AggressivePhilosophy, &ConservativePhilosophy, &NeutralPhilosophy];
        let signals = philosophies.iter().map(|p| p.assess(&consensus)).collect::<Vec<_>>();
        let mut update = GraphStateUpdate::audit("risk_philosophy", serde_json::Value::Null);
        update.risk_philosophy_signals = signals;
        state.apply(update);
        checkpoint!("risk_philosophy");
    }

    if state.recommendation.is_none() {
        let mut recommendation = build_recommendation(&consensus, &bull, &bear, &debate, &mbd, &ctx.config);
        narrative::enrich_explanation(&mut recommendation.explanation, &ctx.llm_registry).await;
        let mut update = GraphStateUpdate::audit(
            "recommendation",
            serde_json::json!({ "action": format!("{:?}", recommendation.action) }),
        );
        update.recommendation = Some(recommendation);
        state.apply(update);
        checkpoint!("recommendation");
    }

    if state.agent_performance.is_empty() {
        let performance = performance::record_performance(&state.agent_signals, &consensus);
        let mut update = GraphStateUpdate::audit("agent_performance", serde_json::Value::Null);
        update.agent_performance = performance;
        state.apply(update);
        checkpoint!("agent_performance");
    }

    state
}

fn consensus_error_message(e: &ConsensusError) -> String {
    match e {
        ConsensusError::InsufficientData(msg) | ConsensusError::ConsensusFailed(msg) => msg.clone(),
    }
}

// See `tests/graph_scenarios.rs` for the six literal scenarios and the
// checkpoint-resumption case, exercised as integration tests against this
// module's public API.
