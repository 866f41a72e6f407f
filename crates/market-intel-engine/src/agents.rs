//! Specialist agent fan-out: builds the concrete agent set for one
//! analysis's `active_agents` and runs it concurrently, folding per-agent
//! timeouts and failures into `agent_errors` without ever failing the node.
//! Grounded in the teacher's `tokio::join!` fan-out in
//! `AnalysisOrchestrator::analyze`, generalized from a fixed 7-way join to a
//! dynamically sized task set via `tokio::spawn` + join handles.

use std::sync::Arc;
use std::time::{Duration, Instant};

use market_intel_core::{
    AgentError, AgentErrorKind, AgentKind, AuditLogEntry, ExternalDataBundle, GraphStateUpdate,
    MarketBriefingDocument, SpecialistAgent,
};

pub fn specialist_for(kind: AgentKind) -> Option<Arc<dyn SpecialistAgent>> {
    match kind {
        AgentKind::MarketMicrostructure => Some(Arc::new(microstructure_agents::MarketMicrostructureAgent)),
        AgentKind::Momentum => Some(Arc::new(microstructure_agents::MomentumAgent)),
        AgentKind::MeanReversion => Some(Arc::new(microstructure_agents::MeanReversionAgent)),
        AgentKind::PriceAction => Some(Arc::new(microstructure_agents::PriceActionAgent)),
        AgentKind::ProbabilityBaseline => Some(Arc::new(baseline_agents::ProbabilityBaselineAgent)),
        AgentKind::RiskAssessment => Some(Arc::new(baseline_agents::RiskAssessmentAgent)),
        AgentKind::HistoricalPattern => Some(Arc::new(baseline_agents::HistoricalPatternAgent)),
        AgentKind::TailRisk => Some(Arc::new(baseline_agents::TailRiskAgent)),
        AgentKind::Catalyst => Some(Arc::new(baseline_agents::CatalystAgent)),
        AgentKind::MediaSentiment => Some(Arc::new(narrative_agents::MediaSentimentAgent)),
        AgentKind::SocialSentiment => Some(Arc::new(narrative_agents::SocialSentimentAgent)),
        AgentKind::NarrativeVelocity => Some(Arc::new(narrative_agents::NarrativeVelocityAgent)),
        AgentKind::BreakingNews => Some(Arc::new(narrative_agents::BreakingNewsAgent)),
        AgentKind::EventImpact => Some(Arc::new(narrative_agents::EventImpactAgent)),
        AgentKind::PollingIntelligence => Some(Arc::new(narrative_agents::PollingIntelligenceAgent)),
        AgentKind::Aggressive | AgentKind::Conservative | AgentKind::Neutral => None,
    }
}

/// Inverse of `AgentKind::name()`, used to turn the persisted
/// `active_agents: Vec<String>` back into dispatchable kinds on resume.
pub fn kind_by_name(name: &str) -> Option<AgentKind> {
    const ALL: [AgentKind; 18] = [
        AgentKind::MarketMicrostructure,
        AgentKind::Momentum,
        AgentKind::MeanReversion,
        AgentKind::PriceAction,
        AgentKind::ProbabilityBaseline,
        AgentKind::RiskAssessment,
        AgentKind::HistoricalPattern,
        AgentKind::TailRisk,
        AgentKind::Catalyst,
        AgentKind::MediaSentiment,
        AgentKind::SocialSentiment,
        AgentKind::NarrativeVelocity,
        AgentKind::BreakingNews,
        AgentKind::EventImpact,
        AgentKind::PollingIntelligence,
        AgentKind::Aggressive,
        AgentKind::Conservative,
        AgentKind::Neutral,
    ];
    ALL.iter().copied().find(|k| k.name() == name)
}

/// Runs every active, non-demoted agent concurrently and folds the results
/// into a single `GraphStateUpdate`. A panicking agent task is logged and
/// simply contributes no signal, rather than failing the whole fan-out.
pub async fn run_agents(
    active_agents: &[AgentKind],
    mbd: &MarketBriefingDocument,
    external: &ExternalDataBundle,
    node_timeout: Duration,
) -> GraphStateUpdate {
    let mut tasks = Vec::new();
    for kind in active_agents.iter().copied() {
        if external.demoted_agents.iter().any(|d| d == kind.name()) {
            continue;
        }
        let Some(agent) = specialist_for(kind) else { continue };
        let mbd = mbd.clone();
        let external = external.clone();
        tasks.push(tokio::spawn(async move {
            let started = Instant::now();
            let outcome = tokio::time::timeout(node_timeout, agent.analyze(&mbd, &external)).await;
            (kind, started.elapsed(), outcome)
        }));
    }

    let mut update = GraphStateUpdate::default();
    let mut audit_entries = Vec::new();

    for task in tasks {
        match task.await {
            Ok((kind, elapsed, Ok(Ok(signal)))) => match signal.validate() {
                Ok(()) => {
                    audit_entries.push(serde_json::json!({
                        "agent": kind.name(), "success": true, "elapsed_ms": elapsed.as_millis(),
                    }));
                    update.agent_signals.push(signal);
                }
                Err(e) => {
                    audit_entries.push(serde_json::json!({ "agent": kind.name(), "success": false }));
                    update.agent_errors.push(AgentError {
                        agent_name: kind.name().to_string(),
                        kind: AgentErrorKind::Validation,
                        message: e.to_string(),
                    });
                }
            },
            Ok((kind, _elapsed, Ok(Err(agent_error)))) => {
                audit_entries.push(serde_json::json!({ "agent": kind.name(), "success": false }));
                update.agent_errors.push(agent_error);
            }
            Ok((kind, _elapsed, Err(_timeout))) => {
                audit_entries.push(serde_json::json!({ "agent": kind.name(), "success": false }));
                update.agent_errors.push(AgentError {
                    agent_name: kind.name().to_string(),
                    kind: AgentErrorKind::Timeout,
                    message: "agent exceeded the node timeout".to_string(),
                });
            }
            Err(join_error) => {
                tracing::error!(%join_error, "specialist agent task panicked");
            }
        }
    }

    update.audit_log.push(AuditLogEntry {
        stage: "agent_fan_out".to_string(),
        timestamp: chrono::Utc::now(),
        data: serde_json::Value::Array(audit_entries),
    });

    update
}

// See `tests/graph_scenarios.rs`'s sibling coverage for the partial-failure
// fan-out scenario (moved there alongside the rest of spec.md §8's literal
// scenarios); this module keeps only the genuinely unit-level test below.
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_by_name_round_trips_every_agent_kind_name() {
        for kind in [
            AgentKind::MarketMicrostructure,
            AgentKind::ProbabilityBaseline,
            AgentKind::PollingIntelligence,
            AgentKind::Aggressive,
        ] {
            assert_eq!(kind_by_name(kind.name()), Some(kind));
        }
        assert_eq!(kind_by_name("not_a_real_agent"), None);
    }
}
