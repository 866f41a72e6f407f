//! Dynamic Agent Selection: five ordered rules (MVP floor, market-type
//! candidate groups, configuration filter, data-availability filter, cost
//! filter) decide which specialist agents run for one analysis, with every
//! admission or rejection recorded in `agent_selection_audit`.

use market_intel_core::{
    AgentKind, AgentSelectionDecision, EngineConfig, EventType, MarketBriefingDocument,
    SelectionOutcome,
};

const MVP: [AgentKind; 3] = [
    AgentKind::MarketMicrostructure,
    AgentKind::ProbabilityBaseline,
    AgentKind::RiskAssessment,
];

/// Whether news/polling/social collaborators are configured, probed cheaply
/// before the real fetch runs. Built by the caller from `EngineContext`.
pub struct DataAvailability {
    pub news: bool,
    pub polling: bool,
    pub social: bool,
}

fn group(name: &str) -> &'static [AgentKind] {
    match name {
        "polling_statistical" => &[AgentKind::PollingIntelligence, AgentKind::HistoricalPattern],
        "sentiment_narrative" => &[
            AgentKind::MediaSentiment,
            AgentKind::SocialSentiment,
            AgentKind::NarrativeVelocity,
        ],
        "event_intelligence" => &[AgentKind::BreakingNews, AgentKind::EventImpact],
        "event_scenario" => &[AgentKind::Catalyst, AgentKind::TailRisk],
        "price_action" => &[AgentKind::Momentum, AgentKind::MeanReversion, AgentKind::PriceAction],
        _ => &[],
    }
}

/// Candidate groups by market type. `price_action` is appended for every
/// event type since its own data-availability filter (rule 4, keyed on
/// `volume_24h`) already gates it independent of market type.
fn candidate_groups(event_type: EventType) -> &'static [&'static str] {
    match event_type {
        EventType::Election => &["polling_statistical", "sentiment_narrative", "event_intelligence", "price_action"],
        EventType::Court => &["event_intelligence", "polling_statistical", "price_action"],
        EventType::Policy | EventType::Geopolitical => {
            &["event_intelligence", "sentiment_narrative", "event_scenario", "price_action"]
        }
        EventType::Economic => &["event_intelligence", "polling_statistical", "price_action"],
        EventType::Other => &[
            "polling_statistical",
            "sentiment_narrative",
            "event_intelligence",
            "event_scenario",
            "price_action",
        ],
    }
}

/// Ranking used for the cost filter's impact-descending admission order.
fn agent_impact(kind: AgentKind) -> f64 {
    match kind {
        AgentKind::PollingIntelligence => 1.3,
        AgentKind::BreakingNews | AgentKind::EventImpact => 1.15,
        AgentKind::HistoricalPattern => 1.1,
        AgentKind::MediaSentiment | AgentKind::SocialSentiment => 1.05,
        AgentKind::NarrativeVelocity => 1.0,
        AgentKind::Catalyst | AgentKind::TailRisk => 0.95,
        AgentKind::Momentum | AgentKind::MeanReversion | AgentKind::PriceAction => 0.9,
        _ => 1.0,
    }
}

const AGENT_COST: f64 = 0.10;

pub fn select_agents(
    mbd: &MarketBriefingDocument,
    availability: &DataAvailability,
    config: &EngineConfig,
    disabled_groups: &[String],
) -> (Vec<AgentKind>, Vec<AgentSelectionDecision>) {
    let mut audit = Vec::new();
    let mut active: Vec<AgentKind> = Vec::new();

    for kind in MVP {
        active.push(kind);
        audit.push(AgentSelectionDecision {
            agent_name: kind.name().to_string(),
            outcome: SelectionOutcome::Admitted,
        });
    }

    let mut candidates: Vec<AgentKind> = Vec::new();
    for group_name in candidate_groups(mbd.event_type) {
        if disabled_groups.iter().any(|g| g == group_name) {
            for kind in group(group_name) {
                audit.push(AgentSelectionDecision {
                    agent_name: kind.name().to_string(),
                    outcome: SelectionOutcome::ConfigDisabled,
                });
            }
            continue;
        }
        for kind in group(group_name) {
            if !candidates.contains(kind) {
                candidates.push(*kind);
            }
        }
    }

    let mut data_filtered = Vec::new();
    for kind in candidates {
        let available = match kind {
            AgentKind::BreakingNews | AgentKind::EventImpact => availability.news,
            AgentKind::PollingIntelligence => availability.polling,
            AgentKind::MediaSentiment | AgentKind::SocialSentiment | AgentKind::NarrativeVelocity => {
                availability.news || availability.social
            }
            AgentKind::Momentum | AgentKind::MeanReversion | AgentKind::PriceAction => {
                mbd.volume_24h >= config.min_volume_threshold
            }
            _ => true,
        };
        if available {
            data_filtered.push(kind);
        } else {
            audit.push(AgentSelectionDecision {
                agent_name: kind.name().to_string(),
                outcome: SelectionOutcome::DataUnavailable,
            });
        }
    }

    data_filtered.sort_by(|a, b| agent_impact(*b).partial_cmp(&agent_impact(*a)).unwrap());
    let mut spent = MVP.len() as f64 * AGENT_COST;
    for kind in data_filtered {
        if spent + AGENT_COST <= config.max_cost_per_analysis {
            spent += AGENT_COST;
            active.push(kind);
            audit.push(AgentSelectionDecision {
                agent_name: kind.name().to_string(),
                outcome: SelectionOutcome::Admitted,
            });
        } else {
            audit.push(AgentSelectionDecision {
                agent_name: kind.name().to_string(),
                outcome: SelectionOutcome::CostCut,
            });
        }
    }

    (active, audit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use market_intel_core::{MarketMetadata, ProviderMode, VolatilityRegime};

    fn sample_mbd(event_type: EventType, volume_24h: f64) -> MarketBriefingDocument {
        MarketBriefingDocument {
            market_id: "m1".into(),
            condition_id: "c1".into(),
            event_type,
            question: "Will X happen?".into(),
            resolution_criteria: "Resolves YES if X".into(),
            expiry_timestamp: Utc::now() + chrono::Duration::days(10),
            current_probability: 0.5,
            liquidity_score: 5.0,
            bid_ask_spread: 0.02,
            volatility_regime: VolatilityRegime::Medium,
            volume_24h,
            metadata: MarketMetadata::default(),
        }
    }

    fn generous_config() -> EngineConfig {
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
            max_cost_per_analysis: 5.0,
        }
    }

    #[test]
    fn mvp_agents_are_always_admitted() {
        let mbd = sample_mbd(EventType::Election, 10_000.0);
        let availability = DataAvailability { news: false, polling: false, social: false };
        let config = generous_config();
        let (active, _) = select_agents(&mbd, &availability, &config, &[]);
        for kind in MVP {
            assert!(active.contains(&kind));
        }
    }

    #[test]
    fn price_action_dropped_below_volume_threshold() {
        let mbd = sample_mbd(EventType::Election, 1_000.0);
        let availability = DataAvailability { news: true, polling: true, social: true };
        let config = generous_config();
        let (active, audit) = select_agents(&mbd, &availability, &config, &[]);
        assert!(!active.contains(&AgentKind::Momentum));
        assert!(audit
            .iter()
            .any(|d| d.agent_name == "momentum" && matches!(d.outcome, SelectionOutcome::DataUnavailable)));
    }

    #[test]
    fn tight_cost_budget_cuts_non_mvp_candidates() {
        let mbd = sample_mbd(EventType::Election, 10_000.0);
        let availability = DataAvailability { news: true, polling: true, social: true };
        let mut config = generous_config();
        config.max_cost_per_analysis = 0.30;
        let (active, audit) = select_agents(&mbd, &availability, &config, &[]);
        assert_eq!(active.len(), MVP.len());
        assert!(audit.iter().any(|d| matches!(d.outcome, SelectionOutcome::CostCut)));
    }

    #[test]
    fn disabled_group_is_excluded_and_audited() {
        let mbd = sample_mbd(EventType::Election, 10_000.0);
        let availability = DataAvailability { news: true, polling: true, social: true };
        let config = generous_config();
        let disabled = vec!["sentiment_narrative".to_string()];
        let (active, audit) = select_agents(&mbd, &availability, &config, &disabled);
        assert!(!active.contains(&AgentKind::MediaSentiment));
        assert!(audit
            .iter()
            .any(|d| d.agent_name == "media_sentiment" && matches!(d.outcome, SelectionOutcome::ConfigDisabled)));
    }
}
