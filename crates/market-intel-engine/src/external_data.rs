//! External Data Fetch: scoped acquisition of news / polling / social
//! snapshots, gated per source by a circuit breaker and a sliding-window
//! rate limiter and read cache-first. Grounded in the teacher's
//! `CacheEntry<T>`/`CACHE_TTL_SECS` pattern, generalized from one cache per
//! analyzer to one per external source. A failure on a source that some
//! selected agent requires demotes that agent to skipped rather than
//! failing the whole analysis.

use std::time::Duration;

use market_intel_core::{
    AgentKind, ExternalDataBundle, ExternalDataParams, ExternalDataResponse, ExternalDataSource,
    GraphStateUpdate, MarketBriefingDocument,
};

use crate::context::EngineContext;

fn requires_news(kind: AgentKind) -> bool {
    matches!(kind, AgentKind::BreakingNews | AgentKind::EventImpact)
}

fn requires_polling(kind: AgentKind) -> bool {
    matches!(kind, AgentKind::PollingIntelligence)
}

fn requires_news_or_social(kind: AgentKind) -> bool {
    matches!(
        kind,
        AgentKind::MediaSentiment | AgentKind::SocialSentiment | AgentKind::NarrativeVelocity
    )
}

async fn fetch_source(
    ctx: &EngineContext,
    source: ExternalDataSource,
    query: &str,
) -> Option<ExternalDataResponse> {
    let (provider, breaker, limiter) = ctx.external_collaborator(source)?;

    if matches!(breaker.check().await, market_data_client::BreakerDecision::Reject) {
        tracing::warn!(?source, "circuit open, skipping external fetch");
        return None;
    }

    if let Some(cached) = ctx.cached_external(source, query) {
        return Some(cached);
    }

    limiter.acquire().await;
    let params = ExternalDataParams { query: query.to_string(), limit: 20 };
    let outcome = tokio::time::timeout(
        Duration::from_secs(ctx.config.node_timeout_secs),
        provider.fetch(&params),
    )
    .await;

    match outcome {
        Ok(Ok(response)) => {
            breaker.record_success().await;
            ctx.cache_external(source, query, response.clone());
            Some(response)
        }
        Ok(Err(e)) => {
            tracing::warn!(?source, error = %e, "external fetch failed");
            breaker.record_failure().await;
            None
        }
        Err(_) => {
            tracing::warn!(?source, "external fetch timed out");
            breaker.record_failure().await;
            None
        }
    }
}

/// Fetches only the sources the active agent set actually needs, then
/// demotes any active agent whose required feed came back empty.
pub async fn fetch_external_data(
    mbd: &MarketBriefingDocument,
    active_agents: &[AgentKind],
    ctx: &EngineContext,
) -> GraphStateUpdate {
    let needs_news = active_agents.iter().any(|k| requires_news(*k) || requires_news_or_social(*k));
    let needs_polling = active_agents.iter().any(|k| requires_polling(*k));
    let needs_social = active_agents.iter().any(|k| requires_news_or_social(*k));

    let news = if needs_news {
        fetch_source(ctx, ExternalDataSource::News, &mbd.question).await
    } else {
        None
    };
    let polling = if needs_polling {
        fetch_source(ctx, ExternalDataSource::Polling, &mbd.question).await
    } else {
        None
    };
    let social = if needs_social {
        fetch_source(ctx, ExternalDataSource::Social, &mbd.question).await
    } else {
        None
    };

    let mut demoted = Vec::new();
    for kind in active_agents {
        let demote = (requires_news(*kind) && news.is_none())
            || (requires_polling(*kind) && polling.is_none())
            || (requires_news_or_social(*kind) && news.is_none() && social.is_none());
        if demote {
            demoted.push(kind.name().to_string());
        }
    }

    let bundle = ExternalDataBundle { news, polling, social, demoted_agents: demoted.clone() };

    let mut update = GraphStateUpdate::audit(
        "external_data_fetch",
        serde_json::json!({ "demoted_agents": demoted }),
    );
    update.external_data = Some(bundle);
    update
}
