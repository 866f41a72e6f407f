//! Market Ingestion: turns a `RawMarket` read into a `MarketBriefingDocument`
//! by deriving liquidity, volatility regime, ambiguity flags, and event type
//! with small pure functions, in the spirit of the teacher's
//! `detect_market_regime` (a pure function over recent-vs-full volatility
//! computed once during analysis setup, independently testable from the
//! network call that feeds it).

use chrono::Utc;
use market_intel_core::{
    Catalyst, EventType, GraphStateUpdate, MarketBriefingDocument, MarketDataProvider,
    MarketMetadata, VolatilityRegime,
};
use market_stats::population_std_dev;

const HEDGE_WORDS: [&str; 6] = [
    "ambiguous",
    "unclear",
    "subjective",
    "at the discretion",
    "tbd",
    "to be determined",
];

fn derive_liquidity_score(order_book_depth: f64, bid_ask_spread: f64) -> f64 {
    let depth_component = (order_book_depth / 1_000.0).clamp(0.0, 10.0);
    let spread_penalty = (bid_ask_spread * 20.0).min(5.0);
    (depth_component - spread_penalty).clamp(0.0, 10.0)
}

fn derive_volatility_regime(recent_prices: &[f64]) -> VolatilityRegime {
    if recent_prices.len() < 2 {
        return VolatilityRegime::Medium;
    }
    let stddev = population_std_dev(recent_prices);
    if stddev < 0.03 {
        VolatilityRegime::Low
    } else if stddev < 0.08 {
        VolatilityRegime::Medium
    } else {
        VolatilityRegime::High
    }
}

fn derive_ambiguity_flags(resolution_criteria: &str) -> Vec<String> {
    let lower = resolution_criteria.to_lowercase();
    let mut flags: Vec<String> = HEDGE_WORDS
        .iter()
        .filter(|word| lower.contains(*word))
        .map(|word| format!("resolution criteria contains hedge language: '{word}'"))
        .collect();
    if resolution_criteria.trim().len() < 20 {
        flags.push("resolution criteria is unusually short".to_string());
    }
    flags
}

fn parse_event_type(hint: Option<&str>) -> EventType {
    let Some(hint) = hint else {
        return EventType::Other;
    };
    let lower = hint.to_lowercase();
    if lower.contains("elect") || lower.contains("president") || lower.contains("senate") || lower.contains("governor") {
        EventType::Election
    } else if lower.contains("court") || lower.contains("ruling") || lower.contains("scotus") || lower.contains("legal") {
        EventType::Court
    } else if lower.contains("polic") || lower.contains("regulat") || lower.contains("legislat") {
        EventType::Policy
    } else if lower.contains("geopolit") || lower.contains("war") || lower.contains("conflict") || lower.contains("treaty") {
        EventType::Geopolitical
    } else if lower.contains("econom") || lower.contains("fed") || lower.contains("inflation") || lower.contains("gdp") {
        EventType::Economic
    } else {
        EventType::Other
    }
}

fn build_mbd(raw: market_intel_core::RawMarket) -> MarketBriefingDocument {
    let bid_ask_spread = (raw.best_ask - raw.best_bid).abs();
    let liquidity_score = derive_liquidity_score(raw.order_book_depth, bid_ask_spread);
    let volatility_regime = derive_volatility_regime(&raw.recent_prices);
    let ambiguity_flags = derive_ambiguity_flags(&raw.resolution_criteria);

    MarketBriefingDocument {
        market_id: raw.market_id,
        condition_id: raw.condition_id,
        event_type: parse_event_type(raw.event_type_hint.as_deref()),
        question: raw.question,
        resolution_criteria: raw.resolution_criteria,
        expiry_timestamp: raw.expiry_timestamp,
        current_probability: raw.current_probability,
        liquidity_score,
        bid_ask_spread,
        volatility_regime,
        volume_24h: raw.volume_24h,
        metadata: MarketMetadata {
            ambiguity_flags,
            key_catalysts: Vec::<Catalyst>::new(),
        },
    }
}

/// Runs Market Ingestion for one thread. A `MarketDataProvider` failure or a
/// validation failure both surface as `ingestion_error` rather than a panic;
/// the graph stops cleanly at that node.
pub async fn ingest(condition_id: &str, provider: &dyn MarketDataProvider) -> GraphStateUpdate {
    let raw = match provider.get_market(condition_id).await {
        Ok(raw) => raw,
        Err(e) => {
            let mut update = GraphStateUpdate::audit("market_ingestion", serde_json::json!({ "error": e.to_string() }));
            update.ingestion_error = Some(e.to_string());
            return update;
        }
    };

    let mbd = build_mbd(raw);
    match mbd.validate(Utc::now()) {
        Ok(()) => {
            let mut update = GraphStateUpdate::audit(
                "market_ingestion",
                serde_json::json!({
                    "liquidity_score": mbd.liquidity_score,
                    "volatility_regime": format!("{:?}", mbd.volatility_regime),
                    "ambiguity_flags": mbd.metadata.ambiguity_flags,
                }),
            );
            update.mbd = Some(mbd);
            update
        }
        Err(e) => {
            let mut update = GraphStateUpdate::audit("market_ingestion", serde_json::json!({ "error": e.to_string() }));
            update.ingestion_error = Some(e.to_string());
            update
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_spread_penalizes_liquidity_score() {
        let tight = derive_liquidity_score(5_000.0, 0.01);
        let wide = derive_liquidity_score(5_000.0, 0.25);
        assert!(wide < tight);
    }

    #[test]
    fn stable_recent_prices_read_as_low_volatility() {
        let prices = vec![0.50, 0.505, 0.498, 0.502];
        assert!(matches!(derive_volatility_regime(&prices), VolatilityRegime::Low));
    }

    #[test]
    fn short_resolution_criteria_is_flagged() {
        let flags = derive_ambiguity_flags("Resolves YES if X");
        assert!(flags.iter().any(|f| f.contains("unusually short")));
    }

    #[test]
    fn hedge_language_is_flagged() {
        let flags = derive_ambiguity_flags(
            "Resolves at the discretion of the moderators based on an ambiguous standard of proof",
        );
        assert!(flags.iter().any(|f| f.contains("hedge language")));
    }

    #[test]
    fn event_type_hint_maps_election_keywords() {
        assert!(matches!(parse_event_type(Some("2028 presidential election")), EventType::Election));
        assert!(matches!(parse_event_type(None), EventType::Other));
    }
}
