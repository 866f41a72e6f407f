use crate::error::EngineError;

/// Provider selection mode for the LLM layer: query one configured provider,
/// or query several and let Signal Fusion reconcile their reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderMode {
    Single,
    Multi,
}

impl ProviderMode {
    fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "multi" => ProviderMode::Multi,
            _ => ProviderMode::Single,
        }
    }
}

/// Engine-wide typed configuration, loaded from the environment the way
/// `ml-client::MLConfig` loads its provider settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Pairwise fair-probability gap at or above which two signals are
    /// recorded as conflicting during fusion.
    pub conflict_threshold: f64,
    /// Maximum boost to fused confidence when signal_alignment is high.
    pub alignment_bonus: f64,
    /// Minimum number of agent signals Signal Fusion requires before it will
    /// produce a fused signal instead of INSUFFICIENT_DATA.
    pub min_agents_required: usize,
    /// disagreement_index above which the confidence band widens beyond its
    /// base width. Distinct from `consensus_fail_threshold` below.
    pub high_disagreement_threshold: f64,
    /// disagreement_index above which consensus aborts with CONSENSUS_FAILED.
    /// Hardcoded at 0.30 in the design notes; kept overridable for tests but
    /// never collapsed into `high_disagreement_threshold`.
    pub consensus_fail_threshold: f64,
    /// Base confidence-band half-width before disagreement widening.
    pub base_confidence_band_width: f64,
    /// Minimum edge, in probability points, below which a market is flagged
    /// efficiently priced and recommendations default toward NO_TRADE.
    pub min_edge_threshold: f64,
    /// Cache freshness window for external data, in seconds.
    pub cache_ttl_secs: u64,
    /// Sliding-window rate limit: max calls per source per window.
    pub rate_limit_max_calls: u32,
    pub rate_limit_window_secs: u64,
    /// Consecutive failures before a source's circuit breaker opens.
    pub circuit_breaker_failure_threshold: u32,
    /// Cooldown before an open circuit tries a half-open probe.
    pub circuit_breaker_reset_secs: u64,
    pub provider_mode: ProviderMode,
    /// Per-node timeout; exceeding it surfaces as AgentErrorKind::Timeout.
    pub node_timeout_secs: u64,
    pub checkpoint_database_url: String,
    /// Minimum `volume_24h` below which `price_action` is dropped during
    /// Dynamic Agent Selection's data-availability filter.
    pub min_volume_threshold: f64,
    /// Budget ceiling for Dynamic Agent Selection's cost filter. MVP agents
    /// are admitted and subtracted first; candidates are then admitted
    /// impact-descending until this is exhausted.
    pub max_cost_per_analysis: f64,
}

impl EngineConfig {
    /// Load configuration from the process environment (via `.env` through
    /// `dotenvy` if present), falling back to production-sane defaults for
    /// anything unset.
    pub fn from_env() -> Result<Self, EngineError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            conflict_threshold: env_f64("MIE_CONFLICT_THRESHOLD", 0.20)?,
            alignment_bonus: env_f64("MIE_ALIGNMENT_BONUS", 0.20)?,
            min_agents_required: env_u32("MIE_MIN_AGENTS_REQUIRED", 2)? as usize,
            high_disagreement_threshold: env_f64("MIE_HIGH_DISAGREEMENT_THRESHOLD", 0.15)?,
            consensus_fail_threshold: env_f64("MIE_CONSENSUS_FAIL_THRESHOLD", 0.30)?,
            base_confidence_band_width: env_f64("MIE_BASE_CONFIDENCE_BAND_WIDTH", 0.05)?,
            min_edge_threshold: env_f64("MIE_MIN_EDGE_THRESHOLD", 0.03)?,
            cache_ttl_secs: env_u64("MIE_CACHE_TTL_SECS", 300)?,
            rate_limit_max_calls: env_u32("MIE_RATE_LIMIT_MAX_CALLS", 30)?,
            rate_limit_window_secs: env_u64("MIE_RATE_LIMIT_WINDOW_SECS", 60)?,
            circuit_breaker_failure_threshold: env_u32("MIE_CIRCUIT_BREAKER_FAILURE_THRESHOLD", 5)?,
            circuit_breaker_reset_secs: env_u64("MIE_CIRCUIT_BREAKER_RESET_SECS", 30)?,
            provider_mode: ProviderMode::parse(
                &std::env::var("MIE_PROVIDER_MODE").unwrap_or_else(|_| "single".to_string()),
            ),
            node_timeout_secs: env_u64("MIE_NODE_TIMEOUT_SECS", 20)?,
            checkpoint_database_url: std::env::var("MIE_CHECKPOINT_DATABASE_URL")
                .unwrap_or_else(|_| "sqlite://market-intel-engine.db".to_string()),
            min_volume_threshold: env_f64("MIE_MIN_VOLUME_THRESHOLD", 5_000.0)?,
            max_cost_per_analysis: env_f64("MIE_MAX_COST_PER_ANALYSIS", 1.0)?,
        })
    }
}

fn env_f64(key: &str, default: f64) -> Result<f64, EngineError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<f64>()
            .map_err(|e| EngineError::ConfigError(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn env_u64(key: &str, default: u64) -> Result<u64, EngineError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u64>()
            .map_err(|e| EngineError::ConfigError(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}

fn env_u32(key: &str, default: u32) -> Result<u32, EngineError> {
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<u32>()
            .map_err(|e| EngineError::ConfigError(format!("{key}: {e}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_keep_the_two_disagreement_knobs_distinct() {
        let cfg = EngineConfig {
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
        };
        assert!(cfg.high_disagreement_threshold < cfg.consensus_fail_threshold);
    }
}
