use thiserror::Error;

/// Top-level failure taxonomy for the engine. One variant per failure
/// category named in the error handling design; no swallowed causes.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("ingestion failed: {0}")]
    IngestionFailed(String),

    #[error("agent '{agent_name}' execution failed: {underlying}")]
    ExecutionFailed {
        agent_name: String,
        underlying: String,
    },

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("consensus failed: {0}")]
    ConsensusFailed(String),

    #[error("provider error: {0}")]
    ProviderError(String),

    #[error("invalid data: {0}")]
    InvalidData(String),

    #[error("checkpoint store error: {0}")]
    CheckpointError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl EngineError {
    /// Whether retrying the node that produced this error is ever useful.
    /// Mirrors the retryable/non-retryable split used by the LLM provider
    /// error taxonomy.
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::ProviderError(_) | EngineError::CheckpointError(_))
    }
}
