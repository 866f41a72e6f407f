use std::time::Duration;

/// Configuration for the four configurable LLM backends (named A-D in the
/// design notes rather than by vendor, since the workspace treats them as
/// interchangeable structured-output providers).
#[derive(Debug, Clone)]
pub struct LlmClientConfig {
    pub provider_a_url: String,
    pub provider_b_url: String,
    pub provider_c_url: String,
    pub provider_d_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for LlmClientConfig {
    fn default() -> Self {
        Self {
            provider_a_url: std::env::var("MIE_LLM_PROVIDER_A_URL")
                .unwrap_or_else(|_| "http://localhost:9101".to_string()),
            provider_b_url: std::env::var("MIE_LLM_PROVIDER_B_URL")
                .unwrap_or_else(|_| "http://localhost:9102".to_string()),
            provider_c_url: std::env::var("MIE_LLM_PROVIDER_C_URL")
                .unwrap_or_else(|_| "http://localhost:9103".to_string()),
            provider_d_url: std::env::var("MIE_LLM_PROVIDER_D_URL")
                .unwrap_or_else(|_| "http://localhost:9104".to_string()),
            api_key: std::env::var("MIE_LLM_API_KEY").ok(),
            timeout: Duration::from_secs(
                std::env::var("MIE_LLM_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(20),
            ),
        }
    }
}
