use async_trait::async_trait;
use market_intel_core::{LlmError, LlmErrorKind, LlmProvider};
use serde_json::json;
use std::time::Duration;

/// HTTP-backed structured-output provider. Posts `{prompt, schema_name}` and
/// expects a JSON body already conforming to `schema_name`; the caller
/// (specialist agents) is responsible for field-level validation.
pub struct HttpLlmProvider {
    client: reqwest::Client,
    base_url: String,
    name: &'static str,
    api_key: Option<String>,
}

impl HttpLlmProvider {
    pub fn new(name: &'static str, base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .pool_max_idle_per_host(20)
            .build()
            .expect("failed to build llm-client http client");
        Self {
            client,
            base_url,
            name,
            api_key,
        }
    }
}

#[async_trait]
impl LlmProvider for HttpLlmProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn invoke(&self, prompt: &str, schema_name: &str) -> Result<serde_json::Value, LlmError> {
        let mut request = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .json(&json!({ "prompt": prompt, "schema_name": schema_name }));

        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                LlmError {
                    kind: LlmErrorKind::Timeout,
                    message: e.to_string(),
                    retryable: true,
                }
            } else {
                LlmError {
                    kind: LlmErrorKind::ProviderError,
                    message: e.to_string(),
                    retryable: true,
                }
            }
        })?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(LlmError {
                kind: LlmErrorKind::RateLimited,
                message: "provider rate limited the request".to_string(),
                retryable: true,
            });
        }

        if !response.status().is_success() {
            return Err(LlmError {
                kind: LlmErrorKind::ProviderError,
                message: format!("provider returned status {}", response.status()),
                retryable: response.status().is_server_error(),
            });
        }

        response.json::<serde_json::Value>().await.map_err(|e| LlmError {
            kind: LlmErrorKind::Validation,
            message: format!("malformed structured-output response: {e}"),
            retryable: false,
        })
    }
}
