//! Narrative enrichment: a best-effort LLM pass over a already-built
//! `Explanation` that replaces its mechanically generated summary with a
//! prose rendering, when a provider is reachable and returns a well-formed
//! response. Grounded in the teacher's graceful LLM degradation in
//! `trading-agent`'s narrative step — an LLM failure never blocks a
//! recommendation, it only leaves the mechanical summary in place.

use llm_client::LlmProviderRegistry;
use market_intel_core::Explanation;

const SCHEMA_NAME: &str = "narrative_enrichment";

fn prompt_for(explanation: &Explanation) -> String {
    format!(
        "Rewrite this trade thesis as a short prose summary (2-3 sentences). \
         Core thesis: {}. Key catalysts: {}. Failure scenarios: {}. \
         Respond as JSON: {{\"summary\": \"...\"}}.",
        explanation.core_thesis,
        explanation.key_catalysts.join("; "),
        explanation.failure_scenarios.join("; "),
    )
}

/// Mutates `explanation.summary` in place. Any provider error, timeout, or
/// response missing a `summary` string field leaves `explanation` untouched.
pub async fn enrich_explanation(explanation: &mut Explanation, registry: &LlmProviderRegistry) {
    let provider = registry.resolve("narrative_enrichment");
    let prompt = prompt_for(explanation);

    match provider.invoke(&prompt, SCHEMA_NAME).await {
        Ok(value) => match value.get("summary").and_then(|s| s.as_str()) {
            Some(summary) if !summary.trim().is_empty() => {
                explanation.summary = summary.to_string();
            }
            _ => {
                tracing::debug!("narrative enrichment response had no usable summary, keeping mechanical summary");
            }
        },
        Err(e) => {
            tracing::warn!(error = %e, "narrative enrichment provider call failed, keeping mechanical summary");
        }
    }
}
