//! Demonstration binary: runs one analysis thread end to end against the
//! in-memory market data provider and mock LLM registry, for local
//! inspection of the graph's output shape. Not the CLI described by the
//! engine's design; a small standalone bin in an otherwise library-first
//! workspace, in the spirit of the teacher's `data-loader` binary.

use market_intel_engine::{run_analysis, EngineContext};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "market_intel_engine=info".into()),
        )
        .init();

    let condition_id = std::env::args().nth(1).unwrap_or_else(|| "demo-market-001".to_string());

    let ctx = EngineContext::mock();
    let state = run_analysis(&condition_id, &ctx).await;

    match &state.recommendation {
        Some(recommendation) => {
            println!("{}", serde_json::to_string_pretty(recommendation).expect("recommendation serializes"));
        }
        None => {
            println!("no recommendation produced");
            if let Some(err) = &state.ingestion_error {
                println!("ingestion error: {err}");
            }
            if let Some(err) = &state.consensus_error {
                println!("consensus error: {err:?}");
            }
        }
    }
}
