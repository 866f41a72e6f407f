pub mod http_client;
pub mod mock;
pub mod rate_limiter;

pub use http_client::PolymarketClient;
pub use mock::InMemoryMarketDataProvider;
pub use rate_limiter::{BreakerDecision, CircuitBreaker, RateLimiter};
