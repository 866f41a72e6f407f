use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
pub struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests,
            window,
        }
    }

    pub async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            let wait_until = ts.front().unwrap().checked_add(self.window).unwrap();
            let sleep_dur = wait_until.duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "rate limiter: waiting {:.1}s for a market-data slot",
                sleep_dur.as_secs_f64()
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Three-state circuit breaker guarding a single external source. Opens after
/// `failure_threshold` consecutive failures, refuses calls while open, and
/// allows exactly one probe call through once `reset_after` has elapsed.
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    failure_threshold: u32,
    reset_after: Duration,
}

struct BreakerState {
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    half_open_probe_in_flight: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerDecision {
    Proceed,
    ProceedAsProbe,
    Reject,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, reset_after: Duration) -> Self {
        Self {
            state: Mutex::new(BreakerState {
                consecutive_failures: 0,
                opened_at: None,
                half_open_probe_in_flight: false,
            }),
            failure_threshold,
            reset_after,
        }
    }

    pub async fn check(&self) -> BreakerDecision {
        let mut state = self.state.lock().await;
        match state.opened_at {
            None => BreakerDecision::Proceed,
            Some(opened_at) => {
                if state.half_open_probe_in_flight {
                    return BreakerDecision::Reject;
                }
                if opened_at.elapsed() >= self.reset_after {
                    state.half_open_probe_in_flight = true;
                    BreakerDecision::ProceedAsProbe
                } else {
                    BreakerDecision::Reject
                }
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.lock().await;
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.half_open_probe_in_flight = false;
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.lock().await;
        state.half_open_probe_in_flight = false;
        state.consecutive_failures += 1;
        if state.consecutive_failures >= self.failure_threshold {
            state.opened_at = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn breaker_opens_after_threshold_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(30));
        for _ in 0..3 {
            assert_eq!(breaker.check().await, BreakerDecision::Proceed);
            breaker.record_failure().await;
        }
        assert_eq!(breaker.check().await, BreakerDecision::Reject);
    }

    #[tokio::test]
    async fn breaker_recovers_on_success() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(30));
        breaker.record_failure().await;
        breaker.record_failure().await;
        assert_eq!(breaker.check().await, BreakerDecision::Reject);
        // force reset by simulating success directly (production path enters
        // via the half-open probe instead)
        breaker.record_success().await;
        assert_eq!(breaker.check().await, BreakerDecision::Proceed);
    }
}
