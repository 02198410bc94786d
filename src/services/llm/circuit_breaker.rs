use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

/// Closed/Open/Half-Open state machine, one instance per downstream
/// (per provider). Ported from
/// `original_source/backend/src/llm/circuit_breaker.py`, made **stricter**
/// than that reference: Half-Open here enforces a single in-flight probe
/// via a dedicated guard, where the Python comment only notes that a
/// stricter implementation would need a lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

pub struct CircuitBreaker {
    name: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Arc<Mutex<Inner>>,
}

/// Returned by `allow_request` when the breaker is Open, or Half-Open
/// with a probe already in flight.
#[derive(Debug)]
pub struct CircuitOpenError {
    pub name: String,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            name: name.into(),
            failure_threshold,
            recovery_timeout,
            inner: Arc::new(Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            })),
        }
    }

    /// Call before attempting the guarded operation. On success the
    /// caller must call `record_success`; on failure, `record_failure`.
    pub async fn allow_request(&self) -> Result<(), CircuitOpenError> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or(Duration::ZERO);
                if elapsed >= self.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    Ok(())
                } else {
                    Err(CircuitOpenError { name: self.name.clone() })
                }
            },
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    Err(CircuitOpenError { name: self.name.clone() })
                } else {
                    inner.probe_in_flight = true;
                    Ok(())
                }
            },
        }
    }

    pub async fn record_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;
        inner.probe_in_flight = false;
        inner.state = CircuitState::Closed;
        inner.opened_at = None;
    }

    pub async fn record_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.probe_in_flight = false;
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            },
            _ => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            },
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.inner.lock().await.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new("test", 3, Duration::from_millis(50));
        for _ in 0..3 {
            breaker.allow_request().await.unwrap();
            breaker.record_failure().await;
        }
        assert_eq!(breaker.state().await, CircuitState::Open);
        assert!(breaker.allow_request().await.is_err());
    }

    #[tokio::test]
    async fn half_opens_after_recovery_timeout_then_closes_on_success() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_millis(20));
        breaker.allow_request().await.unwrap();
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        breaker.allow_request().await.unwrap();
        assert_eq!(breaker.state().await, CircuitState::HalfOpen);

        breaker.record_success().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn half_open_probe_failure_reopens() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_millis(20));
        breaker.allow_request().await.unwrap();
        breaker.record_failure().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        breaker.allow_request().await.unwrap();
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Open);
    }

    #[tokio::test]
    async fn half_open_admits_only_one_probe_at_a_time() {
        let breaker = CircuitBreaker::new("test", 1, Duration::from_millis(20));
        breaker.allow_request().await.unwrap();
        breaker.record_failure().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        breaker.allow_request().await.unwrap();
        // A second concurrent probe attempt is rejected while the first is in flight.
        assert!(breaker.allow_request().await.is_err());
    }

    #[tokio::test]
    async fn success_in_closed_resets_the_counter() {
        let breaker = CircuitBreaker::new("test", 3, Duration::from_millis(50));
        breaker.allow_request().await.unwrap();
        breaker.record_failure().await;
        breaker.allow_request().await.unwrap();
        breaker.record_success().await;
        breaker.allow_request().await.unwrap();
        breaker.record_failure().await;
        assert_eq!(breaker.state().await, CircuitState::Closed);
    }
}
