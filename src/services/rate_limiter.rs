use std::time::{Duration, Instant};

use dashmap::DashMap;

/// One token bucket limit, e.g. "10 per hour".
#[derive(Debug, Clone, Copy)]
pub struct LimitSpec {
    pub max_requests: u32,
    pub window: Duration,
}

impl LimitSpec {
    pub const fn per_hour(n: u32) -> Self {
        Self { max_requests: n, window: Duration::from_secs(3600) }
    }

    pub const fn per_minute(n: u32) -> Self {
        Self { max_requests: n, window: Duration::from_secs(60) }
    }

    pub const fn per_day(n: u32) -> Self {
        Self { max_requests: n, window: Duration::from_secs(86_400) }
    }
}

struct Bucket {
    hits: Vec<Instant>,
}

/// Per-endpoint, per-IP rate limiting with multiple concurrent limits
/// supported per endpoint (e.g. 3/minute AND 10/hour on login). Keys are
/// namespaced by endpoint path so that exhausting one endpoint's bucket
/// never touches another's.
///
/// Built by hand in the same `DashMap`-backed concurrent-state idiom as
/// `services::connection_manager` — no direct `original_source` module
/// exists to port since the Python reference pulls in `slowapi`/`limits`
/// rather than implementing its own bucket.
pub struct RateLimiter {
    buckets: DashMap<(String, String), Bucket>,
}

#[derive(Debug)]
pub struct RateLimitExceeded {
    pub limit: LimitSpec,
    pub retry_after_secs: u64,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { buckets: DashMap::new() }
    }

    /// Checks every limit for `(endpoint, ip)`, recording a hit only if
    /// every limit currently allows it (all-or-nothing per call).
    pub fn check(
        &self,
        endpoint: &str,
        ip: &str,
        limits: &[LimitSpec],
    ) -> Result<(), RateLimitExceeded> {
        let now = Instant::now();
        for limit in limits {
            let key = (endpoint.to_string(), format!("{ip}|{}", limit.window.as_secs()));
            let mut bucket = self.buckets.entry(key).or_insert_with(|| Bucket { hits: Vec::new() });
            bucket.hits.retain(|&t| now.duration_since(t) < limit.window);
            if bucket.hits.len() as u32 >= limit.max_requests {
                let oldest = bucket.hits.iter().min().copied().unwrap_or(now);
                let retry_after = limit.window.saturating_sub(now.duration_since(oldest));
                return Err(RateLimitExceeded { limit: *limit, retry_after_secs: retry_after.as_secs().max(1) });
            }
        }
        for limit in limits {
            let key = (endpoint.to_string(), format!("{ip}|{}", limit.window.as_secs()));
            self.buckets.entry(key).or_insert_with(|| Bucket { hits: Vec::new() }).hits.push(now);
        }
        Ok(())
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

pub mod limits {
    use super::LimitSpec;

    pub const SIGNUP: &[LimitSpec] = &[LimitSpec::per_hour(5)];
    pub const LOGIN: &[LimitSpec] = &[LimitSpec::per_hour(10), LimitSpec::per_minute(3)];
    pub const RESET_PASSWORD: &[LimitSpec] = &[LimitSpec::per_hour(3)];
    pub const GENERATE_EXPLANATION: &[LimitSpec] = &[LimitSpec::per_day(10), LimitSpec::per_hour(2)];
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_limit_then_blocks() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check("signup", "1.2.3.4", limits::SIGNUP).is_ok());
        }
        assert!(limiter.check("signup", "1.2.3.4", limits::SIGNUP).is_err());
    }

    #[test]
    fn endpoints_are_independent() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            limiter.check("signup", "1.2.3.4", limits::SIGNUP).unwrap();
        }
        assert!(limiter.check("signup", "1.2.3.4", limits::SIGNUP).is_err());
        // login's bucket is untouched by signup exhaustion.
        assert!(limiter.check("login", "1.2.3.4", limits::LOGIN).is_ok());
    }

    #[test]
    fn multiple_concurrent_limits_on_one_endpoint() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            assert!(limiter.check("login", "9.9.9.9", limits::LOGIN).is_ok());
        }
        // 3/minute now exhausted even though 10/hour has room.
        assert!(limiter.check("login", "9.9.9.9", limits::LOGIN).is_err());
    }
}
