use std::time::{Duration, Instant};

use dashmap::DashMap;

const DAILY_WINDOW: Duration = Duration::from_secs(86_400);
const HOURLY_WINDOW: Duration = Duration::from_secs(3_600);

/// In-memory sliding-window counters per identity (IP for anonymous, user
/// id if available) for LLM generation. Not authoritative across
/// instances — combined with `RateLimiter` it provides layered defense.
/// Resets on process restart, by design.
pub struct QuotaTracker {
    usage: DashMap<String, Vec<Instant>>,
    daily_limit: usize,
    hourly_limit: usize,
}

impl QuotaTracker {
    pub fn new(daily_limit: usize, hourly_limit: usize) -> Self {
        Self { usage: DashMap::new(), daily_limit, hourly_limit }
    }

    /// Returns `(allowed, reason)`. Prunes entries older than the daily
    /// window lazily, on access.
    pub fn check_quota(&self, identity: &str) -> (bool, Option<String>) {
        let now = Instant::now();
        let mut entry = self.usage.entry(identity.to_string()).or_default();
        entry.retain(|&t| now.duration_since(t) < DAILY_WINDOW);

        let hourly_count = entry.iter().filter(|&&t| now.duration_since(t) < HOURLY_WINDOW).count();
        let daily_count = entry.len();

        if daily_count >= self.daily_limit {
            return (false, Some(format!("daily quota of {} exceeded", self.daily_limit)));
        }
        if hourly_count >= self.hourly_limit {
            return (false, Some(format!("hourly quota of {} exceeded", self.hourly_limit)));
        }
        (true, None)
    }

    pub fn record_usage(&self, identity: &str) {
        self.usage.entry(identity.to_string()).or_default().push(Instant::now());
    }

    pub fn usage_stats(&self, identity: &str) -> (usize, usize) {
        let now = Instant::now();
        match self.usage.get(identity) {
            Some(entry) => {
                let daily = entry.iter().filter(|&&t| now.duration_since(t) < DAILY_WINDOW).count();
                let hourly = entry.iter().filter(|&&t| now.duration_since(t) < HOURLY_WINDOW).count();
                (daily, hourly)
            },
            None => (0, 0),
        }
    }

    /// Test-only reset hook, mirroring `ConnectionManager::reset`.
    pub fn reset_identity(&self, identity: &str) {
        self.usage.remove(identity);
    }
}

impl Default for QuotaTracker {
    fn default() -> Self {
        Self::new(10, 2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_the_hourly_cap() {
        let tracker = QuotaTracker::new(10, 2);
        assert!(tracker.check_quota("ip-1").0);
        tracker.record_usage("ip-1");
        assert!(tracker.check_quota("ip-1").0);
        tracker.record_usage("ip-1");
        let (allowed, reason) = tracker.check_quota("ip-1");
        assert!(!allowed);
        assert!(reason.unwrap().contains("hourly"));
    }

    #[test]
    fn identities_are_independent() {
        let tracker = QuotaTracker::new(10, 2);
        tracker.record_usage("ip-1");
        tracker.record_usage("ip-1");
        assert!(!tracker.check_quota("ip-1").0);
        assert!(tracker.check_quota("ip-2").0);
    }
}
