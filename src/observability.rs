//! In-process request metrics surfaced at `/metrics`. Plain atomics, no
//! external metrics crate: this service only needs a counter surface,
//! not a Prometheus exporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct AppMetrics {
    started_at: Instant,
    requests: AtomicU64,
    errors: AtomicU64,
    total_latency_ms: AtomicU64,
}

impl AppMetrics {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            requests: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            total_latency_ms: AtomicU64::new(0),
        }
    }

    pub fn record(&self, status_is_error: bool, latency_ms: u64) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if status_is_error {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }
        self.total_latency_ms.fetch_add(latency_ms, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let requests = self.requests.load(Ordering::Relaxed);
        let errors = self.errors.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);
        let avg_latency_ms = if requests > 0 { total_latency_ms as f64 / requests as f64 } else { 0.0 };

        MetricsSnapshot {
            uptime_secs: self.started_at.elapsed().as_secs(),
            requests,
            errors,
            avg_latency_ms,
        }
    }
}

impl Default for AppMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct MetricsSnapshot {
    pub uptime_secs: u64,
    pub requests: u64,
    pub errors: u64,
    pub avg_latency_ms: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averages_latency_across_requests() {
        let metrics = AppMetrics::new();
        metrics.record(false, 10);
        metrics.record(true, 20);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.errors, 1);
        assert_eq!(snapshot.avg_latency_ms, 15.0);
    }
}
