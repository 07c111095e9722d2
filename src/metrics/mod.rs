//! Prometheus metrics for monitoring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Metrics collector.
#[derive(Debug, Default)]
pub struct Metrics {
    /// Total requests processed
    pub requests_total: AtomicU64,
    /// Requests answered with a result
    pub requests_success: AtomicU64,
    /// Requests answered with an error
    pub requests_failed: AtomicU64,
    /// Client notifications received
    pub notifications_received: AtomicU64,
    /// Tool calls
    pub tool_calls: AtomicU64,
    /// Server notifications delivered to the host
    pub notifications_emitted: AtomicU64,
}

impl Metrics {
    /// Create a new metrics collector.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_requests(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_received(&self) {
        self.notifications_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_tool_calls(&self) {
        self.tool_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications_emitted(&self) {
        self.notifications_emitted.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            notifications_received: self.notifications_received.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
            notifications_emitted: self.notifications_emitted.load(Ordering::Relaxed),
        }
    }

    /// Export metrics in Prometheus format.
    pub fn to_prometheus(&self) -> String {
        let s = self.snapshot();
        format!(
            r#"# HELP mcp_engine_requests_total Total number of requests
# TYPE mcp_engine_requests_total counter
mcp_engine_requests_total {}

# HELP mcp_engine_requests_success Successful requests
# TYPE mcp_engine_requests_success counter
mcp_engine_requests_success {}

# HELP mcp_engine_requests_failed Failed requests
# TYPE mcp_engine_requests_failed counter
mcp_engine_requests_failed {}

# HELP mcp_engine_notifications_received Client notifications received
# TYPE mcp_engine_notifications_received counter
mcp_engine_notifications_received {}

# HELP mcp_engine_tool_calls Tool calls count
# TYPE mcp_engine_tool_calls counter
mcp_engine_tool_calls {}

# HELP mcp_engine_notifications_emitted Server notifications delivered
# TYPE mcp_engine_notifications_emitted counter
mcp_engine_notifications_emitted {}
"#,
            s.requests_total,
            s.requests_success,
            s.requests_failed,
            s.notifications_received,
            s.tool_calls,
            s.notifications_emitted
        )
    }
}

/// Metrics snapshot.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_failed: u64,
    pub notifications_received: u64,
    pub tool_calls: u64,
    pub notifications_emitted: u64,
}

/// Timer for measuring durations.
pub struct Timer {
    start: Instant,
}

impl Timer {
    /// Start a new timer.
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Get elapsed time in milliseconds.
    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let metrics = Metrics::new();
        metrics.inc_requests();
        metrics.inc_requests();
        metrics.inc_success();
        metrics.inc_failed();
        metrics.inc_tool_calls();
        metrics.inc_notifications_received();

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests_total, 2);
        assert_eq!(snapshot.requests_success, 1);
        assert_eq!(snapshot.requests_failed, 1);
        assert_eq!(snapshot.tool_calls, 1);
        assert_eq!(snapshot.notifications_received, 1);
        assert_eq!(snapshot.notifications_emitted, 0);
    }

    #[test]
    fn test_prometheus_export() {
        let metrics = Metrics::new();
        metrics.inc_requests();
        metrics.inc_notifications_emitted();

        let text = metrics.to_prometheus();
        assert!(text.contains("mcp_engine_requests_total 1"));
        assert!(text.contains("mcp_engine_notifications_emitted 1"));
        assert!(text.contains("# TYPE mcp_engine_tool_calls counter"));
    }

    #[test]
    fn test_timer() {
        let timer = Timer::start();
        assert!(timer.elapsed_ms() < 60_000);
    }
}
