//! Per-outcome request counters.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Gateway request metrics
#[derive(Debug, Default)]
pub struct GatewayMetrics {
    pub requests_total: AtomicU64,
    pub requests_ok: AtomicU64,
    /// Rejected before dispatch (400)
    pub bad_requests: AtomicU64,
    /// Handler error or panic (500)
    pub handler_failures: AtomicU64,
    /// No route for the dispatch key (404)
    pub not_found: AtomicU64,
    /// Declared method without handler (501)
    pub not_implemented: AtomicU64,
    /// No reply in time (504)
    pub timeouts: AtomicU64,
    /// Sum over all recorded requests; divided by `requests_total` on read.
    pub latency_ms_sum: AtomicU64,
}

impl GatewayMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished request by its reply status.
    pub fn record(&self, status: u16, latency_ms: u64) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);

        let counter = match status {
            200..=299 => Some(&self.requests_ok),
            400 => Some(&self.bad_requests),
            404 => Some(&self.not_found),
            500 => Some(&self.handler_failures),
            501 => Some(&self.not_implemented),
            504 => Some(&self.timeouts),
            _ => None,
        };
        if let Some(counter) = counter {
            counter.fetch_add(1, Ordering::Relaxed);
        }
        self.latency_ms_sum.fetch_add(latency_ms, Ordering::Relaxed);
    }

    /// Mean latency of recorded requests, 0 before the first one.
    pub fn average_latency_ms(&self) -> f64 {
        match self.requests_total.load(Ordering::Relaxed) {
            0 => 0.0,
            n => self.latency_ms_sum.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            ok: self.requests_ok.load(Ordering::Relaxed),
            bad_requests: self.bad_requests.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            not_implemented: self.not_implemented.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            average_latency_ms: self.average_latency_ms(),
        }
    }
}

/// Point-in-time copy of [`GatewayMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub requests_total: u64,
    pub ok: u64,
    pub bad_requests: u64,
    pub handler_failures: u64,
    pub not_found: u64,
    pub not_implemented: u64,
    pub timeouts: u64,
    pub average_latency_ms: f64,
}

/// Request timing helper
pub struct RequestTimer {
    start: Instant,
    metrics: Arc<GatewayMetrics>,
}

impl RequestTimer {
    pub fn new(metrics: Arc<GatewayMetrics>) -> Self {
        Self {
            start: Instant::now(),
            metrics,
        }
    }

    pub fn finish(self, status: u16) {
        let elapsed = self.start.elapsed();
        self.metrics
            .record(status, u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX));
    }
}
