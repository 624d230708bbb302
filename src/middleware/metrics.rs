//! Prometheus metrics for authgate.
//!
//! Exposes a standard `/metrics` endpoint that Prometheus can scrape.
//! Request metrics are updated for every routed request by [`track_metrics`];
//! the health gauge is owned by the health aggregator.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::middleware::Next;
use axum::response::Response;
use prometheus::{
    histogram_opts, opts, Encoder, HistogramVec, IntCounterVec, IntGauge, Registry, TextEncoder,
};

use crate::AppState;

/// Metric registry plus handles to every metric authgate exports.
///
/// Each instance owns its own [`Registry`], so tests can build as many as
/// they like without tripping duplicate-registration errors.
pub struct Metrics {
    registry: Registry,
    requests_total: IntCounterVec,
    request_duration_seconds: HistogramVec,
    service_health: IntGauge,
}

impl Metrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let requests_total = IntCounterVec::new(
            opts!("authgate_requests_total", "Total number of API requests"),
            &["route", "status"],
        )?;
        let request_duration_seconds = HistogramVec::new(
            histogram_opts!(
                "authgate_request_duration_seconds",
                "Histogram of response latency (seconds) of API requests",
                prometheus::DEFAULT_BUCKETS.to_vec()
            ),
            &["route"],
        )?;
        let service_health = IntGauge::with_opts(opts!(
            "service_health_status",
            "Health status of the service: 1=Healthy, 0=Unhealthy"
        ))?;

        registry.register(Box::new(requests_total.clone()))?;
        registry.register(Box::new(request_duration_seconds.clone()))?;
        registry.register(Box::new(service_health.clone()))?;

        Ok(Self {
            registry,
            requests_total,
            request_duration_seconds,
            service_health,
        })
    }

    /// Gauge handle for the health aggregator.
    pub fn service_health(&self) -> IntGauge {
        self.service_health.clone()
    }

    pub fn record(&self, route: &str, status: u16, elapsed_secs: f64) {
        self.requests_total
            .with_label_values(&[route, &status.to_string()])
            .inc();
        self.request_duration_seconds
            .with_label_values(&[route])
            .observe(elapsed_secs);
    }

    pub fn requests_count(&self, route: &str, status: u16) -> u64 {
        self.requests_total
            .with_label_values(&[route, &status.to_string()])
            .get()
    }

    /// Encode the registry as Prometheus text format.
    pub fn encode(&self) -> String {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        if let Err(e) = encoder.encode(&self.registry.gather(), &mut buffer) {
            tracing::error!("failed to encode metrics: {}", e);
            return String::new();
        }
        String::from_utf8(buffer).unwrap_or_default()
    }
}

/// Middleware: count and time every request by its route pattern.
///
/// Uses the matched route (not the raw path) so label cardinality stays
/// bounded by the router; unmatched paths collapse into `"unmatched"`.
pub async fn track_metrics(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| "unmatched".to_string());

    let resp = next.run(req).await;

    state
        .metrics
        .record(&route, resp.status().as_u16(), start.elapsed().as_secs_f64());
    resp
}

// ── Tests ─────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_includes_registered_metrics() {
        let metrics = Metrics::new().unwrap();
        metrics.record("/v1/auth/login", 200, 0.01);
        metrics.service_health().set(1);

        let output = metrics.encode();
        assert!(output.contains("authgate_requests_total"));
        assert!(output.contains("authgate_request_duration_seconds"));
        assert!(output.contains("service_health_status 1"));
    }

    #[test]
    fn test_labels_are_route_and_status() {
        let metrics = Metrics::new().unwrap();
        metrics.record("/v1/auth/logout", 200, 0.01);
        let output = metrics.encode();
        assert!(output.contains(r#"route="/v1/auth/logout""#));
        assert!(output.contains(r#"status="200""#));
        assert!(!output.contains("method="));
    }

    #[test]
    fn test_independent_registries() {
        let a = Metrics::new().unwrap();
        let b = Metrics::new().unwrap();
        a.record("/v1/auth/verify", 401, 0.001);
        assert_eq!(a.requests_count("/v1/auth/verify", 401), 1);
        assert_eq!(b.requests_count("/v1/auth/verify", 401), 0);
    }
}
