//! Per-route call counter and latency histogram, exposed at `/metrics`.
//!
//! Labels come from the matched route template (`/api/post/{id}`), never
//! from the raw request path, so label cardinality stays bounded.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::EncodeLabelSet;
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::Registry;
use tracing::error;

#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct MethodLabels {
    pub method: String,
}

pub struct Metrics {
    registry: Registry,
    counter: Family<MethodLabels, Counter>,
    timing: Family<MethodLabels, Histogram>,
}

fn timing_histogram() -> Histogram {
    Histogram::new(exponential_buckets(0.001, 2.0, 14))
}

impl Metrics {
    pub fn new() -> Self {
        let mut registry = Registry::default();
        let counter = Family::<MethodLabels, Counter>::default();
        let timing = Family::<MethodLabels, Histogram>::new_with_constructor(
            timing_histogram as fn() -> Histogram,
        );
        registry.register("method_counter", "Per method counter", counter.clone());
        registry.register("method_timing", "Per method timing in seconds", timing.clone());
        Self {
            registry,
            counter,
            timing,
        }
    }

    pub fn observe(&self, route: &str, seconds: f64) {
        let labels = MethodLabels {
            method: route.to_string(),
        };
        self.counter.get_or_create(&labels).inc();
        self.timing.get_or_create(&labels).observe(seconds);
    }

    /// OpenMetrics text exposition of every registered family.
    pub fn render(&self) -> Result<String, std::fmt::Error> {
        let mut body = String::new();
        encode(&mut body, &self.registry)?;
        Ok(body)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Route layer: runs after routing so `MatchedPath` is present.
pub async fn track_metrics(State(metrics): State<Arc<Metrics>>, req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let start = Instant::now();
    let response = next.run(req).await;
    metrics.observe(&route, start.elapsed().as_secs_f64());
    response
}

pub async fn metrics_handler(State(metrics): State<Arc<Metrics>>) -> Response {
    match metrics.render() {
        Ok(body) => (
            [(CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            error!(error = %e, "can't encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_includes_route_label() {
        let metrics = Metrics::new();
        metrics.observe("/api/post/{id}", 0.004);
        metrics.observe("/api/post/{id}", 0.002);

        let body = metrics.render().unwrap();
        assert!(body.contains(r#"method_counter_total{method="/api/post/{id}"} 2"#));
        assert!(body.contains("method_timing_count"));
    }
}
