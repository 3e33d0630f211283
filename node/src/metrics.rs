//! # Prometheus Metrics
//!
//! Operational metrics for the tavern gateway, scraped at `GET /metrics`.
//!
//! All metrics are registered in a dedicated [`prometheus::Registry`] so
//! they do not collide with any default global registry consumers.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{Encoder, IntCounter, IntGauge, Registry, TextEncoder};
use std::sync::Arc;

/// Holds all Prometheus metric handles for the gateway.
///
/// Clone-friendly (prometheus handles are internally shared) so it can
/// be passed across request handlers and the socket tasks.
#[derive(Clone)]
pub struct GatewayMetrics {
    /// Prometheus registry that owns all metrics below.
    registry: Registry,
    /// WebSocket connections currently open.
    pub connections_open: IntGauge,
    /// Total WebSocket connections accepted since startup.
    pub connections_total: IntCounter,
    /// Total client frames received (parseable or not).
    pub messages_total: IntCounter,
    /// Logins that ended in a `loginOk`.
    pub auth_success_total: IntCounter,
    /// Logins that ended in an `authFailed`.
    pub auth_failure_total: IntCounter,
}

impl GatewayMetrics {
    /// Creates and registers all metrics. Call once at startup.
    pub fn new() -> Self {
        let registry = Registry::new_custom(Some("tavern".into()), None)
            .expect("failed to create prometheus registry");

        let connections_open = IntGauge::new(
            "connections_open",
            "WebSocket connections currently open",
        )
        .expect("metric creation");
        registry
            .register(Box::new(connections_open.clone()))
            .expect("metric registration");

        let connections_total = IntCounter::new(
            "connections_total",
            "Total WebSocket connections accepted since startup",
        )
        .expect("metric creation");
        registry
            .register(Box::new(connections_total.clone()))
            .expect("metric registration");

        let messages_total = IntCounter::new(
            "messages_total",
            "Total client frames received on the WebSocket endpoint",
        )
        .expect("metric creation");
        registry
            .register(Box::new(messages_total.clone()))
            .expect("metric registration");

        let auth_success_total =
            IntCounter::new("auth_success_total", "Logins that succeeded").expect("metric creation");
        registry
            .register(Box::new(auth_success_total.clone()))
            .expect("metric registration");

        let auth_failure_total =
            IntCounter::new("auth_failure_total", "Logins that failed").expect("metric creation");
        registry
            .register(Box::new(auth_failure_total.clone()))
            .expect("metric registration");

        Self {
            registry,
            connections_open,
            connections_total,
            messages_total,
            auth_success_total,
            auth_failure_total,
        }
    }

    /// Encodes all registered metrics into the Prometheus text exposition format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer).expect("prometheus output is valid utf-8"))
    }
}

/// Shared metrics state passed to axum handlers.
pub type SharedMetrics = Arc<GatewayMetrics>;

/// Axum handler that renders `/metrics` in Prometheus text format.
///
/// Returns HTTP 500 if encoding fails (should never happen in practice).
pub async fn metrics_handler(
    axum::extract::State(metrics): axum::extract::State<SharedMetrics>,
) -> impl IntoResponse {
    match metrics.encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("failed to encode metrics: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}
