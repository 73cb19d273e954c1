//! Prometheus metrics scrape endpoint.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::ConfigError;

/// Install the global Prometheus recorder and start its scrape endpoint.
/// Must be called once, before any `metrics::counter!`/`histogram!` call.
pub fn install(listen_addr: SocketAddr) -> Result<(), ConfigError> {
    PrometheusBuilder::new()
        .with_http_listener(listen_addr)
        .install()
        .map_err(|err| ConfigError::InvalidValue {
            field: "metrics.listen_addr",
            reason: err.to_string(),
        })
}

/// Record a detected signal.
pub fn signal_detected(strategy: &'static str) {
    metrics::counter!("arbot_signals_detected_total", "strategy" => strategy).increment(1);
}

/// Record a risk-manager rejection, labeled by which pipeline stage rejected it.
pub fn signal_rejected(stage: &'static str) {
    metrics::counter!("arbot_signals_rejected_total", "stage" => stage).increment(1);
}

/// Record an order submission outcome.
pub fn order_submitted(exchange: &str, outcome: &'static str) {
    metrics::counter!("arbot_orders_submitted_total", "exchange" => exchange.to_string(), "outcome" => outcome).increment(1);
}

/// Record end-to-end signal-to-fill latency.
pub fn execution_latency_ms(strategy: &'static str, latency_ms: f64) {
    metrics::histogram!("arbot_execution_latency_ms", "strategy" => strategy).record(latency_ms);
}

/// Record the current size of the market state map, for capacity monitoring.
pub fn market_state_pairs(count: f64) {
    metrics::gauge!("arbot_market_state_pairs").set(count);
}
