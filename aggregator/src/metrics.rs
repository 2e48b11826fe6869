// Metrics and observability module
// This file holds the prometheus collectors for route processing and the
// text exposition used by the replay tool
//
// Numan Thabit 2025 Nov

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};

pub static ROUTES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_routes_total",
        "processed routes by outcome",
        &["outcome"]
    )
    .expect("router_routes_total registers once")
});

pub static ROUTE_FAILURES: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_route_failures_total",
        "failed routes by error kind",
        &["kind"]
    )
    .expect("router_route_failures_total registers once")
});

pub static VENUE_CALLS: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "router_venue_calls_total",
        "venue adapter invocations",
        &["adapter"]
    )
    .expect("router_venue_calls_total registers once")
});

pub static ROUTE_LATENCY: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "router_route_latency_seconds",
        "wall time of process_route",
        vec![0.000_05, 0.000_1, 0.000_5, 0.001, 0.005, 0.01, 0.05]
    )
    .expect("router_route_latency_seconds registers once")
});

pub fn record_success() {
    ROUTES_TOTAL.with_label_values(&["success"]).inc();
}

pub fn record_failure(kind: &str) {
    ROUTES_TOTAL.with_label_values(&["failure"]).inc();
    ROUTE_FAILURES.with_label_values(&[kind]).inc();
}

/// Text exposition of everything in the default registry.
pub fn render() -> Result<String, prometheus::Error> {
    let mut buf = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buf)?;
    String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_includes_recorded_series() {
        record_failure("unknown_selector");
        VENUE_CALLS.with_label_values(&["cpmm"]).inc();
        let text = render().unwrap();
        assert!(text.contains("router_route_failures_total{kind=\"unknown_selector\"}"));
        assert!(text.contains("router_venue_calls_total{adapter=\"cpmm\"}"));
    }
}
