//! Prometheus metrics setup and metric definitions

use anyhow::{Context, Result};
use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_prometheus_recorder() -> Result<PrometheusHandle> {
    // Sub-millisecond buckets matter: most calls never leave the host.
    let buckets = vec![
        0.0005, 0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ];

    PrometheusBuilder::new()
        .set_buckets(&buckets)
        .context("failed to set histogram buckets")?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}

/// Register metric descriptions and emit initial zero values so Prometheus
/// output includes HELP/TYPE lines from startup.
pub fn describe_metrics() {
    // gRPC metrics
    describe_counter!(
        "ping_auth_attempts_total",
        "Authentication decisions made by the gRPC interceptor, by outcome"
    );
    describe_counter!(
        "ping_grpc_requests_total",
        "Total number of gRPC calls that reached the Ping handler"
    );

    // Gateway metrics
    describe_counter!(
        "ping_gateway_requests_total",
        "Total number of HTTP requests handled by the gateway"
    );
    describe_histogram!(
        "ping_gateway_request_duration_seconds",
        "Gateway request duration in seconds"
    );
    describe_gauge!(
        "ping_gateway_requests_in_flight",
        "Number of gateway requests currently being processed"
    );

    for outcome in ["accepted", "missing_credentials", "unknown_user", "bad_password"] {
        counter!("ping_auth_attempts_total", "outcome" => outcome).absolute(0);
    }
    counter!("ping_grpc_requests_total", "method" => "SayHello").absolute(0);
    gauge!("ping_gateway_requests_in_flight").set(0.0);
}
