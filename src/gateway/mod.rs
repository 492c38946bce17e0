//! HTTP/JSON gateway in front of the Ping gRPC service
//!
//! Each inbound HTTP request is translated into exactly one `SayHello` call
//! on the backend. Only the `Login` and `Password` headers cross into the
//! call's metadata; the gateway itself never authenticates anything.

pub mod handler;

use crate::grpc::proto::ping_client::PingClient;
use crate::middleware::{normalize_error_response, CredentialSafeMakeSpan, GatewayMetricsLayer};
use crate::tls::SecureChannel;
use axum::{
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::time::Duration;
use tonic::transport::Channel;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// HTTP route that maps onto `/api.Ping/SayHello`
pub const SAY_HELLO_ROUTE: &str = "/1/ping";

/// State shared by gateway handlers
///
/// The backend client wraps one multiplexed channel; cloning it per request
/// is cheap and needs no locking.
#[derive(Clone)]
pub struct GatewayState {
    client: PingClient<Channel>,
    request_timeout: Option<Duration>,
    prometheus: Option<PrometheusHandle>,
}

impl GatewayState {
    pub fn new(backend: SecureChannel) -> Self {
        Self {
            client: PingClient::new(backend.into_inner()),
            request_timeout: None,
            prometheus: None,
        }
    }

    /// Deadline propagated to each backend call
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Expose `/metrics` rendered from this handle
    pub fn with_prometheus(mut self, handle: PrometheusHandle) -> Self {
        self.prometheus = Some(handle);
        self
    }

    pub(crate) fn client(&self) -> PingClient<Channel> {
        self.client.clone()
    }

    pub(crate) fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    pub(crate) fn prometheus(&self) -> Option<&PrometheusHandle> {
        self.prometheus.as_ref()
    }
}

/// Build the gateway router
pub fn router(state: GatewayState) -> Router {
    let mut router = Router::new()
        .route(SAY_HELLO_ROUTE, post(handler::say_hello))
        .route("/health", get(handler::health));

    if state.prometheus().is_some() {
        router = router.route("/metrics", get(handler::metrics));
    }

    router.with_state(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(CredentialSafeMakeSpan))
            .layer(GatewayMetricsLayer)
            .layer(axum::middleware::from_fn(normalize_error_response)),
    )
}
