//! Gateway request metrics
//!
//! Implemented as a Tower Layer/Service so it wraps the whole router,
//! including framework rejections.

use axum::{body::Body, http::Request, response::Response};
use metrics::{counter, gauge, histogram};
use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};
use tower::{Layer, Service};

/// Routes reported with their own label; everything else is `other`.
const KNOWN_ROUTES: &[&str] = &["/1/ping", "/health", "/metrics"];

/// Tower Layer recording gateway request metrics.
#[derive(Clone, Default)]
pub struct GatewayMetricsLayer;

impl<S> Layer<S> for GatewayMetricsLayer {
    type Service = GatewayMetrics<S>;

    fn layer(&self, inner: S) -> Self::Service {
        GatewayMetrics { inner }
    }
}

/// Tower Service that records request count, latency and in-flight requests.
#[derive(Clone)]
pub struct GatewayMetrics<S> {
    inner: S,
}

/// Decrements the in-flight gauge even when the request future is dropped
/// because the client went away.
struct InFlight;

impl InFlight {
    fn enter() -> Self {
        gauge!("ping_gateway_requests_in_flight").increment(1.0);
        InFlight
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        gauge!("ping_gateway_requests_in_flight").decrement(1.0);
    }
}

impl<S> Service<Request<Body>> for GatewayMetrics<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<Body>) -> Self::Future {
        let method = request.method().to_string();
        let route = route_label(request.uri().path());

        // Take the service that was driven to readiness, leave a fresh clone behind.
        let clone = self.inner.clone();
        let mut inner = std::mem::replace(&mut self.inner, clone);

        Box::pin(async move {
            let _in_flight = InFlight::enter();
            let start = Instant::now();

            let response = inner.call(request).await?;

            let status = response.status().as_u16().to_string();
            counter!("ping_gateway_requests_total", "method" => method.clone(), "route" => route, "status" => status)
                .increment(1);
            histogram!("ping_gateway_request_duration_seconds", "method" => method, "route" => route)
                .record(start.elapsed().as_secs_f64());

            Ok(response)
        })
    }
}

fn route_label(path: &str) -> &'static str {
    KNOWN_ROUTES
        .iter()
        .copied()
        .find(|route| *route == path)
        .unwrap_or("other")
}
