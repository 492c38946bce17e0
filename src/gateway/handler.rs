//! Gateway handlers

use super::GatewayState;
use crate::auth::CallMetadata;
use crate::error::{AppError, Result};
use crate::grpc::proto::PingMessage;
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Decode the JSON body into the RPC payload. An empty body is the empty message.
pub fn decode_body(body: &[u8]) -> Result<PingMessage> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PingMessage::default());
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::Translation(format!("invalid request body: {e}")))
}

/// Build the outbound RPC request for one HTTP request.
///
/// Fails with [`AppError::Translation`] before anything is sent when the
/// body or the credential headers cannot be mapped.
pub fn translate_request(
    headers: &HeaderMap,
    body: &[u8],
) -> Result<tonic::Request<PingMessage>> {
    let payload = decode_body(body)?;
    let metadata = CallMetadata::from_headers(headers)?;
    if metadata.is_empty() {
        debug!("No credential headers; forwarding without call credentials");
    }

    let mut request = tonic::Request::new(payload);
    metadata.write_grpc(request.metadata_mut())?;
    Ok(request)
}

/// `POST /1/ping` -> `/api.Ping/SayHello`
pub async fn say_hello(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response> {
    let mut request = translate_request(&headers, &body)?;
    if let Some(timeout) = state.request_timeout() {
        request.set_timeout(timeout);
    }

    debug!("Forwarding SayHello to backend");
    // Dropping this future (client disconnect) cancels the backend call too.
    let response = state.client().say_hello(request).await?;
    let (metadata, message, _) = response.into_parts();

    let mut http_response = Json(message).into_response();
    CallMetadata::from_grpc(&metadata).write_headers(http_response.headers_mut())?;
    Ok(http_response)
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Liveness endpoint
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Prometheus scrape endpoint
pub async fn metrics(State(state): State<GatewayState>) -> Response {
    match state.prometheus() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
