//! Unified error handling for Ping Gateway

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tonic::Code;

/// Application-wide result type
pub type Result<T> = std::result::Result<T, AppError>;

/// Metadata key carrying the machine-readable authentication rejection reason
pub const AUTH_REJECTION_METADATA_KEY: &str = "x-auth-rejection";

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Failed to load TLS material from '{path}': {reason}")]
    CertLoad { path: String, reason: String },

    #[error("Failed to listen on {addr}: {source}")]
    Listen {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Refusing to send credentials over an unencrypted channel to {0}")]
    InsecureTransport(String),

    #[error("Cannot translate request: {0}")]
    Translation(String),

    #[error("RPC failed: {}", .0.message())]
    Rpc(#[from] tonic::Status),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    error: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

/// Map a gRPC status code onto the HTTP status the gateway answers with.
///
/// Follows the grpc-gateway translation table.
pub fn http_status_for(code: Code) -> StatusCode {
    match code {
        Code::Ok => StatusCode::OK,
        Code::Cancelled => {
            StatusCode::from_u16(499).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Code::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        Code::InvalidArgument => StatusCode::BAD_REQUEST,
        Code::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        Code::NotFound => StatusCode::NOT_FOUND,
        Code::AlreadyExists => StatusCode::CONFLICT,
        Code::PermissionDenied => StatusCode::FORBIDDEN,
        Code::Unauthenticated => StatusCode::UNAUTHORIZED,
        Code::ResourceExhausted => StatusCode::TOO_MANY_REQUESTS,
        Code::FailedPrecondition => StatusCode::BAD_REQUEST,
        Code::Aborted => StatusCode::CONFLICT,
        Code::OutOfRange => StatusCode::BAD_REQUEST,
        Code::Unimplemented => StatusCode::NOT_IMPLEMENTED,
        Code::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        Code::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        Code::DataLoss => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_type_for(code: Code) -> &'static str {
    match code {
        Code::Unauthenticated => "unauthenticated",
        Code::PermissionDenied => "forbidden",
        Code::InvalidArgument | Code::FailedPrecondition | Code::OutOfRange => "bad_request",
        Code::NotFound => "not_found",
        Code::DeadlineExceeded => "deadline_exceeded",
        Code::Cancelled => "cancelled",
        Code::Unavailable => "backend_unavailable",
        Code::Unimplemented => "not_implemented",
        Code::ResourceExhausted => "rate_limited",
        Code::AlreadyExists | Code::Aborted => "conflict",
        _ => "internal_error",
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Translation(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorResponse {
                    error: "translation_failure".to_string(),
                    message: msg.clone(),
                    code: Some(Code::InvalidArgument as i32),
                    reason: None,
                },
            ),
            AppError::Rpc(status) => {
                if status.code() == Code::Unavailable {
                    tracing::warn!("Backend unavailable: {}", status.message());
                }
                let reason = status
                    .metadata()
                    .get(AUTH_REJECTION_METADATA_KEY)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                (
                    http_status_for(status.code()),
                    ErrorResponse {
                        error: error_type_for(status.code()).to_string(),
                        message: status.message().to_string(),
                        code: Some(status.code() as i32),
                        reason,
                    },
                )
            }
            AppError::InsecureTransport(_) => {
                tracing::error!("{}", self);
                (
                    StatusCode::BAD_GATEWAY,
                    ErrorResponse {
                        error: "insecure_transport".to_string(),
                        message: "Backend channel is not encrypted".to_string(),
                        code: None,
                        reason: None,
                    },
                )
            }
            AppError::CertLoad { .. }
            | AppError::Listen { .. }
            | AppError::Config(_)
            | AppError::Internal(_) => {
                tracing::error!("Internal error: {:?}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: "internal_error".to_string(),
                        message: "An internal error occurred".to_string(),
                        code: None,
                        reason: None,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tonic::metadata::MetadataMap;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_error_display() {
        let err = AppError::CertLoad {
            path: "cert/server.crt".to_string(),
            reason: "No such file".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to load TLS material from 'cert/server.crt': No such file"
        );
    }

    #[test]
    fn test_error_conversion() {
        let err: AppError = anyhow::anyhow!("Something went wrong").into();
        assert!(matches!(err, AppError::Internal(_)));

        let err: AppError = tonic::Status::unavailable("connection refused").into();
        assert!(matches!(err, AppError::Rpc(_)));
    }

    #[test]
    fn test_http_status_table() {
        assert_eq!(http_status_for(Code::Unauthenticated), StatusCode::UNAUTHORIZED);
        assert_eq!(http_status_for(Code::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(http_status_for(Code::DeadlineExceeded), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(http_status_for(Code::InvalidArgument), StatusCode::BAD_REQUEST);
        assert_eq!(http_status_for(Code::Cancelled).as_u16(), 499);
        assert_eq!(http_status_for(Code::Unimplemented), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_translation_failure_is_400() {
        let response = AppError::Translation("invalid JSON".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = body_json(response).await;
        assert_eq!(body["error"], "translation_failure");
        assert_eq!(body["message"], "invalid JSON");
    }

    #[tokio::test]
    async fn test_rpc_rejection_carries_reason() {
        let mut metadata = MetadataMap::new();
        metadata.insert(AUTH_REJECTION_METADATA_KEY, "bad_password".parse().unwrap());
        let status = tonic::Status::with_metadata(Code::Unauthenticated, "bad password", metadata);

        let response = AppError::Rpc(status).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body = body_json(response).await;
        assert_eq!(body["error"], "unauthenticated");
        assert_eq!(body["message"], "bad password");
        assert_eq!(body["reason"], "bad_password");
        assert_eq!(body["code"], 16);
    }

    #[tokio::test]
    async fn test_backend_unavailable_is_503() {
        let response =
            AppError::Rpc(tonic::Status::unavailable("tcp connect error")).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let body = body_json(response).await;
        assert_eq!(body["error"], "backend_unavailable");
        assert!(body.get("reason").is_none());
    }

    #[tokio::test]
    async fn test_internal_error_hides_details() {
        let response = AppError::Config("AUTH_PASSWORD missing".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["message"], "An internal error occurred");
    }
}
