//! Ping Gateway - authenticated gRPC service with an HTTP/JSON gateway
//!
//! This crate provides a TLS-secured gRPC `Ping` service whose calls are
//! authenticated by a login/password interceptor, and a gateway that
//! translates HTTP/JSON requests into the same gRPC calls.

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod grpc;
pub mod middleware;
pub mod server;
pub mod telemetry;
pub mod tls;

// Re-export commonly used types
pub use auth::{CallMetadata, CredentialField, Credentials};
pub use config::Config;
pub use error::{AppError, Result};
