//! HTTP middleware for the gateway
//!
//! - JSON normalization of framework-level error responses
//! - Request metrics
//! - Request spans that never record credential headers

pub mod error_response;
pub mod metrics;
pub mod trace;

pub use error_response::normalize_error_response;
pub use metrics::GatewayMetricsLayer;
pub use trace::CredentialSafeMakeSpan;
