//! TraceLayer span maker for the gateway.
//!
//! Records which allow-listed credential headers were present on a request,
//! never their values, so passwords cannot leak into application logs.

use crate::auth::CredentialField;
use axum::http::Request;
use tower_http::trace::MakeSpan;
use tracing::Span;

#[derive(Clone, Debug, Default)]
pub struct CredentialSafeMakeSpan;

impl<B> MakeSpan<B> for CredentialSafeMakeSpan {
    fn make_span(&mut self, request: &Request<B>) -> Span {
        tracing::info_span!(
            "request",
            method = %request.method(),
            path = %request.uri().path(),
            version = ?request.version(),
            credentials = %credential_summary(request.headers()),
        )
    }
}

/// Names of the credential headers present, e.g. `login,password` or `none`
fn credential_summary(headers: &axum::http::HeaderMap) -> String {
    let present: Vec<&str> = CredentialField::ALL
        .into_iter()
        .filter(|field| headers.contains_key(field.as_str()))
        .map(|field| field.as_str())
        .collect();

    if present.is_empty() {
        "none".to_string()
    } else {
        present.join(",")
    }
}
