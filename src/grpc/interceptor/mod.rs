//! gRPC credential interceptors
//!
//! This module provides both halves of the login/password scheme:
//! - [`AuthInterceptor`] validates inbound calls on the server
//! - [`CredentialAttacher`] decorates outbound calls on the client

pub mod auth;
pub mod credentials;

pub use auth::{authenticated_service, AuthInterceptor, AuthRejection, ClientIdentity};
pub use credentials::{AuthenticatedPingClient, CredentialAttacher};
