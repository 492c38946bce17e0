//! Server-side login/password interceptor
//!
//! Every call to the Ping service passes through [`AuthInterceptor`] before
//! the handler runs. The interceptor reads the `login` and `password`
//! metadata, compares them with the configured pair and either rejects the
//! call or stamps it with a [`ClientIdentity`].

use crate::auth::{constant_time_eq, CallMetadata, CredentialField, Credentials};
use crate::error::AUTH_REJECTION_METADATA_KEY;
use crate::grpc::proto::ping_server::{Ping, PingServer};
use metrics::counter;
use std::sync::Arc;
use thiserror::Error;
use tonic::codegen::InterceptedService;
use tonic::metadata::MetadataMap;
use tonic::{Request, Status};
use tracing::{info, warn};

/// Identity token issued to a call whose credentials were accepted
const AUTHENTICATED_CLIENT_ID: &str = "42";

/// Identity attached to an authenticated call
///
/// Lives in the request extensions for the duration of one call only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(String);

impl ClientIdentity {
    /// The token issued for a recognized login
    pub fn authenticated() -> Self {
        Self(AUTHENTICATED_CLIENT_ID.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Why a call was refused
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthRejection {
    #[error("missing credentials")]
    MissingCredentials,

    #[error("unknown user {0}")]
    UnknownUser(String),

    #[error("bad password")]
    BadPassword,
}

impl AuthRejection {
    /// Machine-readable reason sent alongside the status
    pub fn reason(&self) -> &'static str {
        match self {
            AuthRejection::MissingCredentials => "missing_credentials",
            AuthRejection::UnknownUser(_) => "unknown_user",
            AuthRejection::BadPassword => "bad_password",
        }
    }

    /// Recover the rejection reason from a status returned by the server
    pub fn reason_of(status: &Status) -> Option<&str> {
        status
            .metadata()
            .get(AUTH_REJECTION_METADATA_KEY)
            .and_then(|v| v.to_str().ok())
    }

    pub fn into_status(self) -> Status {
        let mut metadata = MetadataMap::new();
        metadata.insert(
            AUTH_REJECTION_METADATA_KEY,
            tonic::metadata::AsciiMetadataValue::from_static(self.reason()),
        );
        Status::with_metadata(tonic::Code::Unauthenticated, self.to_string(), metadata)
    }
}

/// Gate that validates every inbound call against one credential pair
#[derive(Clone)]
pub struct AuthInterceptor {
    expected: Arc<Credentials>,
}

impl AuthInterceptor {
    pub fn new(expected: Credentials) -> Self {
        Self {
            expected: Arc::new(expected),
        }
    }

    /// Validate the credentials carried by one call.
    ///
    /// The login is checked before the password, so a wrong login is always
    /// reported as [`AuthRejection::UnknownUser`].
    pub fn authenticate(&self, metadata: &MetadataMap) -> Result<ClientIdentity, AuthRejection> {
        let credentials = CallMetadata::from_grpc(metadata);
        let (Some(login), Some(password)) = (
            credentials.get(CredentialField::Login),
            credentials.get(CredentialField::Password),
        ) else {
            return Err(AuthRejection::MissingCredentials);
        };

        if !constant_time_eq(login.as_bytes(), self.expected.login().as_bytes()) {
            return Err(AuthRejection::UnknownUser(login.to_string()));
        }
        if !constant_time_eq(password.as_bytes(), self.expected.password().as_bytes()) {
            return Err(AuthRejection::BadPassword);
        }

        info!(login = %login, "Authenticated client");
        Ok(ClientIdentity::authenticated())
    }
}

impl tonic::service::Interceptor for AuthInterceptor {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        match self.authenticate(request.metadata()) {
            Ok(identity) => {
                counter!("ping_auth_attempts_total", "outcome" => "accepted").increment(1);
                request.extensions_mut().insert(identity);
                Ok(request)
            }
            Err(rejection) => {
                counter!("ping_auth_attempts_total", "outcome" => rejection.reason())
                    .increment(1);
                warn!(reason = rejection.reason(), "Rejected call: {}", rejection);
                Err(rejection.into_status())
            }
        }
    }
}

/// Mount a Ping implementation behind the authentication gate.
///
/// This is the only way the crate exposes a Ping server, so no handler is
/// reachable without passing [`AuthInterceptor`] first.
pub fn authenticated_service<T: Ping>(
    service: T,
    interceptor: AuthInterceptor,
) -> InterceptedService<PingServer<T>, AuthInterceptor> {
    PingServer::with_interceptor(service, interceptor)
}
