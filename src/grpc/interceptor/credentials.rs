//! Client-side credential attachment

use crate::auth::{CallMetadata, Credentials};
use crate::grpc::proto::ping_client::PingClient;
use crate::tls::SecureChannel;
use tonic::codegen::InterceptedService;
use tonic::transport::Channel;
use tonic::{Request, Status};

/// Ping client whose every call carries login/password metadata
pub type AuthenticatedPingClient = PingClient<InterceptedService<Channel, CredentialAttacher>>;

/// Per-call credential decoration for outbound requests
///
/// Holds no state besides the credential pair and performs no I/O. It can
/// only be bound to a [`SecureChannel`], so the password never leaves the
/// process over plaintext.
#[derive(Debug, Clone)]
pub struct CredentialAttacher {
    credentials: Credentials,
}

impl CredentialAttacher {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// Always `true`: these credentials are only sent over TLS.
    pub fn requires_secure_transport(&self) -> bool {
        true
    }

    /// Metadata for one outbound call
    pub fn attach(&self) -> CallMetadata {
        CallMetadata::from_credentials(&self.credentials)
    }

    /// Wrap an encrypted channel in a Ping client that attaches the
    /// credentials to each call.
    pub fn client(self, channel: SecureChannel) -> AuthenticatedPingClient {
        PingClient::with_interceptor(channel.into_inner(), self)
    }
}

impl tonic::service::Interceptor for CredentialAttacher {
    fn call(&mut self, mut request: Request<()>) -> Result<Request<()>, Status> {
        self.attach()
            .write_grpc(request.metadata_mut())
            .map_err(|e| Status::internal(e.to_string()))?;
        Ok(request)
    }
}
