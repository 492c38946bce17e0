//! Dialing the Ping service

use crate::auth::Credentials;
use crate::error::Result;
use crate::grpc::interceptor::{AuthenticatedPingClient, CredentialAttacher};
use crate::tls::ClientTls;
use tracing::info;

/// Dial `addr` over TLS and return a client that authenticates every call.
///
/// Plaintext (`http://`) addresses are refused before any connection is made.
pub async fn connect(
    addr: &str,
    tls: &ClientTls,
    credentials: Credentials,
) -> Result<AuthenticatedPingClient> {
    info!(addr = %addr, domain = %tls.domain(), "Connecting to Ping service");
    let channel = tls.connect(addr).await?;
    Ok(CredentialAttacher::new(credentials).client(channel))
}
