//! Transport security for both ends of the gRPC channel
//!
//! [`ServerTls`] wraps the certificate/key pair the gRPC listener presents;
//! [`ClientTls`] wraps the trust root a dialer verifies it against. Both are
//! loaded once at startup and are read-only afterwards.

use crate::error::{AppError, Result};
use std::path::Path;
use std::time::Duration;
use tonic::transport::{Certificate, Channel, ClientTlsConfig, Endpoint, Identity, ServerTlsConfig};
use tracing::debug;

/// Make `ring` the process-wide rustls provider unless one is already set.
///
/// Every constructor in this module calls it before any TLS config is built.
pub fn install_crypto_provider() {
    if rustls::crypto::CryptoProvider::get_default().is_none() {
        // Losing a race to another installer is fine: a provider is set either way.
        let _ = rustls::crypto::ring::default_provider().install_default();
    }
}

const PEM_CERTIFICATE_MARKER: &str = "-----BEGIN CERTIFICATE-----";
const PEM_PRIVATE_KEY_MARKER: &str = "PRIVATE KEY-----";

fn read_pem(path: &Path, marker: &str) -> Result<Vec<u8>> {
    let pem = std::fs::read(path).map_err(|e| AppError::CertLoad {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;

    let text = String::from_utf8_lossy(&pem);
    if !text.contains(marker) {
        return Err(AppError::CertLoad {
            path: path.display().to_string(),
            reason: format!("no PEM block containing '{marker}'"),
        });
    }

    Ok(pem)
}

/// Server-side TLS identity for the gRPC listener
#[derive(Clone)]
pub struct ServerTls {
    identity: Identity,
}

impl ServerTls {
    /// Load a PEM certificate chain and its private key
    pub fn load(cert_path: impl AsRef<Path>, key_path: impl AsRef<Path>) -> Result<Self> {
        install_crypto_provider();
        let cert_pem = read_pem(cert_path.as_ref(), PEM_CERTIFICATE_MARKER)?;
        let key_pem = read_pem(key_path.as_ref(), PEM_PRIVATE_KEY_MARKER)?;
        debug!(cert = %cert_path.as_ref().display(), "Loaded server TLS identity");

        Ok(Self {
            identity: Identity::from_pem(cert_pem, key_pem),
        })
    }

    pub fn config(&self) -> ServerTlsConfig {
        ServerTlsConfig::new().identity(self.identity.clone())
    }
}

/// Client-side TLS trust root used when dialing the gRPC listener
#[derive(Clone)]
pub struct ClientTls {
    ca_certificate: Certificate,
    domain: String,
    connect_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
}

impl ClientTls {
    /// Load the PEM certificate the server must chain to.
    ///
    /// `domain` is the name verified against the server certificate, which
    /// is independent of the address dialed.
    pub fn load(ca_cert_path: impl AsRef<Path>, domain: impl Into<String>) -> Result<Self> {
        install_crypto_provider();
        let ca_pem = read_pem(ca_cert_path.as_ref(), PEM_CERTIFICATE_MARKER)?;
        debug!(ca = %ca_cert_path.as_ref().display(), "Loaded client TLS trust root");

        Ok(Self {
            ca_certificate: Certificate::from_pem(ca_pem),
            domain: domain.into(),
            connect_timeout: None,
            request_timeout: None,
        })
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn config(&self) -> ClientTlsConfig {
        ClientTlsConfig::new()
            .ca_certificate(self.ca_certificate.clone())
            .domain_name(self.domain.clone())
    }

    /// Build an `https` endpoint for `addr` (`host:port` or a full URI)
    pub fn endpoint(&self, addr: &str) -> Result<Endpoint> {
        let uri = if addr.contains("://") {
            addr.to_string()
        } else {
            format!("https://{addr}")
        };

        if !uri.starts_with("https://") {
            return Err(AppError::InsecureTransport(uri));
        }

        let mut endpoint = Endpoint::from_shared(uri.clone())
            .map_err(|e| AppError::Config(format!("Invalid endpoint '{uri}': {e}")))?
            .tls_config(self.config())
            .map_err(|e| AppError::Config(format!("TLS config error for '{uri}': {e}")))?;

        if let Some(timeout) = self.connect_timeout {
            endpoint = endpoint.connect_timeout(timeout);
        }
        if let Some(timeout) = self.request_timeout {
            endpoint = endpoint.timeout(timeout);
        }

        Ok(endpoint)
    }

    /// Dial `addr` now, failing if the server is unreachable or the
    /// handshake is rejected.
    pub async fn connect(&self, addr: &str) -> Result<SecureChannel> {
        let channel = self
            .endpoint(addr)?
            .connect()
            .await
            .map_err(|e| AppError::Internal(anyhow::anyhow!("failed to connect to {addr}: {e}")))?;
        Ok(SecureChannel(channel))
    }

    /// Create a channel that dials on first use.
    ///
    /// Connection failures surface on the individual calls made through the
    /// channel rather than here.
    pub fn connect_lazy(&self, addr: &str) -> Result<SecureChannel> {
        Ok(SecureChannel(self.endpoint(addr)?.connect_lazy()))
    }
}

/// A gRPC channel that is guaranteed to run over TLS
///
/// Only [`ClientTls`] can construct one. The underlying [`Channel`]
/// multiplexes concurrent calls, so cloning is cheap and needs no locking.
#[derive(Clone, Debug)]
pub struct SecureChannel(Channel);

impl SecureChannel {
    pub fn into_inner(self) -> Channel {
        self.0
    }
}
