//! Common test utilities
//!
//! Every test gets its own throwaway CA, a `localhost` leaf certificate
//! signed by it, and servers bound to port 0.

#![allow(dead_code)]

use ping_gateway::config::{AuthConfig, Config, GatewayConfig, TelemetryConfig, TlsConfig};
use ping_gateway::grpc::proto::ping_client::PingClient;
use ping_gateway::grpc::proto::ping_server::Ping;
use ping_gateway::grpc::proto::PingMessage;
use ping_gateway::grpc::{
    authenticated_service, client, AuthInterceptor, AuthenticatedPingClient, ClientIdentity,
};
use ping_gateway::server::{self, ServerHandle};
use ping_gateway::tls::{ClientTls, ServerTls};
use ping_gateway::Credentials;
use rcgen::{BasicConstraints, CertificateParams, DnType, IsCa, KeyPair};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Channel;
use tonic::{Request, Response, Status};

pub const LOGIN: &str = "john";
pub const PASSWORD: &str = "doe";

/// CA plus a `localhost` server certificate written to a temp directory
pub struct TestCerts {
    _dir: TempDir,
    pub ca_path: PathBuf,
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

impl TestCerts {
    pub fn generate() -> Self {
        let dir = tempfile::tempdir().unwrap();

        let mut ca_params = CertificateParams::new(Vec::<String>::new()).unwrap();
        ca_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        ca_params
            .distinguished_name
            .push(DnType::CommonName, "Ping Test CA");
        let ca_key = KeyPair::generate().unwrap();
        let ca_cert = ca_params.self_signed(&ca_key).unwrap();

        let mut leaf_params = CertificateParams::new(vec!["localhost".to_string()]).unwrap();
        leaf_params
            .distinguished_name
            .push(DnType::CommonName, "localhost");
        let leaf_key = KeyPair::generate().unwrap();
        let leaf_cert = leaf_params.signed_by(&leaf_key, &ca_cert, &ca_key).unwrap();

        let ca_path = dir.path().join("ca.crt");
        let cert_path = dir.path().join("server.crt");
        let key_path = dir.path().join("server.key");
        std::fs::write(&ca_path, ca_cert.pem()).unwrap();
        std::fs::write(&cert_path, leaf_cert.pem()).unwrap();
        std::fs::write(&key_path, leaf_key.serialize_pem()).unwrap();

        Self {
            _dir: dir,
            ca_path,
            cert_path,
            key_path,
        }
    }

    pub fn client_tls(&self) -> ClientTls {
        ClientTls::load(&self.ca_path, "localhost")
            .unwrap()
            .with_connect_timeout(Duration::from_secs(5))
    }
}

/// Config with both listeners on ephemeral ports
pub fn test_config(certs: &TestCerts) -> Config {
    Config {
        grpc_host: "127.0.0.1".to_string(),
        grpc_port: 0,
        http_host: "127.0.0.1".to_string(),
        http_port: 0,
        tls: TlsConfig {
            cert_path: certs.cert_path.display().to_string(),
            key_path: certs.key_path.display().to_string(),
        },
        gateway: GatewayConfig {
            ca_cert_path: Some(certs.ca_path.display().to_string()),
            request_timeout: Duration::from_secs(5),
            ..GatewayConfig::default()
        },
        auth: AuthConfig {
            credentials: Credentials::new(LOGIN, PASSWORD).unwrap(),
        },
        telemetry: TelemetryConfig::default(),
    }
}

/// Running servers plus the material needed to talk to them
pub struct TestServer {
    pub certs: TestCerts,
    pub handle: ServerHandle,
}

impl TestServer {
    pub async fn start() -> Self {
        let certs = TestCerts::generate();
        let config = test_config(&certs);
        Self::start_with(certs, config).await
    }

    pub async fn start_with(certs: TestCerts, config: Config) -> Self {
        let handle = server::start(&config, None).await.unwrap();
        Self { certs, handle }
    }

    pub fn grpc_addr(&self) -> SocketAddr {
        self.handle.grpc_addr()
    }

    pub fn gateway_url(&self, path: &str) -> String {
        format!("http://{}{}", self.handle.http_addr(), path)
    }

    /// Client that attaches `login`/`password` to every call
    pub async fn client(&self, login: &str, password: &str) -> AuthenticatedPingClient {
        client::connect(
            &self.grpc_addr().to_string(),
            &self.certs.client_tls(),
            Credentials::new(login, password).unwrap(),
        )
        .await
        .unwrap()
    }

    /// TLS client that sends no credentials at all
    pub async fn bare_client(&self) -> PingClient<Channel> {
        let channel = self
            .certs
            .client_tls()
            .connect(&self.grpc_addr().to_string())
            .await
            .unwrap();
        PingClient::new(channel.into_inner())
    }

    pub async fn stop(self) {
        self.handle.shutdown().await.unwrap();
    }
}

/// An address nothing is listening on
pub async fn closed_port() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Ping handler that only counts how often it runs and echoes the greeting
#[derive(Clone, Default)]
pub struct CountingPing {
    calls: Arc<AtomicUsize>,
}

impl CountingPing {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[tonic::async_trait]
impl Ping for CountingPing {
    async fn say_hello(
        &self,
        request: Request<PingMessage>,
    ) -> Result<Response<PingMessage>, Status> {
        assert_eq!(
            request.extensions().get::<ClientIdentity>(),
            Some(&ClientIdentity::authenticated())
        );
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Response::new(request.into_inner()))
    }
}

/// Serve `service` behind the auth gate over TLS; send on the returned
/// sender to stop it.
pub async fn serve_counting(
    certs: &TestCerts,
    service: CountingPing,
) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let tls = ServerTls::load(&certs.cert_path, &certs.key_path).unwrap();
    let interceptor = AuthInterceptor::new(Credentials::new(LOGIN, PASSWORD).unwrap());
    let (tx, rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        tonic::transport::Server::builder()
            .tls_config(tls.config())
            .unwrap()
            .add_service(authenticated_service(service, interceptor))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async {
                let _ = rx.await;
            })
            .await
            .unwrap();
    });

    (addr, tx)
}
