//! Server bootstrap
//!
//! [`start`] loads the TLS material, binds both listeners and spawns the
//! gRPC server and the HTTP gateway as two independent tasks. They share
//! nothing but read-only TLS material and a shutdown signal.
//!
//! # Shutdown
//!
//! Both tasks watch a `tokio::sync::watch` channel. [`ServerHandle::run_until`]
//! flips it once its signal future resolves and then waits for both tasks to
//! drain their in-flight requests.

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::gateway::{self, GatewayState};
use crate::grpc::interceptor::{authenticated_service, AuthInterceptor};
use crate::grpc::PingService;
use crate::tls::{ClientTls, ServerTls};
use anyhow::Context;
use metrics_exporter_prometheus::PrometheusHandle;
use std::future::Future;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server as TonicServer;
use tracing::{error, info};

/// Returns a future that resolves when the shutdown watch fires.
async fn wait_for_shutdown(mut rx: watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            break;
        }
        if rx.changed().await.is_err() {
            break;
        }
    }
}

async fn bind(addr: &str) -> Result<TcpListener> {
    TcpListener::bind(addr).await.map_err(|source| AppError::Listen {
        addr: addr.to_string(),
        source,
    })
}

fn local_addr(listener: &TcpListener, addr: &str) -> Result<SocketAddr> {
    listener.local_addr().map_err(|source| AppError::Listen {
        addr: addr.to_string(),
        source,
    })
}

/// Running gRPC server and gateway
pub struct ServerHandle {
    grpc_addr: SocketAddr,
    http_addr: SocketAddr,
    shutdown: watch::Sender<bool>,
    grpc: JoinHandle<Result<()>>,
    gateway: JoinHandle<Result<()>>,
}

impl ServerHandle {
    /// Address the gRPC listener is bound to
    pub fn grpc_addr(&self) -> SocketAddr {
        self.grpc_addr
    }

    /// Address the HTTP gateway is bound to
    pub fn http_addr(&self) -> SocketAddr {
        self.http_addr
    }

    /// Serve until `signal` resolves or either server fails.
    ///
    /// A failure of either task is returned as-is; the other task is not
    /// restarted or supervised.
    pub async fn run_until<F>(self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let ServerHandle {
            shutdown,
            grpc,
            gateway,
            ..
        } = self;

        let serving = async {
            tokio::try_join!(join_task("gRPC", grpc), join_task("gateway", gateway))
                .map(|_| ())
        };
        tokio::pin!(serving);

        tokio::select! {
            result = &mut serving => return result,
            _ = signal => info!("Shutdown signal received"),
        }

        let _ = shutdown.send(true);
        serving.await
    }

    /// Stop both servers and wait for them to finish.
    pub async fn shutdown(self) -> Result<()> {
        self.run_until(std::future::ready(())).await
    }
}

async fn join_task(name: &str, handle: JoinHandle<Result<()>>) -> Result<()> {
    let result = handle
        .await
        .with_context(|| format!("{name} server task panicked"))?;
    if let Err(e) = &result {
        error!("{} server failed: {}", name, e);
    }
    result
}

/// Load TLS material, bind both listeners and start serving.
///
/// Every startup failure (unreadable certificate, port in use) is returned
/// before either server accepts a connection.
pub async fn start(config: &Config, prometheus: Option<PrometheusHandle>) -> Result<ServerHandle> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // gRPC listener
    let server_tls = ServerTls::load(&config.tls.cert_path, &config.tls.key_path)?;
    let grpc_listener = bind(&config.grpc_addr()).await?;
    let grpc_addr = local_addr(&grpc_listener, &config.grpc_addr())?;

    let mut builder = TonicServer::builder()
        .tls_config(server_tls.config())
        .map_err(|e| AppError::CertLoad {
            path: config.tls.cert_path.clone(),
            reason: format!("TLS configuration error: {e}"),
        })?;
    let interceptor = AuthInterceptor::new(config.auth.credentials.clone());
    let router = builder.add_service(authenticated_service(PingService::new(), interceptor));

    // Gateway listener; it dials the backend lazily, so the gRPC listener
    // does not have to be accepting yet.
    let backend_addr = config
        .gateway
        .backend_addr
        .clone()
        .unwrap_or_else(|| grpc_addr.to_string());
    let client_tls = ClientTls::load(config.gateway_ca_cert_path(), &config.gateway.tls_domain)?
        .with_request_timeout(config.gateway.request_timeout);
    let backend = client_tls.connect_lazy(&backend_addr)?;

    let mut state = GatewayState::new(backend).with_request_timeout(config.gateway.request_timeout);
    if let Some(handle) = prometheus {
        state = state.with_prometheus(handle);
    }
    let app = gateway::router(state);

    let http_listener = bind(&config.http_addr()).await?;
    let http_addr = local_addr(&http_listener, &config.http_addr())?;

    let grpc_shutdown = shutdown_rx.clone();
    let grpc = tokio::spawn(async move {
        info!("Starting HTTP/2 gRPC server on {}", grpc_addr);
        router
            .serve_with_incoming_shutdown(
                TcpListenerStream::new(grpc_listener),
                wait_for_shutdown(grpc_shutdown),
            )
            .await
            .context("gRPC server error")?;
        info!("gRPC server stopped");
        Ok::<(), AppError>(())
    });

    let gateway = tokio::spawn(async move {
        info!(
            "Starting HTTP/1.1 gateway on {} (backend: {})",
            http_addr, backend_addr
        );
        axum::serve(http_listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown_rx))
            .await
            .context("gateway server error")?;
        info!("Gateway stopped");
        Ok::<(), AppError>(())
    });

    Ok(ServerHandle {
        grpc_addr,
        http_addr,
        shutdown: shutdown_tx,
        grpc,
        gateway,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_wait_for_shutdown_observes_signal() {
        let (tx, rx) = watch::channel(false);
        let waiter = tokio::spawn(wait_for_shutdown(rx));

        tx.send(true).unwrap();
        tokio::time::timeout(std::time::Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_when_sender_dropped() {
        let (tx, rx) = watch::channel(false);
        drop(tx);
        tokio::time::timeout(std::time::Duration::from_secs(1), wait_for_shutdown(rx))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_bind_failure_is_listen_error() {
        let occupied = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = occupied.local_addr().unwrap().to_string();

        match bind(&addr).await {
            Err(AppError::Listen { addr: reported, .. }) => assert_eq!(reported, addr),
            other => panic!("expected listen error, got {:?}", other.map(|_| ())),
        }
    }
}
