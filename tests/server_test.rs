//! Bootstrap tests: startup failures and shutdown

mod common;

use common::{test_config, TestCerts, TestServer, LOGIN, PASSWORD};
use ping_gateway::grpc::proto::PingMessage;
use ping_gateway::{server, AppError};
use std::time::Duration;

#[tokio::test]
async fn test_both_listeners_bound_on_distinct_ports() {
    let server = TestServer::start().await;
    assert_ne!(server.grpc_addr().port(), 0);
    assert_ne!(server.handle.http_addr().port(), 0);
    assert_ne!(server.grpc_addr(), server.handle.http_addr());
    server.stop().await;
}

#[tokio::test]
async fn test_missing_certificate_fails_startup() {
    let certs = TestCerts::generate();
    let mut config = test_config(&certs);
    config.tls.cert_path = "/nonexistent/server.crt".to_string();

    match server::start(&config, None).await {
        Err(AppError::CertLoad { path, .. }) => assert_eq!(path, "/nonexistent/server.crt"),
        Err(other) => panic!("expected CertLoad, got {other}"),
        Ok(_) => panic!("startup should fail without a certificate"),
    }
}

#[tokio::test]
async fn test_key_file_without_key_fails_startup() {
    let certs = TestCerts::generate();
    let mut config = test_config(&certs);
    config.tls.key_path = certs.cert_path.display().to_string();

    assert!(matches!(
        server::start(&config, None).await,
        Err(AppError::CertLoad { .. })
    ));
}

#[tokio::test]
async fn test_port_in_use_fails_startup() {
    let certs = TestCerts::generate();
    let occupied = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut config = test_config(&certs);
    config.http_port = occupied.local_addr().unwrap().port();

    match server::start(&config, None).await {
        Err(AppError::Listen { addr, .. }) => assert_eq!(addr, config.http_addr()),
        Err(other) => panic!("expected Listen, got {other}"),
        Ok(_) => panic!("startup should fail on an occupied port"),
    }
}

#[tokio::test]
async fn test_run_until_stops_both_servers() {
    let server = TestServer::start().await;
    let mut client = server.client(LOGIN, PASSWORD).await;
    client
        .say_hello(PingMessage::default())
        .await
        .unwrap();
    drop(client);

    let http_addr = server.handle.http_addr();
    let TestServer { certs: _certs, handle } = server;
    tokio::time::timeout(Duration::from_secs(10), handle.run_until(async {}))
        .await
        .unwrap()
        .unwrap();

    assert!(tokio::net::TcpStream::connect(http_addr).await.is_err());
}
