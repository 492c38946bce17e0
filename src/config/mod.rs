//! Configuration management for Ping Gateway

use crate::auth::Credentials;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// gRPC server host
    pub grpc_host: String,
    /// gRPC server port
    pub grpc_port: u16,
    /// HTTP gateway host
    pub http_host: String,
    /// HTTP gateway port
    pub http_port: u16,
    /// TLS material for the gRPC listener
    pub tls: TlsConfig,
    /// Gateway backend configuration
    pub gateway: GatewayConfig,
    /// Expected login/password
    pub auth: AuthConfig,
    /// Logging and metrics
    pub telemetry: TelemetryConfig,
}

#[derive(Debug, Clone)]
pub struct TlsConfig {
    pub cert_path: String,
    pub key_path: String,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// gRPC address the gateway dials; `None` means the local gRPC listener
    pub backend_addr: Option<String>,
    /// Trust root for the backend certificate; `None` means `tls.cert_path`
    pub ca_cert_path: Option<String>,
    /// Server name verified against the backend certificate
    pub tls_domain: String,
    /// Deadline for each forwarded call
    pub request_timeout: Duration,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend_addr: None,
            ca_cert_path: None,
            tls_domain: "localhost".to_string(),
            request_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub credentials: Credentials,
}

#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// "pretty" or "json"
    pub log_format: String,
    /// Install the Prometheus recorder and expose `/metrics`
    pub metrics_enabled: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_format: "pretty".to_string(),
            metrics_enabled: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let cert_path =
            env::var("TLS_CERT_PATH").unwrap_or_else(|_| "cert/server.crt".to_string());

        Ok(Self {
            grpc_host: env::var("GRPC_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            grpc_port: env::var("GRPC_PORT")
                .unwrap_or_else(|_| "7777".to_string())
                .parse()
                .context("Invalid GRPC_PORT")?,
            http_host: env::var("HTTP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            http_port: env::var("HTTP_PORT")
                .unwrap_or_else(|_| "7778".to_string())
                .parse()
                .context("Invalid HTTP_PORT")?,
            tls: TlsConfig {
                cert_path,
                key_path: env::var("TLS_KEY_PATH")
                    .unwrap_or_else(|_| "cert/server.key".to_string()),
            },
            gateway: GatewayConfig {
                backend_addr: env::var("GATEWAY_BACKEND_ADDR").ok(),
                ca_cert_path: env::var("GATEWAY_CA_CERT_PATH").ok(),
                tls_domain: env::var("GATEWAY_TLS_DOMAIN")
                    .unwrap_or_else(|_| "localhost".to_string()),
                request_timeout: Duration::from_secs(
                    env::var("GATEWAY_REQUEST_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "10".to_string())
                        .parse()
                        .context("Invalid GATEWAY_REQUEST_TIMEOUT_SECS")?,
                ),
            },
            auth: AuthConfig {
                credentials: Credentials::new(
                    env::var("AUTH_LOGIN").context("AUTH_LOGIN is required")?,
                    env::var("AUTH_PASSWORD").context("AUTH_PASSWORD is required")?,
                )?,
            },
            telemetry: TelemetryConfig {
                log_format: env::var("LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string()),
                metrics_enabled: env::var("METRICS_ENABLED")
                    .map(|s| s.to_lowercase() == "true")
                    .unwrap_or(false),
            },
        })
    }

    pub fn grpc_addr(&self) -> String {
        format!("{}:{}", self.grpc_host, self.grpc_port)
    }

    pub fn http_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    /// Trust root the gateway uses for its backend channel
    pub fn gateway_ca_cert_path(&self) -> &str {
        self.gateway
            .ca_cert_path
            .as_deref()
            .unwrap_or(&self.tls.cert_path)
    }
}
