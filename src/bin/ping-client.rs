//! Command-line client for the Ping service
//!
//! Dials the gRPC endpoint over TLS, attaches the login/password to the call
//! and prints the greeting that comes back.

use anyhow::Result;
use clap::Parser;
use ping_gateway::grpc::{client, proto::PingMessage};
use ping_gateway::tls::ClientTls;
use ping_gateway::Credentials;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "ping-client", version, about = "Call SayHello on a Ping server")]
struct Cli {
    /// Server address (host:port)
    #[arg(long, default_value = "localhost:7777")]
    addr: String,

    /// CA certificate used to verify the server
    #[arg(long, default_value = "cert/server.crt")]
    ca_cert: String,

    /// Expected server name in the certificate
    #[arg(long, default_value = "localhost")]
    domain: String,

    #[arg(long, env = "PING_LOGIN", default_value = "john")]
    login: String,

    #[arg(long, env = "PING_PASSWORD", default_value = "doe", hide_env_values = true)]
    password: String,

    /// Greeting sent to the server
    #[arg(long, default_value = "Client: This is the message being sent from the client")]
    greeting: String,

    /// Per-call deadline in seconds
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ping_client=info,ping_gateway=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let tls = ClientTls::load(&cli.ca_cert, cli.domain.as_str())?
        .with_request_timeout(Duration::from_secs(cli.timeout_secs));
    let credentials = Credentials::new(cli.login, cli.password)?;

    let mut ping = client::connect(&cli.addr, &tls, credentials).await?;
    let response = ping
        .say_hello(PingMessage {
            greeting: cli.greeting,
        })
        .await?;

    info!("Response from handler: {}", response.get_ref().greeting);
    Ok(())
}
