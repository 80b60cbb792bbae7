//! Relay server binary
//!
//! Run with: rtc-relay [--bind ADDR] [--environment PRODUCTION]
//!
//! Open `/room/create` in a browser to start a room. The room's stream link
//! gives receive-only access to the same media.

use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use rtc_relay::rtc::{Environment, TurnCredentials};
use rtc_relay::{RelayServer, RetryPolicy, ServerConfig};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "rtc-relay", version, about = "Multi-party WebRTC relay")]
struct Cli {
    /// Address to listen on
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Deployment mode; PRODUCTION routes media through the relay service
    #[arg(long, env = "ENVIRONMENT", default_value = "DEVELOPMENT")]
    environment: Environment,

    /// Maximum concurrent signaling sessions (0 = unlimited)
    #[arg(long, env = "MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// STUN URL of the relay service
    #[arg(long, env = "STUN_URL", default_value = "stun:turn.localhost:3478")]
    stun_url: String,

    /// TURN URL of the relay service
    #[arg(long, env = "TURN_URL", default_value = "turn:turn.localhost:3478")]
    turn_url: String,

    #[arg(long, env = "TURN_USERNAME", default_value = "amit")]
    turn_username: String,

    #[arg(long, env = "TURN_CREDENTIAL", default_value = "amrutiya", hide_env_values = true)]
    turn_credential: String,

    /// Seconds between deferred renegotiation attempts
    #[arg(long, default_value_t = 3)]
    retry_cooldown: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rtc_relay=debug")),
        )
        .init();

    let cli = Cli::parse();

    let config = ServerConfig::from_env()
        .bind(cli.bind)
        .environment(cli.environment)
        .max_connections(cli.max_connections)
        .turn(TurnCredentials {
            stun_url: cli.stun_url,
            turn_url: cli.turn_url,
            username: cli.turn_username,
            credential: cli.turn_credential,
        })
        .retry_policy(RetryPolicy::default().cooldown(Duration::from_secs(cli.retry_cooldown)));

    let server = RelayServer::new(config)?;

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
