//! Message relay service binary

use anyhow::Result;
use clap::Parser;
use msg_relay::MessageStore;
use msg_relay_svc::{serve, spawn_cleanup, AppState};
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Message relay service CLI arguments
#[derive(Parser, Debug)]
#[command(name = "msg-relay-svc")]
#[command(about = "Message relay service for MPC sessions")]
struct Args {
    /// Listen host
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0")]
    host: String,

    /// Listen port
    #[arg(short, long, env = "RELAY_PORT", default_value_t = 8080)]
    port: u16,

    /// Seconds an untaken message is kept
    #[arg(long, env = "RELAY_MESSAGE_TTL_SECS", default_value_t = 3600)]
    message_ttl_secs: i64,

    /// Emit JSON logs
    #[arg(long, env = "RELAY_LOG_JSON", default_value_t = false)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if args.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    anyhow::ensure!(args.message_ttl_secs > 0, "message TTL must be positive");

    info!(
        host = %args.host,
        port = args.port,
        ttl = args.message_ttl_secs,
        "Starting message relay service"
    );

    let state = AppState::new(MessageStore::new(args.message_ttl_secs));
    let sweep = Duration::from_secs(args.message_ttl_secs.clamp(1, 60) as u64);
    let _cleanup = spawn_cleanup(state.store.clone(), sweep);

    let listener = tokio::net::TcpListener::bind((args.host.as_str(), args.port)).await?;
    info!(address = %listener.local_addr()?, "Listening");

    serve(listener, state).await?;

    Ok(())
}
