//! wormhole controller binary
//!
//! Binds the agent-facing endpoints, opens the alias store, and hands the
//! terminal to the operator console.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wormhole_console::{AliasStore, Console};
use wormhole_controller::config::normalize_listen_addr;
use wormhole_controller::{server, ControllerConfig, ControllerState};

const ALIAS_STORE_PATH: &str = "wormhole.db";

#[derive(Parser)]
#[command(name = "controller")]
#[command(about = "wormhole command-and-control controller")]
#[command(version)]
struct Args {
    /// Address to listen on for agent connections
    #[arg(long, default_value = ":39746")]
    addr: String,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let default_filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| default_filter.into()),
        ))
        // Logs go to stderr; stdout belongs to the operator prompt.
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ControllerConfig {
        listen_addr: normalize_listen_addr(&args.addr),
        debug: args.debug,
        ..ControllerConfig::default()
    };

    let store = AliasStore::open(ALIAS_STORE_PATH)
        .with_context(|| format!("failed to open alias store {}", ALIAS_STORE_PATH))?;

    let (state, events) = ControllerState::new(config);

    let listener = tokio::net::TcpListener::bind(&state.config.listen_addr)
        .await
        .with_context(|| format!("failed to bind {}", state.config.listen_addr))?;
    tracing::info!("controller listening on {}", listener.local_addr()?);

    let server_state = Arc::clone(&state);
    tokio::spawn(async move {
        if let Err(err) = server::serve(listener, server_state).await {
            tracing::error!("server error: {}", err);
            std::process::exit(1);
        }
    });

    let console = Arc::new(Console::new(state, store, args.debug));
    console.run(events).await
}
