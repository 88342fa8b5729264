//! WebSocket server binary.
//!
//! Binds the configured listener, accepts connections, and drives each
//! through handshake negotiation and the session teardown protocol.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use websocket_server::config::{self, ServerConfig};
use websocket_server::lifecycle::shutdown::{self, Shutdown};
use websocket_server::net::conn::handle_connection;
use websocket_server::net::Listener;
use websocket_server::observability::logging;
use websocket_server::session::SessionTable;

#[derive(Debug, Parser)]
#[command(name = "websocket-server", about = "WebSocket handshake and session server")]
struct Args {
    /// Path to a TOML configuration file. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => config::load_config(path)?,
        None => ServerConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        "Configuration loaded"
    );

    let listener = Listener::bind(&config.listener).await?;
    let config = Arc::new(config);
    let table = Arc::new(SessionTable::new());

    let shutdown = Shutdown::new();
    let mut shutdown_rx = shutdown.subscribe();
    tokio::spawn(async move {
        shutdown::wait_for_signal().await;
        tracing::info!("Interrupt received, shutting down");
        shutdown.trigger();
    });

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer, permit) = accepted?;
                let config = Arc::clone(&config);
                let table = Arc::clone(&table);
                tokio::spawn(async move {
                    handle_connection(stream, peer, config, table).await;
                    drop(permit);
                });
            }
            _ = shutdown_rx.recv() => break,
        }
    }

    // Stop admitting jobs on every live session, then drop the table in
    // one pass.
    for session in table.all() {
        session.begin_disconnect();
    }
    table.delete_all();

    tracing::info!("Shutdown complete");
    Ok(())
}
