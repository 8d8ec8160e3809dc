//! TCP Chat Server - Entry Point
//!
//! Starts the TCP listener and the registry actor, then accepts connections.

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tcp_chat_server::{serve, Registry, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=tcp_chat_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("tcp_chat_server=info")),
        )
        .init();

    // Port from the first argument, then CHAT_PORT, then the default
    let config = ServerConfig::from_env()?;
    let addr = config.bind_addr();

    let listener = TcpListener::bind(addr).await?;
    info!("Chat server listening on {}", addr);

    let registry = Registry::spawn(config.delivery_timeout);
    info!("ChatServer actor started");

    serve(listener, registry, config).await;
    Ok(())
}
