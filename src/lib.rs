//! Multi-user TCP Chat Server Library
//!
//! A line-oriented chat server over raw TCP: every connection picks a
//! name, and each line it sends is broadcast to everyone else with a
//! timestamp.
//!
//! # Features
//! - Name negotiation with an "Anonymous" fallback
//! - Server-side echo and backspace/delete line editing
//! - Join and leave announcements
//! - Timestamped chat broadcast excluding the sender
//! - `exit` command and disconnect handling
//!
//! # Architecture
//! Uses the Actor pattern with `mpsc` channels:
//! - `ChatServer` is the single owner of the participant set
//! - `Registry` is the cloneable handle sessions use to reach it
//! - Each connection runs a `Session` task plus a writer task draining
//!   its outbound queue onto the socket
//! - No locks needed - add, remove and broadcast are serialized by the queue
//!
//! # Example
//! ```ignore
//! use tokio::net::TcpListener;
//! use tcp_chat_server::{serve, Registry, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = ServerConfig::default();
//!     let listener = TcpListener::bind(config.bind_addr()).await.unwrap();
//!     let registry = Registry::spawn(config.delivery_timeout);
//!     serve(listener, registry, config).await;
//! }
//! ```

pub mod config;
pub mod error;
pub mod handler;
pub mod line_reader;
pub mod listener;
pub mod message;
pub mod negotiate;
pub mod participant;
pub mod registry;
pub mod server;
pub mod types;

// Re-export main types for convenience
pub use config::ServerConfig;
pub use error::{AppError, SendError};
pub use handler::{handle_connection, Session, SessionState};
pub use line_reader::LineReader;
pub use listener::serve;
pub use message::ServerMessage;
pub use negotiate::negotiate_name;
pub use participant::Participant;
pub use registry::Registry;
pub use server::{ChatServer, ServerCommand};
pub use types::ParticipantId;
