//! Error types for the chat server
//!
//! Defines application-level errors and per-participant delivery errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Every variant is local to one connection or to startup; none of them
/// is ever reported to other participants.
#[derive(Debug, Error)]
pub enum AppError {
    /// IO error (fatal for the connection or listener that hit it)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Registry actor is gone (internal channel broken)
    #[error("Channel send error")]
    ChannelSend,

    /// Listening port could not be parsed
    #[error("Invalid port: {0}")]
    InvalidPort(String),
}

/// Message send errors
///
/// Occurs when delivering to a participant's outbound queue fails.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    /// The receiving end of the channel has been closed
    #[error("Channel closed")]
    ChannelClosed,

    /// The participant's queue stayed full for the whole delivery timeout
    #[error("Delivery timed out")]
    Timeout,
}
