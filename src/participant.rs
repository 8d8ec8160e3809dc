//! Participant struct definition
//!
//! Represents a named, registered connection and its outbound channel.

use std::time::Duration;

use tokio::sync::mpsc;

use crate::error::SendError;
use crate::message::ServerMessage;
use crate::types::ParticipantId;

/// Registered chat participant
///
/// Owned by the registry from registration until removal. The sender feeds
/// the connection's writer task; the registry never touches the socket.
#[derive(Debug)]
pub struct Participant {
    /// Identity of the underlying connection
    pub id: ParticipantId,
    /// Display name resolved during negotiation
    pub name: String,
    /// Server → Client message channel
    pub sender: mpsc::Sender<ServerMessage>,
}

impl Participant {
    /// Create a new participant
    pub fn new(id: ParticipantId, name: impl Into<String>, sender: mpsc::Sender<ServerMessage>) -> Self {
        Self {
            id,
            name: name.into(),
            sender,
        }
    }

    /// Queue a message for this participant
    ///
    /// Waits at most `timeout` for room in the queue.
    pub async fn send(&self, msg: ServerMessage, timeout: Duration) -> Result<(), SendError> {
        self.sender
            .send_timeout(msg, timeout)
            .await
            .map_err(|e| match e {
                mpsc::error::SendTimeoutError::Timeout(_) => SendError::Timeout,
                mpsc::error::SendTimeoutError::Closed(_) => SendError::ChannelClosed,
            })
    }
}
