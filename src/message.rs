//! Wire message definitions
//!
//! Everything the server writes to a connection is a `ServerMessage`.
//! Its `Display` output is exactly the text put on the wire: plain
//! CRLF-terminated lines, no framing.

use std::fmt;

use chrono::{Local, NaiveTime};

/// Name used when negotiation yields nothing usable
pub const DEFAULT_NAME: &str = "Anonymous";

/// Command that ends a session without being broadcast
pub const EXIT_COMMAND: &str = "exit";

/// Erases one character on an interactive terminal
pub const ERASE_SEQUENCE: &str = "\x08 \x08";

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// Name prompt sent right after connect
    Prompt,
    /// Instructions sent once the name is resolved
    Welcome { name: String },
    /// Local echo and line-editing feedback
    Echo(String),
    /// Another participant joined
    Joined { name: String },
    /// Another participant left
    Left { name: String },
    /// Chat line from another participant
    Chat {
        at: NaiveTime,
        from: String,
        content: String,
    },
}

impl ServerMessage {
    /// Build a chat line stamped with the current local wall-clock time
    pub fn chat(from: impl Into<String>, content: impl Into<String>) -> Self {
        ServerMessage::Chat {
            at: Local::now().time(),
            from: from.into(),
            content: content.into(),
        }
    }
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::Prompt => {
                write!(f, "Welcome to the chat server!\r\nEnter your name: ")
            }
            ServerMessage::Welcome { name } => write!(
                f,
                "\r\nHello, {}! Type a message and press Enter to send it. Type '{}' to leave.\r\n",
                name, EXIT_COMMAND
            ),
            ServerMessage::Echo(text) => f.write_str(text),
            ServerMessage::Joined { name } => {
                write!(f, "\r\n>> {} has joined the chat <<\r\n", name)
            }
            ServerMessage::Left { name } => {
                write!(f, "\r\n>> {} has left the chat <<\r\n", name)
            }
            ServerMessage::Chat { at, from, content } => {
                write!(f, "\r\n[{}] {}: {}\r\n", at.format("%H:%M:%S"), from, content)
            }
        }
    }
}
