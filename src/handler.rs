//! TCP connection handler
//!
//! Handles individual client connections: name negotiation, registration,
//! the chat loop and departure, plus the writer task that owns the socket's
//! write half.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::AppError;
use crate::line_reader::LineReader;
use crate::message::{ServerMessage, EXIT_COMMAND};
use crate::negotiate::negotiate_name;
use crate::participant::Participant;
use crate::registry::Registry;
use crate::types::ParticipantId;

/// Lifecycle of one connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Negotiating,
    Registered,
    Active,
    Closing,
    Closed,
}

/// Per-connection control flow
///
/// Transport errors end the session quietly; only a broken registry is
/// reported as an error.
pub struct Session<R> {
    id: ParticipantId,
    reader: LineReader<R>,
    registry: Registry,
    state: SessionState,
}

impl<R: AsyncRead + Unpin> Session<R> {
    pub fn new(id: ParticipantId, reader: LineReader<R>, registry: Registry) -> Self {
        Self {
            id,
            reader,
            registry,
            state: SessionState::Negotiating,
        }
    }

    /// Drive the session to `Closed`
    pub async fn run(mut self) -> Result<(), AppError> {
        let name = negotiate_name(&mut self.reader).await;
        self.transition(SessionState::Registered);

        self.register(&name).await?;
        self.transition(SessionState::Active);

        self.chat(&name).await?;
        self.transition(SessionState::Closing);

        self.close(&name).await
    }

    /// Welcome the participant, then insert it before announcing it
    async fn register(&mut self, name: &str) -> Result<(), AppError> {
        let outbound = self.reader.outbound().clone();
        let _ = outbound
            .send(ServerMessage::Welcome {
                name: name.to_string(),
            })
            .await;

        self.registry
            .add(Participant::new(self.id, name, outbound))
            .await?;
        self.registry
            .broadcast(
                ServerMessage::Joined {
                    name: name.to_string(),
                },
                Some(self.id),
            )
            .await
    }

    /// Broadcast lines until `exit` or end of stream
    async fn chat(&mut self, name: &str) -> Result<(), AppError> {
        while let Some(line) = self.reader.next_line().await {
            if line == EXIT_COMMAND {
                debug!("Participant {} sent exit", self.id);
                return Ok(());
            }

            debug!("{}: {}", name, line);
            self.registry
                .broadcast(ServerMessage::chat(name, line), Some(self.id))
                .await?;
        }

        debug!("Participant {} disconnected", self.id);
        Ok(())
    }

    /// Drop the transport, deregister and announce the departure
    async fn close(self, name: &str) -> Result<(), AppError> {
        let Session {
            id,
            reader,
            registry,
            ..
        } = self;

        // Releases the read half and this session's outbound sender
        drop(reader);

        registry.remove(id).await?;
        registry
            .broadcast(
                ServerMessage::Left {
                    name: name.to_string(),
                },
                Some(id),
            )
            .await?;

        debug!("Session {}: {:?} -> {:?}", id, SessionState::Closing, SessionState::Closed);
        Ok(())
    }

    fn transition(&mut self, next: SessionState) {
        debug!("Session {}: {:?} -> {:?}", self.id, self.state, next);
        self.state = next;
    }
}

/// Drain a connection's outbound queue onto its socket
///
/// Ends when every sender is gone (the session closed and the registry
/// removed the participant), then shuts the socket down.
pub async fn write_loop<W: AsyncWrite + Unpin>(
    mut writer: W,
    mut rx: mpsc::Receiver<ServerMessage>,
) -> std::io::Result<()> {
    while let Some(msg) = rx.recv().await {
        writer.write_all(msg.to_string().as_bytes()).await?;
    }
    writer.shutdown().await
}

/// Wait up to `limit` for the writer to flush, then force the socket shut
///
/// A peer that stops reading leaves `write_all` pending forever; aborting
/// the task drops the write half, which closes the connection.
pub async fn finish_writer(
    mut writer: JoinHandle<std::io::Result<()>>,
    limit: Duration,
    id: ParticipantId,
) {
    match tokio::time::timeout(limit, &mut writer).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => debug!("Write failed for {}: {}", id, e),
        Ok(Err(e)) => warn!("Writer task for {} failed: {}", id, e),
        Err(_) => {
            debug!("Writer for {} still blocked after {:?}, aborting", id, limit);
            writer.abort();
        }
    }
}

/// Handle a new TCP connection
///
/// Spawns the writer task, runs the session, then gives the writer
/// `close_timeout` to flush before the socket is closed regardless.
pub async fn handle_connection(
    stream: TcpStream,
    registry: Registry,
    config: &ServerConfig,
) -> Result<(), AppError> {
    let peer_addr = stream
        .peer_addr()
        .map(|a| a.to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    let id = ParticipantId::new();
    info!("Connection {} from {}", id, peer_addr);

    let (read_half, write_half) = stream.into_split();
    let (msg_tx, msg_rx) = mpsc::channel(config.outbound_buffer);
    let writer = tokio::spawn(write_loop(write_half, msg_rx));

    let result = Session::new(id, LineReader::new(read_half, msg_tx), registry)
        .run()
        .await;

    finish_writer(writer, config.close_timeout, id).await;

    info!("Connection {} closed", id);
    result
}
