//! ChatServer Actor implementation
//!
//! The single owner of the participant set. Every add, remove and broadcast
//! is a command on one queue, so the actor applies them one at a time in
//! arrival order. A broadcast's recipient set is the membership at the
//! moment the command is handled, and nothing joins or leaves mid fan-out.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::message::ServerMessage;
use crate::participant::Participant;
use crate::types::ParticipantId;

/// Commands sent from sessions to the ChatServer actor
#[derive(Debug)]
pub enum ServerCommand {
    /// Register a participant; acknowledged once inserted
    Add {
        participant: Participant,
        ack: oneshot::Sender<()>,
    },
    /// Deregister a participant; replies whether it was present
    Remove {
        participant_id: ParticipantId,
        ack: oneshot::Sender<bool>,
    },
    /// Deliver a message to everyone except `exclude`
    Broadcast {
        message: ServerMessage,
        exclude: Option<ParticipantId>,
    },
    /// Snapshot of current membership
    Members {
        reply: oneshot::Sender<Vec<(ParticipantId, String)>>,
    },
}

/// The main ChatServer actor
pub struct ChatServer {
    /// All registered participants: ParticipantId -> Participant
    participants: HashMap<ParticipantId, Participant>,
    /// Upper bound on waiting for one recipient's queue
    delivery_timeout: Duration,
    /// Command receiver channel
    receiver: mpsc::Receiver<ServerCommand>,
}

impl ChatServer {
    /// Create a new ChatServer with the given command receiver
    pub fn new(receiver: mpsc::Receiver<ServerCommand>, delivery_timeout: Duration) -> Self {
        Self {
            participants: HashMap::new(),
            delivery_timeout,
            receiver,
        }
    }

    /// Run the ChatServer event loop
    ///
    /// Continuously receives and processes commands until all senders are dropped.
    pub async fn run(mut self) {
        info!("ChatServer started");

        while let Some(cmd) = self.receiver.recv().await {
            self.handle_command(cmd).await;
        }

        info!("ChatServer shutting down");
    }

    /// Process a single command
    async fn handle_command(&mut self, cmd: ServerCommand) {
        match cmd {
            ServerCommand::Add { participant, ack } => {
                self.handle_add(participant);
                let _ = ack.send(());
            }
            ServerCommand::Remove {
                participant_id,
                ack,
            } => {
                let removed = self.handle_remove(participant_id);
                let _ = ack.send(removed);
            }
            ServerCommand::Broadcast { message, exclude } => {
                self.handle_broadcast(message, exclude).await;
            }
            ServerCommand::Members { reply } => {
                let members = self
                    .participants
                    .values()
                    .map(|p| (p.id, p.name.clone()))
                    .collect();
                let _ = reply.send(members);
            }
        }
    }

    fn handle_add(&mut self, participant: Participant) {
        info!("Participant {} registered as '{}'", participant.id, participant.name);
        if let Some(old) = self.participants.insert(participant.id, participant) {
            warn!("Participant {} was already registered, replaced", old.id);
        }
        debug!("Total participants: {}", self.participants.len());
    }

    fn handle_remove(&mut self, participant_id: ParticipantId) -> bool {
        match self.participants.remove(&participant_id) {
            Some(p) => {
                info!("Participant {} ('{}') deregistered", p.id, p.name);
                debug!("Total participants: {}", self.participants.len());
                true
            }
            None => {
                debug!("Participant {} not registered, nothing to remove", participant_id);
                false
            }
        }
    }

    /// Fan a message out to every participant but `exclude`
    ///
    /// Best effort: a failed recipient is skipped. Its own session notices
    /// the dead connection on its next read.
    async fn handle_broadcast(&self, message: ServerMessage, exclude: Option<ParticipantId>) {
        let mut delivered = 0usize;

        for participant in self.participants.values() {
            if Some(participant.id) == exclude {
                continue;
            }

            match participant.send(message.clone(), self.delivery_timeout).await {
                Ok(()) => delivered += 1,
                Err(e) => debug!("Skipping delivery to {}: {}", participant.id, e),
            }
        }

        debug!("Broadcast delivered to {} participant(s)", delivered);
    }
}
