//! Participant registry handle
//!
//! `Registry` is the cloneable front door to the `ChatServer` actor. The
//! accept loop and every session hold their own clone; there is no global
//! state, so independent registries can coexist (tests rely on that).

use std::time::Duration;

use tokio::sync::{mpsc, oneshot};

use crate::error::AppError;
use crate::message::ServerMessage;
use crate::participant::Participant;
use crate::server::{ChatServer, ServerCommand};
use crate::types::ParticipantId;

/// Channel buffer size for registry commands
pub const COMMAND_BUFFER_SIZE: usize = 256;

/// Handle to the shared set of active participants
#[derive(Debug, Clone)]
pub struct Registry {
    cmd_tx: mpsc::Sender<ServerCommand>,
}

impl Registry {
    /// Wrap an existing command channel
    pub fn new(cmd_tx: mpsc::Sender<ServerCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Start a `ChatServer` actor and return a handle to it
    pub fn spawn(delivery_timeout: Duration) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_BUFFER_SIZE);
        tokio::spawn(ChatServer::new(cmd_rx, delivery_timeout).run());
        Self::new(cmd_tx)
    }

    /// Register a participant
    ///
    /// Returns once the participant is visible to subsequent broadcasts.
    pub async fn add(&self, participant: Participant) -> Result<(), AppError> {
        let (ack, done) = oneshot::channel();
        self.command(ServerCommand::Add { participant, ack }).await?;
        done.await.map_err(|_| AppError::ChannelSend)
    }

    /// Deregister a participant
    ///
    /// Idempotent: returns `false` if the id was not registered. Once this
    /// returns, no later broadcast reaches the removed participant.
    pub async fn remove(&self, participant_id: ParticipantId) -> Result<bool, AppError> {
        let (ack, done) = oneshot::channel();
        self.command(ServerCommand::Remove {
            participant_id,
            ack,
        })
        .await?;
        done.await.map_err(|_| AppError::ChannelSend)
    }

    /// Deliver `message` to every registered participant except `exclude`
    pub async fn broadcast(
        &self,
        message: ServerMessage,
        exclude: Option<ParticipantId>,
    ) -> Result<(), AppError> {
        self.command(ServerCommand::Broadcast { message, exclude })
            .await
    }

    /// Current membership as `(id, name)` pairs, in no particular order
    pub async fn members(&self) -> Result<Vec<(ParticipantId, String)>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.command(ServerCommand::Members { reply }).await?;
        rx.await.map_err(|_| AppError::ChannelSend)
    }

    async fn command(&self, cmd: ServerCommand) -> Result<(), AppError> {
        self.cmd_tx.send(cmd).await.map_err(|_| AppError::ChannelSend)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    fn participant(name: &str) -> (Participant, mpsc::Receiver<ServerMessage>) {
        let (tx, rx) = mpsc::channel(16);
        (Participant::new(ParticipantId::new(), name, tx), rx)
    }

    #[tokio::test]
    async fn test_add_then_remove() {
        let registry = Registry::spawn(TIMEOUT);
        let (alice, _rx) = participant("Alice");
        let id = alice.id;

        registry.add(alice).await.unwrap();
        assert_eq!(registry.members().await.unwrap(), vec![(id, "Alice".to_string())]);

        assert!(registry.remove(id).await.unwrap());
        assert!(registry.members().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_double_remove_same_as_single() {
        let registry = Registry::spawn(TIMEOUT);
        let (alice, _a) = participant("Alice");
        let (bob, _b) = participant("Bob");
        let alice_id = alice.id;
        let bob_id = bob.id;
        registry.add(alice).await.unwrap();
        registry.add(bob).await.unwrap();

        assert!(registry.remove(alice_id).await.unwrap());
        assert!(!registry.remove(alice_id).await.unwrap());

        assert_eq!(registry.members().await.unwrap(), vec![(bob_id, "Bob".to_string())]);
    }

    #[tokio::test]
    async fn test_concurrent_add_remove_membership() {
        let registry = Registry::spawn(TIMEOUT);
        let mut handles = Vec::new();

        // Even-numbered tasks leave again, odd-numbered ones stay
        for i in 0..50 {
            let registry = registry.clone();
            handles.push(tokio::spawn(async move {
                let (tx, _rx) = mpsc::channel(1);
                let p = Participant::new(ParticipantId::new(), format!("user{}", i), tx);
                let id = p.id;
                registry.add(p).await.unwrap();
                if i % 2 == 0 {
                    registry.remove(id).await.unwrap();
                    registry.remove(id).await.unwrap();
                    None
                } else {
                    Some(id)
                }
            }));
        }

        let mut expected = HashSet::new();
        for handle in handles {
            if let Some(id) = handle.await.unwrap() {
                expected.insert(id);
            }
        }

        let members = registry.members().await.unwrap();
        let ids: HashSet<_> = members.iter().map(|(id, _)| *id).collect();
        assert_eq!(members.len(), ids.len(), "no duplicates");
        assert_eq!(ids, expected);
    }

    #[tokio::test]
    async fn test_broadcast_recipient_set_is_snapshot() {
        let registry = Registry::spawn(TIMEOUT);
        let (alice, mut alice_rx) = participant("Alice");
        let (bob, mut bob_rx) = participant("Bob");
        let alice_id = alice.id;
        registry.add(alice).await.unwrap();

        registry
            .broadcast(ServerMessage::chat("Alice", "first"), Some(alice_id))
            .await
            .unwrap();
        registry.add(bob).await.unwrap();
        registry
            .broadcast(ServerMessage::chat("Alice", "second"), Some(alice_id))
            .await
            .unwrap();
        // Commands are FIFO, so this round-trip flushes both broadcasts
        registry.members().await.unwrap();

        match bob_rx.try_recv().unwrap() {
            ServerMessage::Chat { content, .. } => assert_eq!(content, "second"),
            other => panic!("unexpected message: {:?}", other),
        }
        assert!(bob_rx.try_recv().is_err());
        assert!(alice_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_closed_registry_reports_channel_error() {
        let (cmd_tx, cmd_rx) = mpsc::channel(1);
        drop(cmd_rx);
        let registry = Registry::new(cmd_tx);

        let (alice, _rx) = participant("Alice");
        assert!(matches!(registry.add(alice).await, Err(AppError::ChannelSend)));
    }
}
