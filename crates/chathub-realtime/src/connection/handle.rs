//! Individual connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Unique connection identifier, assigned on transport accept.
pub type ConnectionId = Uuid;

/// A handle to a single live connection.
///
/// Holds the sender half of the outbound channel; the transport task owns
/// the receiver and the socket itself. The relay never touches the socket.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// Sender for serialized outbound events.
    sender: mpsc::Sender<String>,
    /// When the connection was accepted.
    pub connected_at: DateTime<Utc>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle around an outbound sender.
    pub fn new(sender: mpsc::Sender<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            connected_at: Utc::now(),
            alive: AtomicBool::new(true),
        }
    }

    /// Push a serialized event to this connection.
    ///
    /// Fire-and-forget: a full buffer drops the event, a closed channel
    /// marks the connection dead. Neither outcome is an error to the caller.
    pub fn send(&self, msg: String) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let handle = ConnectionHandle::new(tx);

        assert!(handle.send("hello".to_string()));
        assert_eq!(rx.recv().await.as_deref(), Some("hello"));
        assert!(handle.connected_at <= Utc::now());
    }

    #[tokio::test]
    async fn test_send_to_closed_channel_marks_dead() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);
        let handle = ConnectionHandle::new(tx);

        assert!(!handle.send("hello".to_string()));
        assert!(!handle.is_alive());
        // Subsequent sends short-circuit.
        assert!(!handle.send("again".to_string()));
    }
}
