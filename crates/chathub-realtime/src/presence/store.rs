//! Presence store — connection-to-user mapping with per-user refcounts.

use dashmap::DashMap;
use uuid::Uuid;

use crate::connection::handle::ConnectionId;

/// In-memory source of truth for who is online on this server instance.
///
/// Keyed by connection, because presence entries live and die with the
/// transport link. The per-user connection count lets the relay decide
/// online/offline transitions per user: a user with two live connections
/// must not flip offline when only one of them disconnects.
#[derive(Debug, Default)]
pub struct PresenceStore {
    /// Connection ID → user ID.
    entries: DashMap<ConnectionId, Uuid>,
    /// User ID → number of live connections.
    counts: DashMap<Uuid, usize>,
}

impl PresenceStore {
    /// Creates a new empty presence store.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            counts: DashMap::new(),
        }
    }

    /// Registers a connection as belonging to a user.
    ///
    /// Idempotent for repeat joins from the same connection; a join with a
    /// different user rebinds the connection and adjusts both counts.
    pub fn record_join(&self, conn_id: ConnectionId, user_id: Uuid) {
        match self.entries.insert(conn_id, user_id) {
            Some(previous) if previous == user_id => {}
            Some(previous) => {
                self.decrement(previous);
                self.increment(user_id);
            }
            None => self.increment(user_id),
        }
    }

    /// Returns the user a connection is bound to, if it has joined.
    pub fn lookup(&self, conn_id: &ConnectionId) -> Option<Uuid> {
        self.entries.get(conn_id).map(|entry| *entry.value())
    }

    /// Purges a connection's entry.
    ///
    /// Returns the user it was bound to and how many of that user's
    /// connections remain, or `None` if the connection never joined.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<(Uuid, usize)> {
        let (_, user_id) = self.entries.remove(conn_id)?;
        let remaining = self.decrement(user_id);
        Some((user_id, remaining))
    }

    /// Returns the number of live connections for a user.
    pub fn user_connection_count(&self, user_id: &Uuid) -> usize {
        self.counts.get(user_id).map(|c| *c.value()).unwrap_or(0)
    }

    /// Returns the number of distinct online users.
    pub fn online_user_count(&self) -> usize {
        self.counts.len()
    }

    fn increment(&self, user_id: Uuid) {
        *self.counts.entry(user_id).or_insert(0) += 1;
    }

    fn decrement(&self, user_id: Uuid) -> usize {
        let remaining = {
            match self.counts.get_mut(&user_id) {
                Some(mut count) => {
                    *count = count.saturating_sub(1);
                    *count
                }
                None => 0,
            }
        };
        if remaining == 0 {
            self.counts.remove_if(&user_id, |_, count| *count == 0);
        }
        remaining
    }
}
