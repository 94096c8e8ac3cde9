//! Typing tracker — last-typing timestamps with sweep-based expiry.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use uuid::Uuid;

/// Tracks which users are currently typing.
///
/// Timestamps are monotonic (`tokio::time::Instant`), so the tracker is
/// immune to wall-clock adjustments and controllable in tests. The sweep is
/// the single source of truth for expiry; an explicit stop from the client
/// short-circuits the same outcome via [`TypingTracker::clear_typing`].
#[derive(Debug, Default)]
pub struct TypingTracker {
    /// User ID → last typing timestamp.
    entries: DashMap<Uuid, Instant>,
}

impl TypingTracker {
    /// Creates a new empty typing tracker.
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Records or refreshes a user's typing timestamp.
    pub fn set_typing(&self, user_id: Uuid) {
        self.entries.insert(user_id, Instant::now());
    }

    /// Removes a user's typing entry. No-op if absent.
    pub fn clear_typing(&self, user_id: Uuid) -> bool {
        self.entries.remove(&user_id).is_some()
    }

    /// Removes and returns every entry older than `threshold` relative to
    /// `now`.
    pub fn sweep_expired(&self, threshold: Duration, now: Instant) -> Vec<Uuid> {
        let expired: Vec<Uuid> = self
            .entries
            .iter()
            .filter(|entry| {
                now.checked_duration_since(*entry.value())
                    .is_some_and(|age| age > threshold)
            })
            .map(|entry| *entry.key())
            .collect();

        for user_id in &expired {
            self.entries.remove(user_id);
        }

        expired
    }

    /// Returns the number of users currently marked as typing.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no user is marked as typing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
