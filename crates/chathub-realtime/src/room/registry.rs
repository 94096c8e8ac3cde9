//! Room router — manages room membership.

use std::collections::HashSet;

use dashmap::DashMap;

use crate::connection::handle::ConnectionId;

/// Registry of named broadcast groups and their member connections.
///
/// Membership only; delivery is the relay's job. Empty rooms are removed on
/// last leave and transparently recreated on the next join.
#[derive(Debug, Default)]
pub struct RoomRouter {
    /// Room name → member connection IDs.
    rooms: DashMap<String, HashSet<ConnectionId>>,
    /// Connection ID → rooms joined (reverse index).
    memberships: DashMap<ConnectionId, Vec<String>>,
}

impl RoomRouter {
    /// Creates a new empty room router.
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            memberships: DashMap::new(),
        }
    }

    /// Adds a connection to a room. Joining twice is a no-op.
    pub fn join(&self, conn_id: ConnectionId, room: String) {
        let inserted = self.rooms.entry(room.clone()).or_default().insert(conn_id);
        if inserted {
            self.memberships.entry(conn_id).or_default().push(room);
        }
    }

    /// Returns the member connection IDs of a room.
    pub fn members(&self, room: &str) -> Vec<ConnectionId> {
        self.rooms
            .get(room)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Removes a connection from every room it belongs to.
    ///
    /// Returns the rooms that were left.
    pub fn leave_all(&self, conn_id: ConnectionId) -> Vec<String> {
        let rooms = self
            .memberships
            .remove(&conn_id)
            .map(|(_, rooms)| rooms)
            .unwrap_or_default();

        for room in &rooms {
            if let Some(mut members) = self.rooms.get_mut(room) {
                members.remove(&conn_id);
                if members.is_empty() {
                    drop(members);
                    self.rooms.remove(room);
                }
            }
        }

        rooms
    }

    /// Returns the number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_join_and_members() {
        let router = RoomRouter::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        router.join(a, "user_1".to_string());
        router.join(b, "user_1".to_string());

        let mut members = router.members("user_1");
        members.sort();
        let mut expected = vec![a, b];
        expected.sort();
        assert_eq!(members, expected);
    }

    #[test]
    fn test_double_join_is_idempotent() {
        let router = RoomRouter::new();
        let a = Uuid::new_v4();

        router.join(a, "user_1".to_string());
        router.join(a, "user_1".to_string());

        assert_eq!(router.members("user_1").len(), 1);
        router.leave_all(a);
        assert_eq!(router.members("user_1").len(), 0);
    }

    #[test]
    fn test_leave_all_removes_from_every_room() {
        let router = RoomRouter::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        router.join(a, "user_1".to_string());
        router.join(a, "user_2".to_string());
        router.join(b, "user_2".to_string());

        let mut left = router.leave_all(a);
        left.sort();
        assert_eq!(left, vec!["user_1".to_string(), "user_2".to_string()]);

        // The now-empty room is gone; the shared one survives.
        assert_eq!(router.room_count(), 1);
        assert_eq!(router.members("user_2"), vec![b]);
    }

    #[test]
    fn test_unknown_room_has_no_members() {
        let router = RoomRouter::new();
        assert!(router.members("user_missing").is_empty());
        assert!(router.leave_all(Uuid::new_v4()).is_empty());
    }
}
