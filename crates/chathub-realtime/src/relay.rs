//! The relay — connection lifecycle orchestration and event fan-out.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use chathub_core::config::realtime::RealtimeConfig;

use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::pool::ConnectionPool;
use crate::events::{ClientEvent, ServerEvent};
use crate::presence::store::PresenceStore;
use crate::room::{self, RoomRouter};
use crate::store::ChatStore;
use crate::typing::tracker::TypingTracker;

/// Orchestrates join, message, typing and disconnect events against the
/// presence store, room router, typing tracker and persistence store.
///
/// One transport task per connection drives [`ChatRelay::handle_event`], so
/// events from a single connection are processed in order; the shared stores
/// are concurrency-safe for interleaving across connections. Persistence
/// calls are the only suspension points. No failure in here is fatal to the
/// process.
pub struct ChatRelay {
    /// All live connections.
    pool: ConnectionPool,
    /// Room membership.
    rooms: RoomRouter,
    /// Who is online, per connection.
    presence: PresenceStore,
    /// Who is typing.
    typing: TypingTracker,
    /// Durable storage for messages and presence fields.
    store: Arc<dyn ChatStore>,
    /// Relay configuration.
    config: RealtimeConfig,
}

impl std::fmt::Debug for ChatRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatRelay")
            .field("connections", &self.pool.connection_count())
            .finish()
    }
}

impl ChatRelay {
    /// Creates a new relay over the given persistence store.
    pub fn new(store: Arc<dyn ChatStore>, config: RealtimeConfig) -> Self {
        Self {
            pool: ConnectionPool::new(),
            rooms: RoomRouter::new(),
            presence: PresenceStore::new(),
            typing: TypingTracker::new(),
            store,
            config,
        }
    }

    /// Registers a newly accepted connection.
    ///
    /// The connection is anonymous until its `join` event arrives. Returns
    /// the handle and the receiver the transport task forwards to the socket.
    pub fn register(&self) -> (Arc<ConnectionHandle>, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(tx));
        self.pool.add(handle.clone());

        info!(conn_id = %handle.id, "Connection registered");
        (handle, rx)
    }

    /// Dispatches a raw inbound frame from a connection.
    ///
    /// Malformed frames are logged and skipped; they never terminate the
    /// connection.
    pub async fn handle_event(&self, conn_id: ConnectionId, raw: &str) {
        match serde_json::from_str::<ClientEvent>(raw) {
            Ok(ClientEvent::Join { user_id }) => self.handle_join(conn_id, user_id).await,
            Ok(ClientEvent::SendMessage {
                sender_id,
                recipient_id,
                text,
            }) => self.handle_send_message(sender_id, recipient_id, &text).await,
            Ok(ClientEvent::Typing {
                sender_id,
                recipient_id,
                is_typing,
            }) => self.handle_typing(sender_id, recipient_id, is_typing),
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "Ignoring malformed client event");
            }
        }
    }

    /// Binds a connection to a user: presence entry, mailbox room, persisted
    /// online flag, and a presence broadcast to everyone.
    pub async fn handle_join(&self, conn_id: ConnectionId, user_id: Uuid) {
        self.presence.record_join(conn_id, user_id);
        self.rooms.join(conn_id, room::mailbox(user_id));

        if let Err(e) = self.store.set_user_presence(user_id, true, None).await {
            error!(user_id = %user_id, error = %e, "Failed to persist online status");
            return;
        }

        self.emit_to_all(&ServerEvent::UserStatus {
            user_id,
            online: true,
            last_seen: None,
        });

        info!(conn_id = %conn_id, user_id = %user_id, "User joined");
    }

    /// Stores a message, then fans it out to the sender's and recipient's
    /// mailbox rooms.
    ///
    /// The store call completes before any broadcast: a client must never see
    /// a message over the relay that a later history query cannot return. On
    /// store failure nothing is broadcast and the connection stays open.
    pub async fn handle_send_message(&self, sender_id: Uuid, recipient_id: Uuid, text: &str) {
        let stored = match self
            .store
            .store_message(sender_id, recipient_id, text, Utc::now())
            .await
        {
            Ok(message) => message,
            Err(e) => {
                error!(
                    sender = %sender_id,
                    recipient = %recipient_id,
                    error = %e,
                    "Failed to store message, dropping broadcast"
                );
                return;
            }
        };

        let event = ServerEvent::ReceiveMessage(stored);
        self.emit_to_room(&room::mailbox(sender_id), &event);
        self.emit_to_room(&room::mailbox(recipient_id), &event);
    }

    /// Updates the typing tracker and relays the indicator to the
    /// recipient's mailbox room only, never back to the sender's.
    pub fn handle_typing(&self, sender_id: Uuid, recipient_id: Uuid, is_typing: bool) {
        if is_typing {
            self.typing.set_typing(sender_id);
        } else {
            self.typing.clear_typing(sender_id);
        }

        self.emit_to_room(
            &room::mailbox(recipient_id),
            &ServerEvent::Typing {
                sender_id,
                is_typing,
            },
        );
    }

    /// Tears down a connection: pool, rooms, presence. When this was the
    /// user's last live connection, also persists last-seen and broadcasts
    /// the offline transition.
    pub async fn disconnect(&self, conn_id: ConnectionId) {
        if let Some(handle) = self.pool.remove(&conn_id) {
            handle.mark_dead();
            debug!(
                conn_id = %conn_id,
                connected_secs = (Utc::now() - handle.connected_at).num_seconds(),
                "Connection removed from pool"
            );
        }
        self.rooms.leave_all(conn_id);

        let Some((user_id, remaining)) = self.presence.remove(&conn_id) else {
            info!(conn_id = %conn_id, "Anonymous connection closed");
            return;
        };

        if remaining > 0 {
            debug!(
                user_id = %user_id,
                remaining = remaining,
                "Connection closed, user still online elsewhere"
            );
            return;
        }

        let last_seen = Utc::now();
        if let Err(e) = self
            .store
            .set_user_presence(user_id, false, Some(last_seen))
            .await
        {
            error!(user_id = %user_id, error = %e, "Failed to persist offline status");
            return;
        }

        self.emit_to_all(&ServerEvent::UserStatus {
            user_id,
            online: false,
            last_seen: Some(last_seen),
        });

        info!(conn_id = %conn_id, user_id = %user_id, "User went offline");
    }

    /// Expires stale typing entries and broadcasts typing-stopped for each.
    ///
    /// Driven by the background sweep task, independent of client events, so
    /// the indicator clears even when the typing client vanishes silently.
    pub fn sweep_typing(&self) {
        let threshold = Duration::from_millis(self.config.typing_expiry_ms);
        for user_id in self.typing.sweep_expired(threshold, Instant::now()) {
            debug!(user_id = %user_id, "Typing indicator expired");
            self.emit_to_all(&ServerEvent::Typing {
                sender_id: user_id,
                is_typing: false,
            });
        }
    }

    /// Delivers an event to every member of a room.
    ///
    /// Fire-and-forget per member: one slow or dead connection never blocks
    /// the rest, and nothing propagates to the caller.
    fn emit_to_room(&self, room: &str, event: &ServerEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Failed to serialize event");
                return;
            }
        };

        for conn_id in self.rooms.members(room) {
            if let Some(handle) = self.pool.get(&conn_id) {
                if !handle.send(payload.clone()) {
                    warn!(conn_id = %conn_id, room = %room, "Dropped event for room member");
                }
            }
        }
    }

    /// Delivers an event to every live connection, regardless of rooms.
    fn emit_to_all(&self, event: &ServerEvent) {
        let payload = match serde_json::to_string(event) {
            Ok(p) => p,
            Err(e) => {
                error!(error = %e, "Failed to serialize event");
                return;
            }
        };

        for handle in self.pool.all_connections() {
            handle.send(payload.clone());
        }
    }

    /// Returns the total number of live connections.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Returns the number of distinct online (joined) users.
    pub fn online_user_count(&self) -> usize {
        self.presence.online_user_count()
    }

    /// Returns the relay configuration.
    pub fn config(&self) -> &RealtimeConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;
    use chrono::DateTime;

    use chathub_core::error::AppError;
    use chathub_core::result::AppResult;
    use chathub_entity::message::Message;

    /// In-memory stand-in for the persistence service.
    #[derive(Default)]
    struct MemoryStore {
        messages: Mutex<Vec<Message>>,
        presence: Mutex<HashMap<Uuid, (bool, Option<DateTime<Utc>>)>>,
        fail: AtomicBool,
    }

    impl MemoryStore {
        fn fail_next_calls(&self, fail: bool) {
            self.fail.store(fail, Ordering::SeqCst);
        }

        fn stored_messages(&self) -> Vec<Message> {
            self.messages.lock().unwrap().clone()
        }

        fn presence_of(&self, user_id: Uuid) -> Option<(bool, Option<DateTime<Utc>>)> {
            self.presence.lock().unwrap().get(&user_id).copied()
        }
    }

    #[async_trait]
    impl ChatStore for MemoryStore {
        async fn store_message(
            &self,
            sender: Uuid,
            recipient: Uuid,
            text: &str,
            timestamp: DateTime<Utc>,
        ) -> AppResult<Message> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::database("store unavailable"));
            }
            let message = Message {
                id: Uuid::new_v4(),
                sender,
                recipient,
                text: text.to_string(),
                timestamp,
            };
            self.messages.lock().unwrap().push(message.clone());
            Ok(message)
        }

        async fn set_user_presence(
            &self,
            user_id: Uuid,
            online: bool,
            last_seen: Option<DateTime<Utc>>,
        ) -> AppResult<()> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::database("store unavailable"));
            }
            self.presence
                .lock()
                .unwrap()
                .insert(user_id, (online, last_seen));
            Ok(())
        }
    }

    fn new_relay() -> (Arc<ChatRelay>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::default());
        let relay = Arc::new(ChatRelay::new(store.clone(), RealtimeConfig::default()));
        (relay, store)
    }

    /// Collects everything currently buffered for a connection.
    fn drain(rx: &mut mpsc::Receiver<String>) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(raw) = rx.try_recv() {
            events.push(serde_json::from_str(&raw).expect("server event"));
        }
        events
    }

    fn received_texts(events: &[ServerEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                ServerEvent::ReceiveMessage(m) => Some(m.text.clone()),
                _ => None,
            })
            .collect()
    }

    #[tokio::test]
    async fn test_join_broadcasts_online_and_persists() {
        let (relay, store) = new_relay();
        let (conn, mut rx) = relay.register();
        let user = Uuid::new_v4();

        relay.handle_join(conn.id, user).await;

        assert_eq!(store.presence_of(user), Some((true, None)));
        assert_eq!(
            drain(&mut rx),
            vec![ServerEvent::UserStatus {
                user_id: user,
                online: true,
                last_seen: None,
            }]
        );
    }

    #[tokio::test]
    async fn test_disconnect_broadcasts_offline_with_last_seen() {
        let (relay, store) = new_relay();
        let (conn, _rx) = relay.register();
        let (_observer, mut observer_rx) = relay.register();
        let user = Uuid::new_v4();

        let before_join = Utc::now();
        relay.handle_join(conn.id, user).await;
        drain(&mut observer_rx);

        relay.disconnect(conn.id).await;

        let offline: Vec<_> = drain(&mut observer_rx)
            .into_iter()
            .filter(|e| matches!(e, ServerEvent::UserStatus { online: false, .. }))
            .collect();
        assert_eq!(offline.len(), 1, "exactly one offline broadcast");

        let ServerEvent::UserStatus {
            user_id, last_seen, ..
        } = &offline[0]
        else {
            unreachable!()
        };
        assert_eq!(*user_id, user);
        assert!(last_seen.expect("last_seen set") >= before_join);

        let (online, persisted_last_seen) = store.presence_of(user).expect("persisted");
        assert!(!online);
        assert!(persisted_last_seen.is_some());
    }

    #[tokio::test]
    async fn test_anonymous_disconnect_has_no_side_effects() {
        let (relay, store) = new_relay();
        let (conn, _rx) = relay.register();
        let (_observer, mut observer_rx) = relay.register();

        relay.disconnect(conn.id).await;

        assert!(drain(&mut observer_rx).is_empty());
        assert!(store.presence.lock().unwrap().is_empty());
        assert_eq!(relay.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_message_is_delivered_to_both_mailboxes() {
        let (relay, store) = new_relay();
        let (conn_a, mut rx_a) = relay.register();
        let (conn_b, mut rx_b) = relay.register();
        let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());

        relay.handle_join(conn_a.id, user_a).await;
        relay.handle_join(conn_b.id, user_b).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        relay.handle_send_message(user_a, user_b, "hi").await;

        assert_eq!(received_texts(&drain(&mut rx_a)), vec!["hi"]);
        assert_eq!(received_texts(&drain(&mut rx_b)), vec!["hi"]);
        assert_eq!(store.stored_messages().len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_suppresses_broadcast() {
        let (relay, store) = new_relay();
        let (conn_a, mut rx_a) = relay.register();
        let (conn_b, mut rx_b) = relay.register();
        let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());

        relay.handle_join(conn_a.id, user_a).await;
        relay.handle_join(conn_b.id, user_b).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        store.fail_next_calls(true);
        relay.handle_send_message(user_a, user_b, "lost").await;

        assert!(drain(&mut rx_a).is_empty());
        assert!(drain(&mut rx_b).is_empty());
        assert!(store.stored_messages().is_empty());
    }

    #[tokio::test]
    async fn test_typing_reaches_only_the_recipient() {
        let (relay, _store) = new_relay();
        let (conn_a, mut rx_a) = relay.register();
        let (conn_b, mut rx_b) = relay.register();
        let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());

        relay.handle_join(conn_a.id, user_a).await;
        relay.handle_join(conn_b.id, user_b).await;
        drain(&mut rx_a);
        drain(&mut rx_b);

        relay.handle_typing(user_a, user_b, true);

        assert!(drain(&mut rx_a).is_empty(), "sender must not see own typing");
        assert_eq!(
            drain(&mut rx_b),
            vec![ServerEvent::Typing {
                sender_id: user_a,
                is_typing: true,
            }]
        );
    }

    #[tokio::test]
    async fn test_explicit_typing_stop_clears_without_sweep() {
        let (relay, _store) = new_relay();
        let (conn_a, _rx_a) = relay.register();
        let (conn_b, mut rx_b) = relay.register();
        let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());

        relay.handle_join(conn_a.id, user_a).await;
        relay.handle_join(conn_b.id, user_b).await;
        drain(&mut rx_b);

        relay.handle_typing(user_a, user_b, true);
        relay.handle_typing(user_a, user_b, false);
        drain(&mut rx_b);

        // Entry already cleared: a later sweep produces nothing.
        relay.sweep_typing();
        assert!(drain(&mut rx_b).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expires_stale_typing_globally() {
        let (relay, _store) = new_relay();
        let (conn_a, _rx_a) = relay.register();
        let (_observer, mut observer_rx) = relay.register();
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();

        relay.handle_join(conn_a.id, user_a).await;
        drain(&mut observer_rx);

        relay.handle_typing(user_a, user_b, true);

        // Still fresh: nothing expires.
        relay.sweep_typing();
        assert!(drain(&mut observer_rx).is_empty());

        tokio::time::advance(Duration::from_millis(6000)).await;
        relay.sweep_typing();

        assert_eq!(
            drain(&mut observer_rx),
            vec![ServerEvent::Typing {
                sender_id: user_a,
                is_typing: false,
            }]
        );
    }

    #[tokio::test]
    async fn test_offline_waits_for_last_connection() {
        let (relay, _store) = new_relay();
        let (laptop, _rx1) = relay.register();
        let (phone, _rx2) = relay.register();
        let (_observer, mut observer_rx) = relay.register();
        let user = Uuid::new_v4();

        relay.handle_join(laptop.id, user).await;
        relay.handle_join(phone.id, user).await;
        drain(&mut observer_rx);

        relay.disconnect(laptop.id).await;
        assert!(
            drain(&mut observer_rx).is_empty(),
            "no offline broadcast while another device is connected"
        );

        relay.disconnect(phone.id).await;
        let events = drain(&mut observer_rx);
        assert!(matches!(
            events.as_slice(),
            [ServerEvent::UserStatus { online: false, .. }]
        ));
    }

    #[tokio::test]
    async fn test_dead_member_does_not_block_room_delivery() {
        let (relay, _store) = new_relay();
        let (conn_a, _rx_a) = relay.register();
        let (dead, dead_rx) = relay.register();
        let (alive, mut alive_rx) = relay.register();
        let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());

        relay.handle_join(conn_a.id, user_a).await;
        // Both of B's devices join, then one drops its transport.
        relay.handle_join(dead.id, user_b).await;
        relay.handle_join(alive.id, user_b).await;
        drain(&mut alive_rx);
        drop(dead_rx);

        relay.handle_send_message(user_a, user_b, "still here").await;

        assert_eq!(received_texts(&drain(&mut alive_rx)), vec!["still here"]);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_ignored() {
        let (relay, store) = new_relay();
        let (conn, mut rx) = relay.register();

        relay.handle_event(conn.id, "{not json").await;
        relay.handle_event(conn.id, r#"{"type":"unknown-event"}"#).await;

        assert!(drain(&mut rx).is_empty());
        assert!(store.stored_messages().is_empty());
        assert_eq!(relay.connection_count(), 1);
    }

    #[tokio::test]
    async fn test_raw_event_dispatch_round_trip() {
        let (relay, store) = new_relay();
        let (conn_a, mut rx_a) = relay.register();
        let (user_a, user_b) = (Uuid::new_v4(), Uuid::new_v4());

        relay
            .handle_event(conn_a.id, &format!(r#"{{"type":"join","userId":"{user_a}"}}"#))
            .await;
        drain(&mut rx_a);

        relay
            .handle_event(
                conn_a.id,
                &format!(
                    r#"{{"type":"send-message","senderId":"{user_a}","recipientId":"{user_b}","text":"hello"}}"#
                ),
            )
            .await;

        assert_eq!(received_texts(&drain(&mut rx_a)), vec!["hello"]);
        assert_eq!(store.stored_messages()[0].recipient, user_b);
    }
}
