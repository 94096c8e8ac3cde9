//! Inbound and outbound relay event type definitions.
//!
//! Event names and payload field casing are part of the wire contract with
//! existing clients: `join`, `send-message` and `typing` inbound;
//! `receive-message`, `user-status` and `typing` outbound, all with
//! camelCase payload fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chathub_entity::message::Message;

/// Events sent by the client to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Bind this connection to a user and join their mailbox room.
    #[serde(rename = "join", rename_all = "camelCase")]
    Join {
        /// The joining user.
        user_id: Uuid,
    },
    /// Send a chat message to another user.
    #[serde(rename = "send-message", rename_all = "camelCase")]
    SendMessage {
        /// Sending user.
        sender_id: Uuid,
        /// Receiving user.
        recipient_id: Uuid,
        /// Message body.
        text: String,
    },
    /// Start or stop a typing indicator.
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing {
        /// Typing user.
        sender_id: Uuid,
        /// User being typed to.
        recipient_id: Uuid,
        /// Whether typing started (`true`) or stopped (`false`).
        is_typing: bool,
    },
}

/// Events sent by the server to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// A stored chat message, delivered to both mailbox rooms.
    #[serde(rename = "receive-message")]
    ReceiveMessage(Message),
    /// A presence transition, broadcast to every connection.
    #[serde(rename = "user-status", rename_all = "camelCase")]
    UserStatus {
        /// The user whose presence changed.
        user_id: Uuid,
        /// New online state.
        online: bool,
        /// Present only on the offline transition.
        #[serde(skip_serializing_if = "Option::is_none")]
        last_seen: Option<DateTime<Utc>>,
    },
    /// A typing indicator, delivered to the recipient's mailbox room only.
    #[serde(rename = "typing", rename_all = "camelCase")]
    Typing {
        /// Typing user.
        sender_id: Uuid,
        /// Whether they are currently typing.
        is_typing: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_wire_format() {
        let user_id = Uuid::new_v4();
        let raw = format!(r#"{{"type":"join","userId":"{user_id}"}}"#);

        let event: ClientEvent = serde_json::from_str(&raw).expect("parse");
        assert_eq!(event, ClientEvent::Join { user_id });
    }

    #[test]
    fn test_send_message_wire_format() {
        let raw = r#"{
            "type": "send-message",
            "senderId": "8f2e7a60-0000-0000-0000-000000000001",
            "recipientId": "8f2e7a60-0000-0000-0000-000000000002",
            "text": "hi"
        }"#;

        match serde_json::from_str::<ClientEvent>(raw).expect("parse") {
            ClientEvent::SendMessage { text, .. } => assert_eq!(text, "hi"),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_typing_wire_format() {
        let raw = r#"{
            "type": "typing",
            "senderId": "8f2e7a60-0000-0000-0000-000000000001",
            "recipientId": "8f2e7a60-0000-0000-0000-000000000002",
            "isTyping": true
        }"#;

        match serde_json::from_str::<ClientEvent>(raw).expect("parse") {
            ClientEvent::Typing { is_typing, .. } => assert!(is_typing),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_user_status_omits_last_seen_while_online() {
        let event = ServerEvent::UserStatus {
            user_id: Uuid::new_v4(),
            online: true,
            last_seen: None,
        };

        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["type"], "user-status");
        assert_eq!(value["online"], true);
        assert!(value.get("lastSeen").is_none());
    }

    #[test]
    fn test_user_status_carries_last_seen_when_offline() {
        let event = ServerEvent::UserStatus {
            user_id: Uuid::new_v4(),
            online: false,
            last_seen: Some(Utc::now()),
        };

        let value = serde_json::to_value(&event).expect("serialize");
        assert_eq!(value["online"], false);
        assert!(value.get("lastSeen").is_some());
    }

    #[test]
    fn test_receive_message_is_flattened_into_payload() {
        let msg = Message {
            id: Uuid::new_v4(),
            sender: Uuid::new_v4(),
            recipient: Uuid::new_v4(),
            text: "hello".to_string(),
            timestamp: Utc::now(),
        };

        let value =
            serde_json::to_value(ServerEvent::ReceiveMessage(msg.clone())).expect("serialize");
        assert_eq!(value["type"], "receive-message");
        assert_eq!(value["text"], "hello");
        assert_eq!(value["id"], serde_json::json!(msg.id));
    }
}
