//! Conversation message types.
//!
//! This module contains types for representing messages exchanged with the
//! assistant backend, including senders and semantic message types.

use serde::{Deserialize, Serialize};

/// Represents the sender of a message in the conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    /// Message from the user.
    User,
    /// Message from the assistant backend.
    ///
    /// Deployed backends have historically identified themselves by name
    /// rather than by role, so an alias is accepted on the wire.
    #[serde(alias = "jarvis")]
    Assistant,
}

/// The semantic type of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    /// Plain chat message.
    #[default]
    Text,
    /// Assistant-originated proposal to execute a privileged command.
    CommandProposal,
    /// Result of an executed command (synthesized locally after approval).
    CommandResult,
    /// Backend-reported error message.
    Error,
    /// Any message type this client does not know about (forward-compatible).
    #[serde(other)]
    Unknown,
}

/// A single message in the conversation.
///
/// Messages are created either optimistically on local send (sender = user)
/// or on receipt of an inbound frame (sender = assistant). They are immutable
/// once appended to the conversation store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message identifier
    pub id: String,
    /// Session this message belongs to
    pub session_id: String,
    /// The textual content of the message
    pub message: String,
    /// Who sent the message
    pub sender: Sender,
    /// Timestamp when the message was created (ISO 8601 format)
    pub timestamp: String,
    /// Semantic type of the message
    #[serde(default)]
    pub message_type: MessageType,
    /// Structured command identifier, delivered alongside command proposals.
    ///
    /// When present it is authoritative; older backends embed the identifier
    /// in the message text instead, and the pending-command classifier falls
    /// back to extracting it from there.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_inbound_message() {
        let json = r#"{
            "id": "m-1",
            "session_id": "session_abc",
            "message": "All systems nominal",
            "sender": "assistant",
            "timestamp": "2024-01-01T00:00:00Z",
            "message_type": "text"
        }"#;

        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender, Sender::Assistant);
        assert_eq!(msg.message_type, MessageType::Text);
        assert_eq!(msg.command_id, None);
    }

    #[test]
    fn test_deserialize_legacy_sender_alias() {
        let json = r#"{
            "id": "m-2",
            "session_id": "session_abc",
            "message": "Good day, sir.",
            "sender": "jarvis",
            "timestamp": "2024-01-01T00:00:00Z",
            "message_type": "text"
        }"#;

        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.sender, Sender::Assistant);
    }

    #[test]
    fn test_unknown_message_type_is_forward_compatible() {
        let json = r#"{
            "id": "m-3",
            "session_id": "session_abc",
            "message": "something new",
            "sender": "assistant",
            "timestamp": "2024-01-01T00:00:00Z",
            "message_type": "telemetry_blob"
        }"#;

        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.message_type, MessageType::Unknown);
    }

    #[test]
    fn test_structured_command_id_round_trips() {
        let json = r#"{
            "id": "m-4",
            "session_id": "session_abc",
            "message": "**Proposed Command:** `uptime`",
            "sender": "assistant",
            "timestamp": "2024-01-01T00:00:00Z",
            "message_type": "command_proposal",
            "command_id": "cmd-42"
        }"#;

        let msg: ChatMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg.command_id.as_deref(), Some("cmd-42"));
    }
}
