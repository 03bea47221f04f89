//! Wire frames exchanged over the realtime channel.

use serde::{Deserialize, Serialize};

use super::message::ChatMessage;

/// Frames received from the backend over the channel.
///
/// Each frame carries a `type` discriminator. Frame types this client does
/// not know about deserialize to [`ServerFrame::Unknown`] and are ignored,
/// so newer backends can add frame types without breaking older clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// A conversation message.
    Message { data: ChatMessage },
    /// Reserved/unrecognized frame types.
    #[serde(other)]
    Unknown,
}

/// Frame sent to the backend when the user submits a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientFrame {
    /// The user's message text
    pub message: String,
    /// Timestamp of the send (ISO 8601 format)
    pub timestamp: String,
}

impl ClientFrame {
    /// Creates a frame for the given text, stamped with the current time.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::message::{MessageType, Sender};

    #[test]
    fn test_message_frame_deserializes() {
        let json = r#"{
            "type": "message",
            "data": {
                "id": "m-1",
                "session_id": "session_abc",
                "message": "All systems nominal",
                "sender": "assistant",
                "timestamp": "2024-01-01T00:00:00Z",
                "message_type": "text"
            }
        }"#;

        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        match frame {
            ServerFrame::Message { data } => {
                assert_eq!(data.message, "All systems nominal");
                assert_eq!(data.sender, Sender::Assistant);
                assert_eq!(data.message_type, MessageType::Text);
            }
            other => panic!("expected message frame, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_frame_type_is_ignored() {
        let json = r#"{"type": "heartbeat", "data": {"anything": true}}"#;
        let frame: ServerFrame = serde_json::from_str(json).unwrap();
        assert!(matches!(frame, ServerFrame::Unknown));
    }

    #[test]
    fn test_client_frame_shape() {
        let frame = ClientFrame::new("status?");
        let value: serde_json::Value = serde_json::to_value(&frame).unwrap();
        assert_eq!(value["message"], "status?");
        assert!(value["timestamp"].is_string());
    }
}
