//! Conversation store.
//!
//! The ordered, append-only log of exchanged messages plus the ephemeral
//! typing indicator. All mutation happens inside the session controller's
//! single reaction loop; entries are never reordered, mutated, or removed.

use super::identity::SessionId;
use super::message::{ChatMessage, MessageType, Sender};

/// Append-only log of conversation messages for one session.
#[derive(Debug)]
pub struct ConversationStore {
    session_id: SessionId,
    messages: Vec<ChatMessage>,
    /// True from the moment a user message is sent until the next inbound
    /// message is classified.
    typing: bool,
    /// Monotonic counter for locally generated message ids.
    next_local_id: u64,
}

impl ConversationStore {
    /// Creates an empty store for the given session.
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            messages: Vec::new(),
            typing: false,
            next_local_id: 0,
        }
    }

    /// Appends the user's own message optimistically, before backend
    /// acknowledgment, and raises the typing indicator.
    pub fn append_user(&mut self, text: impl Into<String>) -> &ChatMessage {
        let message = ChatMessage {
            id: self.next_local_id(),
            session_id: self.session_id.to_string(),
            message: text.into(),
            sender: Sender::User,
            timestamp: chrono::Utc::now().to_rfc3339(),
            message_type: MessageType::Text,
            command_id: None,
        };
        self.messages.push(message);
        self.typing = true;
        self.messages.last().expect("just pushed")
    }

    /// Appends an assistant message as received and clears the typing
    /// indicator, regardless of the message's semantic type.
    pub fn append_inbound(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        self.typing = false;
        self.messages.last().expect("just pushed")
    }

    /// Appends a locally synthesized assistant message (command result,
    /// rejection notice, decision-failure notice).
    pub fn append_synthetic(
        &mut self,
        text: impl Into<String>,
        message_type: MessageType,
    ) -> &ChatMessage {
        let message = ChatMessage {
            id: self.next_local_id(),
            session_id: self.session_id.to_string(),
            message: text.into(),
            sender: Sender::Assistant,
            timestamp: chrono::Utc::now().to_rfc3339(),
            message_type,
            command_id: None,
        };
        self.messages.push(message);
        self.messages.last().expect("just pushed")
    }

    /// The session this store belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// All messages, in arrival/send order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Number of messages in the log.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether the assistant is expected to be composing a reply.
    pub fn is_typing(&self) -> bool {
        self.typing
    }

    fn next_local_id(&mut self) -> String {
        self.next_local_id += 1;
        format!("local-{}", self.next_local_id)
    }
}
