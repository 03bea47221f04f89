//! Session domain module.
//!
//! This module contains the domain models for one client session:
//!
//! - `identity`: the opaque per-launch session token (`SessionId`)
//! - `message`: conversation message types (`ChatMessage`, `Sender`, `MessageType`)
//! - `frame`: wire frames exchanged over the channel (`ServerFrame`, `ClientFrame`)
//! - `connectivity`: channel connectivity state (`ConnectivityState`)
//! - `store`: the append-only conversation log (`ConversationStore`)
//! - `pending`: command proposals awaiting decision (`PendingCommand`, `PendingSet`)

mod connectivity;
mod frame;
mod identity;
mod message;
mod pending;
mod store;

// Re-export public API
pub use connectivity::ConnectivityState;
pub use frame::{ClientFrame, ServerFrame};
pub use identity::SessionId;
pub use message::{ChatMessage, MessageType, Sender};
pub use pending::{PendingCommand, PendingSet};
pub use store::ConversationStore;
