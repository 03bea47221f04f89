//! Domain layer for Valet.
//!
//! Pure session/conversation state with no network dependencies: session
//! identity, message and wire-frame types, the append-only conversation
//! store, and the pending-command set. The connection layer lives in
//! `valet-client` and the interactive console in `valet-console`.

pub mod error;
pub mod session;

// Re-export common error type
pub use error::ValetError;
