//! Connection layer for Valet.
//!
//! Owns everything that talks to the backend: configuration and endpoint
//! resolution, the realtime channel task with perpetual reconnection, the
//! command decision side-channel, and the session controller that keeps one
//! coherent view of conversation and pending-approval state.

pub mod api;
pub mod channel;
pub mod config;
pub mod reconnect;
pub mod session;

pub use api::{ApiClient, CommandOutcome, DecisionApi, SystemInfo};
pub use channel::{ChannelEvent, ChannelHandle};
pub use config::ClientConfig;
pub use reconnect::ReconnectPolicy;
pub use session::{DecisionOutcome, SessionController, SessionEvent};
