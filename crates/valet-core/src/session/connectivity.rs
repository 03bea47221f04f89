//! Channel connectivity state.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The connectivity state of the realtime channel.
///
/// Transitions drive the UI status indicator and gate whether sends are
/// permitted. The channel starts `Disconnected` and cycles
/// `Connecting -> Connected -> Disconnected -> Connecting -> ...` until the
/// client shuts down; there is no terminal failure state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    /// A connection attempt is in progress.
    Connecting,
    /// The channel is open; sends are permitted.
    Connected,
    /// No channel; a reconnect attempt is (or will be) scheduled.
    #[default]
    Disconnected,
}

impl ConnectivityState {
    /// Whether sends are currently permitted.
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectivityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Connecting => "CONNECTING",
            Self::Connected => "ONLINE",
            Self::Disconnected => "OFFLINE",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state_is_disconnected() {
        assert_eq!(ConnectivityState::default(), ConnectivityState::Disconnected);
        assert!(!ConnectivityState::default().is_connected());
    }

    #[test]
    fn test_display_labels() {
        assert_eq!(ConnectivityState::Connected.to_string(), "ONLINE");
        assert_eq!(ConnectivityState::Disconnected.to_string(), "OFFLINE");
        assert_eq!(ConnectivityState::Connecting.to_string(), "CONNECTING");
    }
}
