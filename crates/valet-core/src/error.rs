//! Error types for the Valet application.
//!
//! A shared error type for the entire application, with typed variants
//! and automatic conversion from common error types via `From`.

use thiserror::Error;

/// A shared error type for the entire Valet application.
#[derive(Error, Debug, Clone)]
pub enum ValetError {
    /// Configuration error (missing or malformed settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Realtime channel (transport) error
    #[error("Channel error: {0}")]
    Channel(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "JSON", "TOML", etc.
        message: String,
    },

    /// Request/response endpoint error
    #[error("API error ({endpoint}): {message}")]
    Api { endpoint: String, message: String },

    /// Operation requires a connected channel
    #[error("Not connected to the backend")]
    NotConnected,

    /// No pending command with the given identifier
    #[error("Unknown command: '{id}'")]
    UnknownCommand { id: String },

    /// A decision for this command is already in flight
    #[error("A decision for command '{id}' is already in flight")]
    DecisionInFlight { id: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ValetError {
    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates a Channel error
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel(message.into())
    }

    /// Creates an Api error
    pub fn api(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Check if this error indicates the channel is unavailable
    pub fn is_not_connected(&self) -> bool {
        matches!(self, Self::NotConnected)
    }
}

impl From<std::io::Error> for ValetError {
    fn from(err: std::io::Error) -> Self {
        Self::Channel(format!("{} (kind: {:?})", err, err.kind()))
    }
}

impl From<serde_json::Error> for ValetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ValetError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

/// A type alias for `Result<T, ValetError>`.
pub type Result<T> = std::result::Result<T, ValetError>;
