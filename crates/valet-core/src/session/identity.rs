//! Session identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque per-launch session token.
///
/// Generated once at client startup and stable for the lifetime of the
/// process. The backend uses it verbatim to associate the realtime channel
/// and the command decision endpoints with the same logical session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Generates a new random session identifier.
    pub fn generate() -> Self {
        Self(format!("session_{}", uuid::Uuid::new_v4().simple()))
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
