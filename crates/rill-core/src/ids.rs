//! Session and message identifiers.
//!
//! Session IDs arrive on the wire and are wrapped as-is. Message IDs are
//! either generated (UUID v7, time-ordered) for streamed buffers or derived
//! from a stable correlation key for entries that must be replaced in place.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one chat session; the scope of sequence numbers.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// The wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the wire value was empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of one rendered message (assistant, reasoning, tool, or system).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Fresh time-ordered ID for a streamed buffer.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Stable ID for a secrets request, so a re-sent request replaces its form.
    #[must_use]
    pub fn for_secrets_request(request_id: &str) -> Self {
        Self(format!("ask-secrets-{request_id}"))
    }

    /// Stable ID for an integration prompt within one session.
    #[must_use]
    pub fn for_integration_prompt(session_id: &SessionId, integration: &str) -> Self {
        Self(format!("integration-{session_id}-{integration}"))
    }

    /// The ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
