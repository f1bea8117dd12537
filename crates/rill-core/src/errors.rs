//! Wire decoding errors.

use thiserror::Error;

/// Errors raised while decoding an inbound [`ChatEvent`](crate::ChatEvent).
#[derive(Debug, Error)]
pub enum EventError {
    /// The document was not valid JSON or did not match the wire shape.
    #[error("invalid chat event JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// `sessionId` was empty.
    #[error("chat event has an empty sessionId")]
    MissingSessionId,
    /// `event` was empty.
    #[error("chat event {sequence} has an empty event name")]
    MissingEventName {
        /// Sequence number of the offending event.
        sequence: i64,
    },
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
