//! Inbound wire event.
//!
//! A [`ChatEvent`] is one unit of the push transport. Its `event` name is
//! namespaced as `<provider>.<kind>` (for example `claude.content_block_delta`),
//! though provider-agnostic events (`error`, `turn_end`, `ask_secrets`) carry
//! no prefix. The field layout is the wire contract and must round-trip
//! unchanged, including unknown payload and metadata fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::EventError;
use crate::ids::SessionId;

/// One inbound streaming event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatEvent {
    /// Session the event belongs to; the scope of `sequence`.
    pub session_id: SessionId,
    /// Per-session ordering key.
    pub sequence: i64,
    /// Event name, usually `<provider>.<kind>`.
    pub event: String,
    /// Provider-native payload plus normalized metadata.
    #[serde(default)]
    pub payload: EventPayload,
    /// Server-side creation time.
    pub created_at: DateTime<Utc>,
    /// Optional chat room the session is attached to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat_room_id: Option<i64>,
}

/// Event payload envelope.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventPayload {
    /// Provider-native JSON, passed through untouched.
    #[serde(default)]
    pub raw: Value,
    /// Normalized metadata attached by the transport.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EventMetadata>,
    /// Any other top-level payload fields (`type`, `content`, `status`, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Normalized metadata attached to a payload.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Provider tag (`claude`, `glm`, `gemini`, `codex`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    /// Provider-reported status, when the transport extracted one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    /// Normalized event type (for example `turn_end`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Remaining metadata fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChatEvent {
    /// Build an event stamped with the current time.
    #[must_use]
    pub fn new(
        session_id: impl Into<SessionId>,
        sequence: i64,
        event: impl Into<String>,
        raw: Value,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            sequence,
            event: event.into(),
            payload: EventPayload {
                raw,
                metadata: None,
                extra: Map::new(),
            },
            created_at: Utc::now(),
            chat_room_id: None,
        }
    }

    /// Replace the payload metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: EventMetadata) -> Self {
        self.payload.metadata = Some(metadata);
        self
    }

    /// Set a top-level payload field next to `raw` and `metadata`.
    #[must_use]
    pub fn with_payload_field(mut self, key: &str, value: Value) -> Self {
        let _ = self.payload.extra.insert(key.to_string(), value);
        self
    }

    /// Decode one JSON document (a JSONL line or a transport frame).
    pub fn from_json(text: &str) -> Result<Self, EventError> {
        let event: Self = serde_json::from_str(text.trim())?;
        if event.session_id.is_empty() {
            return Err(EventError::MissingSessionId);
        }
        if event.event.is_empty() {
            return Err(EventError::MissingEventName {
                sequence: event.sequence,
            });
        }
        Ok(event)
    }

    /// The dot-prefix of the event name, if it has one (`claude` for `claude.user`).
    pub fn name_prefix(&self) -> Option<&str> {
        self.event.split_once('.').map(|(prefix, _)| prefix)
    }

    /// The event name without its provider prefix (`result.success` for
    /// `claude.result.success`); the whole name when there is no prefix.
    pub fn kind(&self) -> &str {
        self.event
            .split_once('.')
            .map_or(self.event.as_str(), |(_, rest)| rest)
    }

    /// Metadata provider tag, if present and non-empty.
    pub fn metadata_provider(&self) -> Option<&str> {
        self.payload
            .metadata
            .as_ref()
            .and_then(|m| m.provider.as_deref())
            .filter(|p| !p.is_empty())
    }

    /// Metadata `type`, if present.
    pub fn metadata_kind(&self) -> Option<&str> {
        self.payload
            .metadata
            .as_ref()
            .and_then(|m| m.kind.as_deref())
    }

    /// A top-level payload field other than `raw`/`metadata`.
    pub fn payload_field(&self, key: &str) -> Option<&Value> {
        self.payload.extra.get(key)
    }

    /// A top-level payload field as a string slice.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload_field(key).and_then(Value::as_str)
    }
}

impl EventMetadata {
    /// Metadata carrying only a provider tag.
    #[must_use]
    pub fn for_provider(provider: &str) -> Self {
        Self {
            provider: Some(provider.to_string()),
            ..Self::default()
        }
    }

    /// Set the status field.
    #[must_use]
    pub fn with_status(mut self, status: &str) -> Self {
        self.status = Some(status.to_string());
        self
    }

    /// Set the normalized type field.
    #[must_use]
    pub fn with_kind(mut self, kind: &str) -> Self {
        self.kind = Some(kind.to_string());
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
