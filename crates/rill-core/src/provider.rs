//! Provider tags.
//!
//! The set of backends is closed: every event is dispatched to exactly one
//! adapter (or none) through [`Provider::resolve`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::event::ChatEvent;

/// A backend AI provider with its own streaming vocabulary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Anthropic Claude (block-streaming vocabulary).
    Claude,
    /// Zhipu GLM; same wire shape as Claude under a `glm.` prefix.
    Glm,
    /// Google Gemini (flat session-update vocabulary).
    Gemini,
    /// `OpenAI` Codex.
    Codex,
}

impl Provider {
    /// Every provider, in dispatch-table order.
    pub const ALL: [Self; 4] = [Self::Claude, Self::Glm, Self::Gemini, Self::Codex];

    /// Parse a provider tag. Accepts vendor aliases (`anthropic`, `openai`, ...).
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_lowercase().as_str() {
            "claude" | "anthropic" => Some(Self::Claude),
            "glm" | "zhipu" => Some(Self::Glm),
            "gemini" | "google" => Some(Self::Gemini),
            "codex" | "openai" => Some(Self::Codex),
            _ => None,
        }
    }

    /// Select the provider for an event: `metadata.provider` first, then the
    /// event name's dot-prefix.
    pub fn resolve(event: &ChatEvent) -> Option<Self> {
        event
            .metadata_provider()
            .and_then(Self::from_tag)
            .or_else(|| event.name_prefix().and_then(Self::from_tag))
    }

    /// Canonical lowercase tag, as used in event-name prefixes.
    pub fn tag(self) -> &'static str {
        match self {
            Self::Claude => "claude",
            Self::Glm => "glm",
            Self::Gemini => "gemini",
            Self::Codex => "codex",
        }
    }

    /// Human-facing name used in message titles.
    pub fn display_name(self) -> &'static str {
        match self {
            Self::Claude => "Claude",
            Self::Glm => "GLM",
            Self::Gemini => "Gemini",
            Self::Codex => "Codex",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
