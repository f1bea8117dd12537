//! Outbound chat entries.
//!
//! Streamed assistant/reasoning/tool text reaches the host through the
//! buffer handlers. Everything else the processor surfaces (provider
//! failures, secret forms, integration prompts) is a [`ChatMessage`] that
//! the host upserts by [`MessageId`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::MessageId;

/// Author role of a chat entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Produced on behalf of the agent.
    Assistant,
    /// Produced by the system itself.
    System,
}

/// Rendering variant of a chat entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageVariant {
    /// Ordinary chat text.
    Chat,
    /// Status or failure notice.
    System,
    /// Form asking the user for secret values.
    SecretsRequest,
    /// Clickable prompt to connect an integration.
    IntegrationPrompt,
}

/// Action the host renders as a button.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessageAction {
    /// Open the connection flow for an integration.
    OpenIntegration {
        /// Integration name (`supabase`, `github`, ...).
        integration: String,
        /// Button label.
        #[serde(rename = "buttonText")]
        button_text: String,
    },
}

/// Secret names requested from the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecretsRequest {
    /// Correlation ID echoed back when the form is submitted.
    pub request_id: String,
    /// Names of the requested secrets.
    pub secret_names: Vec<String>,
}

/// A non-streamed chat entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Stable ID; upserting the same ID replaces the entry.
    pub id: MessageId,
    /// Author role.
    pub role: MessageRole,
    /// Rendering variant.
    pub variant: MessageVariant,
    /// Short title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Body text.
    pub content: String,
    /// Optional button.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<MessageAction>,
    /// Optional secrets form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<SecretsRequest>,
    /// Creation time of the originating event.
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A system notice (role assistant, variant system) with a title and body.
    #[must_use]
    pub fn system(
        title: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::Assistant,
            variant: MessageVariant::System,
            title: Some(title.into()),
            content: content.into(),
            action: None,
            secrets: None,
            created_at,
        }
    }

    /// A secrets form keyed by the request's correlation ID.
    #[must_use]
    pub fn secrets_request(
        request: SecretsRequest,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: MessageId::for_secrets_request(&request.request_id),
            role: MessageRole::System,
            variant: MessageVariant::SecretsRequest,
            title: Some("Secrets required".to_string()),
            content: content.into(),
            action: None,
            secrets: Some(request),
            created_at,
        }
    }

    /// An integration prompt carrying an `open_integration` action.
    #[must_use]
    pub fn integration_prompt(
        id: MessageId,
        integration: &str,
        button_text: impl Into<String>,
        content: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            role: MessageRole::Assistant,
            variant: MessageVariant::IntegrationPrompt,
            title: None,
            content: content.into(),
            action: Some(MessageAction::OpenIntegration {
                integration: integration.to_string(),
                button_text: button_text.into(),
            }),
            secrets: None,
            created_at,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
