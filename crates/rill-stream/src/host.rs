//! Host-implemented contracts.
//!
//! [`MessageBufferHandlers`] is the processor's entire visible effect
//! surface; [`HostDependencies`] are side-effect triggers. Both are called
//! synchronously and must return promptly: any I/O behind them is the
//! host's to schedule, never awaited here.
//!
//! Buffer handlers run while the session is locked. Side-effect triggers
//! are queued as [`HostEffect`]s and fired after the lock is released, so
//! a trigger may call back into the processor (for example to reset the
//! session on turn end).

use chrono::{DateTime, Utc};
use rill_core::{ChatMessage, MessageId, SessionId};

use crate::state::{ToolBuffer, ToolPreview};

/// Options for finalizing a reasoning buffer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FinalizeOptions {
    /// The turn is still running; keep the streaming indicator on.
    pub keep_streaming: bool,
}

/// Options for registering a tool message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EnsureToolOptions {
    /// Create a visible entry now. False while the call has no title yet.
    pub create_entry: bool,
}

/// Buffer mutations rendered by the host.
///
/// Message IDs are assigned by the processor when it opens a buffer and
/// passed to every later call on that buffer.
pub trait MessageBufferHandlers: Send + Sync {
    /// An assistant message has been opened.
    fn ensure_assistant_message(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        created_at: DateTime<Utc>,
    );

    /// Streamed assistant text.
    fn append_assistant_text(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        text: &str,
        created_at: DateTime<Utc>,
    );

    /// Final assistant text, replacing whatever was streamed.
    fn finalize_assistant_text(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        text: &str,
        created_at: DateTime<Utc>,
    );

    /// A reasoning message has been opened.
    fn ensure_reasoning_message(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        created_at: DateTime<Utc>,
    );

    /// Streamed reasoning text.
    fn append_reasoning_text(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        text: &str,
        created_at: DateTime<Utc>,
    );

    /// Close a reasoning message, optionally replacing its text.
    fn finalize_reasoning_text(
        &self,
        session_id: &SessionId,
        message_id: &MessageId,
        text: Option<&str>,
        created_at: DateTime<Utc>,
        options: FinalizeOptions,
    );

    /// A tool call has been registered (or gained its first title).
    fn ensure_tool_message(
        &self,
        session_id: &SessionId,
        key: &str,
        tool: &ToolBuffer,
        options: EnsureToolOptions,
    );

    /// Streamed tool output.
    fn append_tool_text(
        &self,
        session_id: &SessionId,
        key: &str,
        text: &str,
        created_at: DateTime<Utc>,
        title: Option<&str>,
    );

    /// Updated title/argument preview for a streaming tool call.
    fn apply_tool_preview(
        &self,
        session_id: &SessionId,
        key: &str,
        preview: &ToolPreview,
        created_at: DateTime<Utc>,
    );

    /// Close a tool message, optionally replacing its text.
    fn finalize_tool_text(
        &self,
        session_id: &SessionId,
        key: &str,
        text: Option<&str>,
        created_at: DateTime<Utc>,
    );

    /// Insert or replace (by `message.id`) a standalone message: system
    /// notices, secrets forms, integration prompts.
    fn upsert_message(&self, session_id: &SessionId, message: &ChatMessage);
}

/// Out-of-band integration connection status supplied by the host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegrationHints {
    /// Supabase connection status, if known.
    pub supabase_connected: Option<bool>,
    /// GitHub connection status, if known.
    pub github_connected: Option<bool>,
}

impl IntegrationHints {
    /// Whether the host reports `integration` as connected. Unknown counts
    /// as not connected.
    pub fn is_connected(&self, integration: &str) -> bool {
        match integration.to_ascii_lowercase().as_str() {
            "supabase" => self.supabase_connected.unwrap_or(false),
            "github" => self.github_connected.unwrap_or(false),
            _ => false,
        }
    }
}

/// Side-effect triggers. All are fire-and-forget.
pub trait HostDependencies: Send + Sync {
    /// Toggle the session's loading indicator.
    fn set_loading(&self, loading: bool);

    /// Refresh the live preview. Called once per streamed token; the host
    /// must coalesce.
    fn trigger_live_preview_refresh(&self);

    /// Refresh the project file tree.
    fn refresh_file_tree(&self);

    /// A turn has ended.
    fn on_turn_end(&self);

    /// Open the connection dialog for an integration.
    fn open_integration_modal(&self, integration: &str);

    /// Current integration connection status.
    fn integration_connection_hints(&self) -> IntegrationHints {
        IntegrationHints::default()
    }
}

/// A queued [`HostDependencies`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEffect {
    /// `set_loading`.
    SetLoading(bool),
    /// `trigger_live_preview_refresh`.
    LivePreviewRefresh,
    /// `refresh_file_tree`.
    FileTreeRefresh,
    /// `on_turn_end`.
    TurnEnd,
    /// `open_integration_modal`.
    OpenIntegrationModal(String),
}

impl HostEffect {
    /// Deliver the effect to the host.
    pub fn apply(&self, deps: &dyn HostDependencies) {
        match self {
            Self::SetLoading(loading) => deps.set_loading(*loading),
            Self::LivePreviewRefresh => deps.trigger_live_preview_refresh(),
            Self::FileTreeRefresh => deps.refresh_file_tree(),
            Self::TurnEnd => deps.on_turn_end(),
            Self::OpenIntegrationModal(integration) => deps.open_integration_modal(integration),
        }
    }
}
