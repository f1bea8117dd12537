//! Per-event processing context.
//!
//! [`EventContext`] pairs the locked session state with the host handles
//! and owns the buffer bookkeeping every adapter shares: opening buffers
//! lazily, idempotent finalization, and the tool title-stability rule.

use chrono::{DateTime, Utc};
use rill_core::{ChatMessage, SessionId};
use tracing::debug;

use crate::format::Formatter;
use crate::host::{
    EnsureToolOptions, FinalizeOptions, HostEffect, IntegrationHints, MessageBufferHandlers,
};
use crate::state::{SessionState, StreamBuffer, TitleSource, ToolBuffer, ToolPreview};

/// Per-call processing options.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProcessOptions {
    /// Historical re-delivery: advance the watermark only.
    pub replay: bool,
}

impl ProcessOptions {
    /// Options for replayed traffic.
    #[must_use]
    pub fn replay() -> Self {
        Self { replay: true }
    }
}

/// Everything an adapter needs to process one event.
pub struct EventContext<'a> {
    /// The session's state, locked for the duration of the event.
    pub state: &'a mut SessionState,
    /// Buffer mutation surface.
    pub handlers: &'a dyn MessageBufferHandlers,
    /// Connection status reported by the host before the event was locked.
    pub hints: IntegrationHints,
    /// Formatting configuration.
    pub formatter: &'a Formatter,
    /// Processing options.
    pub options: ProcessOptions,
    /// Creation time of the event being processed.
    pub created_at: DateTime<Utc>,
    effects: Vec<HostEffect>,
}

impl<'a> EventContext<'a> {
    /// Bundle the state and host handles for one event.
    pub fn new(
        state: &'a mut SessionState,
        handlers: &'a dyn MessageBufferHandlers,
        formatter: &'a Formatter,
        options: ProcessOptions,
        hints: IntegrationHints,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            state,
            handlers,
            hints,
            formatter,
            options,
            created_at,
            effects: Vec::new(),
        }
    }

    /// The session being processed.
    pub fn session_id(&self) -> SessionId {
        self.state.session_id.clone()
    }

    // ── assistant text ──────────────────────────────────────────────────

    fn ensure_assistant(&mut self) {
        if self.state.assistant.is_none() {
            let buffer = StreamBuffer::new(self.created_at);
            self.handlers.ensure_assistant_message(
                &self.state.session_id,
                &buffer.message_id,
                self.created_at,
            );
            self.state.assistant = Some(buffer);
        }
    }

    /// Append streamed assistant text.
    pub fn append_assistant(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.ensure_assistant();
        if let Some(buffer) = self.state.assistant.as_mut() {
            buffer.content.push_str(text);
            self.handlers.append_assistant_text(
                &self.state.session_id,
                &buffer.message_id,
                text,
                self.created_at,
            );
        }
    }

    /// Finalize the assistant buffer. `text` replaces the streamed content;
    /// with no buffer and no text this is a no-op.
    pub fn finalize_assistant(&mut self, text: Option<&str>) {
        let text = text.filter(|t| !t.is_empty());
        if self.state.assistant.is_none() && text.is_none() {
            return;
        }
        self.ensure_assistant();
        if let Some(buffer) = self.state.assistant.take() {
            let final_text = text.unwrap_or(&buffer.content);
            self.handlers.finalize_assistant_text(
                &self.state.session_id,
                &buffer.message_id,
                final_text,
                self.created_at,
            );
        }
    }

    // ── reasoning text ──────────────────────────────────────────────────

    /// Open a reasoning buffer if none is in flight.
    pub fn ensure_reasoning(&mut self) {
        if self.state.reasoning.is_none() {
            let buffer = StreamBuffer::new(self.created_at);
            self.handlers.ensure_reasoning_message(
                &self.state.session_id,
                &buffer.message_id,
                self.created_at,
            );
            self.state.reasoning = Some(buffer);
        }
    }

    /// Append streamed reasoning text.
    pub fn append_reasoning(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        self.ensure_reasoning();
        if let Some(buffer) = self.state.reasoning.as_mut() {
            buffer.content.push_str(text);
            self.handlers.append_reasoning_text(
                &self.state.session_id,
                &buffer.message_id,
                text,
                self.created_at,
            );
        }
    }

    /// Finalize the reasoning buffer; no-op when nothing is in flight and
    /// no text is supplied.
    pub fn finalize_reasoning(&mut self, text: Option<&str>, keep_streaming: bool) {
        let text = text.filter(|t| !t.is_empty());
        if self.state.reasoning.is_none() && text.is_none() {
            return;
        }
        self.ensure_reasoning();
        if let Some(buffer) = self.state.reasoning.take() {
            self.handlers.finalize_reasoning_text(
                &self.state.session_id,
                &buffer.message_id,
                text,
                self.created_at,
                FinalizeOptions { keep_streaming },
            );
        }
    }

    /// Finalize reasoning then assistant text.
    pub fn flush_buffers(&mut self, keep_streaming: bool) {
        self.finalize_reasoning(None, keep_streaming);
        self.finalize_assistant(None);
    }

    // ── tool calls ──────────────────────────────────────────────────────

    /// Register a tool call under `key` if it is not known yet. A known
    /// call without a name picks up `tool_name`.
    pub fn ensure_tool(&mut self, key: &str, tool_name: Option<&str>) {
        if let Some(existing) = self.state.tool_messages.get_mut(key) {
            if existing.tool_name.is_none() {
                existing.tool_name = tool_name.map(str::to_string);
            }
            return;
        }
        let tool = ToolBuffer::new(key, tool_name, self.created_at);
        self.handlers.ensure_tool_message(
            &self.state.session_id,
            key,
            &tool,
            EnsureToolOptions {
                create_entry: false,
            },
        );
        debug!(session_id = %self.state.session_id, tool_key = key, tool_name, "tool registered");
        let _ = self.state.tool_messages.insert(key.to_string(), tool);
    }

    /// Tool buffer for `key`.
    pub fn tool(&self, key: &str) -> Option<&ToolBuffer> {
        self.state.tool_messages.get(key)
    }

    /// Mutable tool buffer for `key`.
    pub fn tool_mut(&mut self, key: &str) -> Option<&mut ToolBuffer> {
        self.state.tool_messages.get_mut(key)
    }

    /// Whether the tool call under `key` has been finalized.
    pub fn tool_finalized(&self, key: &str) -> bool {
        self.tool(key).is_some_and(|t| t.finalized)
    }

    /// Set a tool's title and push a preview.
    ///
    /// A partial title is applied only while the call has no title and is
    /// still open; a complete title always replaces the current one.
    /// Returns whether the title changed.
    pub fn set_tool_title(
        &mut self,
        key: &str,
        title: &str,
        primary_argument: Option<&str>,
        source: TitleSource,
    ) -> bool {
        let Some(tool) = self.state.tool_messages.get_mut(key) else {
            return false;
        };
        if source == TitleSource::Partial && (tool.buffer.title.is_some() || tool.finalized) {
            return false;
        }
        if tool.buffer.title.as_deref() == Some(title) {
            tool.title_source = Some(source);
            return false;
        }
        tool.buffer.title = Some(title.to_string());
        tool.buffer.content = title.to_string();
        tool.title_source = Some(source);
        let preview = ToolPreview {
            title: title.to_string(),
            tool_name: tool.tool_name.clone(),
            primary_argument: primary_argument.map(str::to_string),
        };
        tool.preview = Some(preview.clone());
        if !tool.entry_created {
            tool.entry_created = true;
            self.handlers.ensure_tool_message(
                &self.state.session_id,
                key,
                tool,
                EnsureToolOptions { create_entry: true },
            );
        }
        if !tool.finalized {
            self.handlers
                .apply_tool_preview(&self.state.session_id, key, &preview, self.created_at);
        }
        true
    }

    /// Append output text to an open tool entry.
    pub fn append_tool_text(&mut self, key: &str, text: &str) {
        let Some(tool) = self.state.tool_messages.get_mut(key) else {
            return;
        };
        if tool.finalized || text.is_empty() {
            return;
        }
        tool.buffer.content.push_str(text);
        self.handlers.append_tool_text(
            &self.state.session_id,
            key,
            text,
            self.created_at,
            tool.buffer.title.as_deref(),
        );
    }

    /// Finalize a tool entry. `text` defaults to the title. Finalizing an
    /// unknown or already-finalized call is a no-op.
    pub fn finalize_tool(&mut self, key: &str, text: Option<&str>) {
        let Some(tool) = self.state.tool_messages.get_mut(key) else {
            return;
        };
        if tool.finalized {
            return;
        }
        tool.finalized = true;
        if !tool.entry_created {
            tool.entry_created = true;
            self.handlers.ensure_tool_message(
                &self.state.session_id,
                key,
                tool,
                EnsureToolOptions { create_entry: true },
            );
        }
        let text = text.or(tool.buffer.title.as_deref());
        self.handlers
            .finalize_tool_text(&self.state.session_id, key, text, self.created_at);
    }

    /// Register, title and finalize a tool entry in one step.
    pub fn one_shot_tool(&mut self, key: &str, tool_name: &str, title: &str, body: Option<&str>) {
        self.ensure_tool(key, Some(tool_name));
        let _ = self.set_tool_title(key, title, None, TitleSource::Complete);
        self.finalize_tool(key, body.or(Some(title)));
    }

    // ── host side effects ───────────────────────────────────────────────

    /// Queue a live-preview refresh unless replaying.
    pub fn refresh_preview(&mut self) {
        if !self.options.replay {
            self.effects.push(HostEffect::LivePreviewRefresh);
        }
    }

    /// Queue a side effect for delivery once the session is unlocked.
    pub fn queue(&mut self, effect: HostEffect) {
        self.effects.push(effect);
    }

    /// Drain the queued side effects in the order they were raised.
    pub fn take_effects(&mut self) -> Vec<HostEffect> {
        std::mem::take(&mut self.effects)
    }

    /// Insert or replace a standalone message.
    pub fn upsert(&self, message: &ChatMessage) {
        self.handlers.upsert_message(&self.state.session_id, message);
    }
}
