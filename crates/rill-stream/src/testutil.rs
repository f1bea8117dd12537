//! Shared test utilities for adapter unit tests.
//!
//! Provides `NullHost`, a host that ignores every call, and `run_events()`
//! for driving an adapter directly against a `SessionState`.

use chrono::{DateTime, Utc};
use rill_core::{ChatEvent, ChatMessage, MessageId, SessionId};
use serde_json::Value;

use crate::adapters::ProviderAdapter;
use crate::context::{EventContext, ProcessOptions};
use crate::format::Formatter;
use crate::host::{
    EnsureToolOptions, FinalizeOptions, HostDependencies, IntegrationHints, MessageBufferHandlers,
};
use crate::state::{SessionState, ToolBuffer, ToolPreview};

/// Host that accepts and ignores every call.
pub struct NullHost;

impl MessageBufferHandlers for NullHost {
    fn ensure_assistant_message(&self, _: &SessionId, _: &MessageId, _: DateTime<Utc>) {}
    fn append_assistant_text(&self, _: &SessionId, _: &MessageId, _: &str, _: DateTime<Utc>) {}
    fn finalize_assistant_text(&self, _: &SessionId, _: &MessageId, _: &str, _: DateTime<Utc>) {}
    fn ensure_reasoning_message(&self, _: &SessionId, _: &MessageId, _: DateTime<Utc>) {}
    fn append_reasoning_text(&self, _: &SessionId, _: &MessageId, _: &str, _: DateTime<Utc>) {}
    fn finalize_reasoning_text(
        &self,
        _: &SessionId,
        _: &MessageId,
        _: Option<&str>,
        _: DateTime<Utc>,
        _: FinalizeOptions,
    ) {
    }
    fn ensure_tool_message(&self, _: &SessionId, _: &str, _: &ToolBuffer, _: EnsureToolOptions) {}
    fn append_tool_text(&self, _: &SessionId, _: &str, _: &str, _: DateTime<Utc>, _: Option<&str>) {
    }
    fn apply_tool_preview(&self, _: &SessionId, _: &str, _: &ToolPreview, _: DateTime<Utc>) {}
    fn finalize_tool_text(&self, _: &SessionId, _: &str, _: Option<&str>, _: DateTime<Utc>) {}
    fn upsert_message(&self, _: &SessionId, _: &ChatMessage) {}
}

impl HostDependencies for NullHost {
    fn set_loading(&self, _: bool) {}
    fn trigger_live_preview_refresh(&self) {}
    fn refresh_file_tree(&self) {}
    fn on_turn_end(&self) {}
    fn open_integration_modal(&self, _: &str) {}
}

/// Feed `(name, raw)` events straight into an adapter, bypassing the router.
pub fn run_events(adapter: &dyn ProviderAdapter, state: &mut SessionState, events: &[(&str, Value)]) {
    let formatter = Formatter::default();
    for (name, raw) in events {
        let event = ChatEvent::new(state.session_id.clone(), 0, *name, raw.clone());
        let mut ctx = EventContext::new(
            state,
            &NullHost,
            &formatter,
            ProcessOptions::default(),
            IntegrationHints::default(),
            Utc::now(),
        );
        adapter.process(&event, &mut ctx);
    }
}
