//! Recording host fakes shared by the integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rill_core::{ChatEvent, ChatMessage, MessageId, SessionId};
use rill_stream::{
    EnsureToolOptions, EventProcessor, FinalizeOptions, HostDependencies, IntegrationHints,
    MessageBufferHandlers, ProcessOptions, ProcessOutcome, ProcessorConfig, ToolBuffer,
    ToolPreview,
};
use serde_json::Value;

/// One recorded host call.
#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    EnsureAssistant(MessageId),
    AppendAssistant(MessageId, String),
    FinalizeAssistant(MessageId, String),
    EnsureReasoning(MessageId),
    AppendReasoning(MessageId, String),
    FinalizeReasoning(MessageId, Option<String>, bool),
    EnsureTool {
        key: String,
        title: Option<String>,
        create_entry: bool,
    },
    AppendTool(String, String),
    ToolPreview(String, String),
    FinalizeTool(String, Option<String>),
    Upsert(ChatMessage),
    SetLoading(bool),
    PreviewRefresh,
    FileTreeRefresh,
    TurnEnd,
    OpenModal(String),
}

/// Host that records every call in order.
#[derive(Default)]
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    hints: Mutex<IntegrationHints>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hints(hints: IntegrationHints) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            hints: Mutex::new(hints),
        }
    }

    fn push(&self, call: Call) {
        self.calls.lock().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().clear();
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().is_empty()
    }

    /// Calls that are host side effects rather than buffer mutations.
    pub fn side_effects(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    Call::SetLoading(_) | Call::PreviewRefresh | Call::FileTreeRefresh | Call::TurnEnd
                )
            })
            .collect()
    }

    pub fn finalized_assistant_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::FinalizeAssistant(_, text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn upserts(&self) -> Vec<ChatMessage> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Upsert(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    pub fn finalized_tools(&self) -> Vec<(String, Option<String>)> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::FinalizeTool(key, text) => Some((key, text)),
                _ => None,
            })
            .collect()
    }

    pub fn previews(&self, key: &str) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ToolPreview(k, title) if k == key => Some(title),
                _ => None,
            })
            .collect()
    }
}

impl MessageBufferHandlers for Recorder {
    fn ensure_assistant_message(&self, _: &SessionId, id: &MessageId, _: DateTime<Utc>) {
        self.push(Call::EnsureAssistant(id.clone()));
    }

    fn append_assistant_text(&self, _: &SessionId, id: &MessageId, text: &str, _: DateTime<Utc>) {
        self.push(Call::AppendAssistant(id.clone(), text.to_string()));
    }

    fn finalize_assistant_text(&self, _: &SessionId, id: &MessageId, text: &str, _: DateTime<Utc>) {
        self.push(Call::FinalizeAssistant(id.clone(), text.to_string()));
    }

    fn ensure_reasoning_message(&self, _: &SessionId, id: &MessageId, _: DateTime<Utc>) {
        self.push(Call::EnsureReasoning(id.clone()));
    }

    fn append_reasoning_text(&self, _: &SessionId, id: &MessageId, text: &str, _: DateTime<Utc>) {
        self.push(Call::AppendReasoning(id.clone(), text.to_string()));
    }

    fn finalize_reasoning_text(
        &self,
        _: &SessionId,
        id: &MessageId,
        text: Option<&str>,
        _: DateTime<Utc>,
        options: FinalizeOptions,
    ) {
        self.push(Call::FinalizeReasoning(
            id.clone(),
            text.map(str::to_string),
            options.keep_streaming,
        ));
    }

    fn ensure_tool_message(
        &self,
        _: &SessionId,
        key: &str,
        tool: &ToolBuffer,
        options: EnsureToolOptions,
    ) {
        self.push(Call::EnsureTool {
            key: key.to_string(),
            title: tool.title().map(str::to_string),
            create_entry: options.create_entry,
        });
    }

    fn append_tool_text(&self, _: &SessionId, key: &str, text: &str, _: DateTime<Utc>, _: Option<&str>) {
        self.push(Call::AppendTool(key.to_string(), text.to_string()));
    }

    fn apply_tool_preview(&self, _: &SessionId, key: &str, preview: &ToolPreview, _: DateTime<Utc>) {
        self.push(Call::ToolPreview(key.to_string(), preview.title.clone()));
    }

    fn finalize_tool_text(&self, _: &SessionId, key: &str, text: Option<&str>, _: DateTime<Utc>) {
        self.push(Call::FinalizeTool(key.to_string(), text.map(str::to_string)));
    }

    fn upsert_message(&self, _: &SessionId, message: &ChatMessage) {
        self.push(Call::Upsert(message.clone()));
    }
}

impl HostDependencies for Recorder {
    fn set_loading(&self, loading: bool) {
        self.push(Call::SetLoading(loading));
    }

    fn trigger_live_preview_refresh(&self) {
        self.push(Call::PreviewRefresh);
    }

    fn refresh_file_tree(&self) {
        self.push(Call::FileTreeRefresh);
    }

    fn on_turn_end(&self) {
        self.push(Call::TurnEnd);
    }

    fn open_integration_modal(&self, integration: &str) {
        self.push(Call::OpenModal(integration.to_string()));
    }

    fn integration_connection_hints(&self) -> IntegrationHints {
        *self.hints.lock()
    }
}

pub fn processor() -> EventProcessor {
    EventProcessor::new(ProcessorConfig::default()).unwrap()
}

pub fn event(session: &str, sequence: i64, name: &str, raw: Value) -> ChatEvent {
    ChatEvent::new(session, sequence, name, raw)
}

pub fn send(processor: &EventProcessor, host: &Recorder, event: &ChatEvent) -> ProcessOutcome {
    processor.process(event, host, host, ProcessOptions::default())
}

pub fn replay(processor: &EventProcessor, host: &Recorder, event: &ChatEvent) -> ProcessOutcome {
    processor.process(event, host, host, ProcessOptions::replay())
}
