//! Console host: renders processor output as a plain-text transcript.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rill_core::{ChatMessage, MessageId, MessageVariant, SessionId};
use rill_stream::{
    EnsureToolOptions, FinalizeOptions, HostDependencies, IntegrationHints, MessageBufferHandlers,
    ToolBuffer, ToolPreview,
};
use tracing::{debug, info};

/// Kind of a transcript entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryKind {
    /// Assistant text.
    Assistant,
    /// Reasoning text.
    Reasoning,
    /// Tool call.
    Tool,
    /// System notice.
    System,
    /// Secrets form.
    Secrets,
    /// Integration prompt.
    Integration,
}

impl EntryKind {
    fn label(self) -> &'static str {
        match self {
            Self::Assistant => "assistant",
            Self::Reasoning => "reasoning",
            Self::Tool => "tool",
            Self::System => "system",
            Self::Secrets => "secrets",
            Self::Integration => "integration",
        }
    }
}

/// One rendered message.
#[derive(Clone, Debug)]
pub struct Entry {
    /// Owning session.
    pub session_id: SessionId,
    /// Entry kind.
    pub kind: EntryKind,
    /// Title, if any.
    pub title: Option<String>,
    /// Current text.
    pub text: String,
    /// Whether the entry was finalized.
    pub finalized: bool,
}

/// Ordered transcript plus side-effect counters.
#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    /// Live-preview refresh requests.
    pub preview_refreshes: usize,
    /// File-tree refresh requests.
    pub file_tree_refreshes: usize,
    /// Completed turns.
    pub turns: usize,
}

impl Transcript {
    /// Entries in creation order.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    fn entry(&mut self, slot: String, session_id: &SessionId, kind: EntryKind) -> &mut Entry {
        let position = match self.index.get(&slot) {
            Some(&position) => position,
            None => {
                self.entries.push(Entry {
                    session_id: session_id.clone(),
                    kind,
                    title: None,
                    text: String::new(),
                    finalized: false,
                });
                let position = self.entries.len() - 1;
                let _ = self.index.insert(slot, position);
                position
            }
        };
        &mut self.entries[position]
    }
}

impl fmt::Display for Transcript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for entry in &self.entries {
            let marker = if entry.finalized { "" } else { " (streaming)" };
            match &entry.title {
                Some(title) => writeln!(
                    f,
                    "[{}] {}{marker}: {title}",
                    entry.session_id,
                    entry.kind.label()
                )?,
                None => writeln!(f, "[{}] {}{marker}:", entry.session_id, entry.kind.label())?,
            }
            for line in entry.text.lines() {
                writeln!(f, "    {line}")?;
            }
        }
        writeln!(
            f,
            "-- {} turn(s), {} preview refresh(es), {} file-tree refresh(es)",
            self.turns, self.preview_refreshes, self.file_tree_refreshes
        )
    }
}

fn tool_slot(session_id: &SessionId, key: &str) -> String {
    format!("tool:{session_id}:{key}")
}

/// Host that accumulates a [`Transcript`].
pub struct ConsoleHost {
    transcript: Mutex<Transcript>,
    hints: IntegrationHints,
}

impl ConsoleHost {
    /// Host reporting the given integration status.
    pub fn new(hints: IntegrationHints) -> Self {
        Self {
            transcript: Mutex::new(Transcript::default()),
            hints,
        }
    }

    /// Render the transcript.
    pub fn render(&self) -> String {
        self.transcript.lock().to_string()
    }

    /// Run `f` against the transcript.
    pub fn with_transcript<R>(&self, f: impl FnOnce(&Transcript) -> R) -> R {
        f(&self.transcript.lock())
    }

    fn update(
        &self,
        slot: String,
        session_id: &SessionId,
        kind: EntryKind,
        f: impl FnOnce(&mut Entry),
    ) {
        let mut transcript = self.transcript.lock();
        f(transcript.entry(slot, session_id, kind));
    }
}

impl MessageBufferHandlers for ConsoleHost {
    fn ensure_assistant_message(&self, session_id: &SessionId, id: &MessageId, _: DateTime<Utc>) {
        self.update(id.to_string(), session_id, EntryKind::Assistant, |_| {});
    }

    fn append_assistant_text(
        &self,
        session_id: &SessionId,
        id: &MessageId,
        text: &str,
        _: DateTime<Utc>,
    ) {
        self.update(id.to_string(), session_id, EntryKind::Assistant, |e| {
            e.text.push_str(text);
        });
    }

    fn finalize_assistant_text(
        &self,
        session_id: &SessionId,
        id: &MessageId,
        text: &str,
        _: DateTime<Utc>,
    ) {
        self.update(id.to_string(), session_id, EntryKind::Assistant, |e| {
            e.text = text.to_string();
            e.finalized = true;
        });
    }

    fn ensure_reasoning_message(&self, session_id: &SessionId, id: &MessageId, _: DateTime<Utc>) {
        self.update(id.to_string(), session_id, EntryKind::Reasoning, |_| {});
    }

    fn append_reasoning_text(
        &self,
        session_id: &SessionId,
        id: &MessageId,
        text: &str,
        _: DateTime<Utc>,
    ) {
        self.update(id.to_string(), session_id, EntryKind::Reasoning, |e| {
            e.text.push_str(text);
        });
    }

    fn finalize_reasoning_text(
        &self,
        session_id: &SessionId,
        id: &MessageId,
        text: Option<&str>,
        _: DateTime<Utc>,
        _: FinalizeOptions,
    ) {
        self.update(id.to_string(), session_id, EntryKind::Reasoning, |e| {
            if let Some(text) = text {
                e.text = text.to_string();
            }
            e.finalized = true;
        });
    }

    fn ensure_tool_message(
        &self,
        session_id: &SessionId,
        key: &str,
        tool: &ToolBuffer,
        options: EnsureToolOptions,
    ) {
        if !options.create_entry {
            debug!(session_id = %session_id, tool_key = key, "tool registered without entry");
            return;
        }
        let title = tool.title().map(str::to_string);
        self.update(tool_slot(session_id, key), session_id, EntryKind::Tool, |e| {
            e.title = title;
        });
    }

    fn append_tool_text(
        &self,
        session_id: &SessionId,
        key: &str,
        text: &str,
        _: DateTime<Utc>,
        _: Option<&str>,
    ) {
        self.update(tool_slot(session_id, key), session_id, EntryKind::Tool, |e| {
            e.text.push_str(text);
        });
    }

    fn apply_tool_preview(
        &self,
        session_id: &SessionId,
        key: &str,
        preview: &ToolPreview,
        _: DateTime<Utc>,
    ) {
        self.update(tool_slot(session_id, key), session_id, EntryKind::Tool, |e| {
            e.title = Some(preview.title.clone());
        });
    }

    fn finalize_tool_text(
        &self,
        session_id: &SessionId,
        key: &str,
        text: Option<&str>,
        _: DateTime<Utc>,
    ) {
        self.update(tool_slot(session_id, key), session_id, EntryKind::Tool, |e| {
            if let Some(text) = text.filter(|t| Some(*t) != e.title.as_deref()) {
                e.text = text.to_string();
            }
            e.finalized = true;
        });
    }

    fn upsert_message(&self, session_id: &SessionId, message: &ChatMessage) {
        let kind = match message.variant {
            MessageVariant::SecretsRequest => EntryKind::Secrets,
            MessageVariant::IntegrationPrompt => EntryKind::Integration,
            MessageVariant::System | MessageVariant::Chat => EntryKind::System,
        };
        self.update(message.id.to_string(), session_id, kind, |e| {
            e.title.clone_from(&message.title);
            e.text.clone_from(&message.content);
            e.finalized = true;
        });
    }
}

impl HostDependencies for ConsoleHost {
    fn set_loading(&self, loading: bool) {
        debug!(loading, "loading indicator");
    }

    fn trigger_live_preview_refresh(&self) {
        self.transcript.lock().preview_refreshes += 1;
    }

    fn refresh_file_tree(&self) {
        self.transcript.lock().file_tree_refreshes += 1;
    }

    fn on_turn_end(&self) {
        self.transcript.lock().turns += 1;
    }

    fn open_integration_modal(&self, integration: &str) {
        info!(integration, "integration modal requested");
    }

    fn integration_connection_hints(&self) -> IntegrationHints {
        self.hints
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
