//! Per-session processor state.
//!
//! A [`SessionState`] holds everything the processor remembers between two
//! events of one session: in-flight text buffers, tool-call buffers, the
//! tool-key alias table, the sequence watermark, and scratch space owned by
//! individual adapters.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rill_core::{MessageId, SessionId};
use serde_json::{Map, Value};

use crate::format::parse_partial_json;

/// An in-progress piece of text tied to one rendered message.
#[derive(Clone, Debug)]
pub struct StreamBuffer {
    /// ID of the rendered message this buffer feeds.
    pub message_id: MessageId,
    /// Text accumulated so far.
    pub content: String,
    /// Display title, if any.
    pub title: Option<String>,
    /// Creation time of the event that opened the buffer.
    pub start_time: DateTime<Utc>,
}

impl StreamBuffer {
    /// Open an empty buffer with a fresh message ID.
    #[must_use]
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            message_id: MessageId::new(),
            content: String::new(),
            title: None,
            start_time,
        }
    }
}

/// Accumulated tool-call input.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum ToolInput {
    /// Nothing received yet.
    #[default]
    Empty,
    /// Concatenated JSON fragments, possibly incomplete.
    Partial(String),
    /// A complete input object.
    Parsed(Map<String, Value>),
}

impl ToolInput {
    /// Append a streamed fragment. A previously parsed object is discarded:
    /// once fragments arrive they are the source of truth.
    pub fn push_fragment(&mut self, fragment: &str) {
        match self {
            Self::Partial(buf) => buf.push_str(fragment),
            _ => *self = Self::Partial(fragment.to_string()),
        }
    }

    /// Best-effort view of the input; tolerates truncated JSON.
    pub fn best_effort(&self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Partial(text) => parse_partial_json(text),
            Self::Parsed(map) => Some(Value::Object(map.clone())),
        }
    }

    /// Strict view of the input; `None` unless it parses completely.
    pub fn complete(&self) -> Option<Value> {
        match self {
            Self::Empty => None,
            Self::Partial(text) if text.trim().is_empty() => Some(Value::Object(Map::new())),
            Self::Partial(text) => serde_json::from_str::<Value>(text)
                .ok()
                .filter(Value::is_object),
            Self::Parsed(map) => Some(Value::Object(map.clone())),
        }
    }
}

/// Where a tool title was derived from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TitleSource {
    /// Derived from a best-effort parse of incomplete input.
    Partial,
    /// Derived from a complete input object.
    Complete,
}

/// Preview data pushed to the host while a tool call streams.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolPreview {
    /// Display title (`"[Read] src/app.ts"`).
    pub title: String,
    /// Tool name as reported by the provider.
    pub tool_name: Option<String>,
    /// Extracted primary argument, if any.
    pub primary_argument: Option<String>,
}

/// One streamed tool call.
#[derive(Clone, Debug)]
pub struct ToolBuffer {
    /// Stable key; see [`ToolKeyRegistry`].
    pub key: String,
    /// Message ID, content and title of the rendered entry.
    pub buffer: StreamBuffer,
    /// Tool name as reported by the provider.
    pub tool_name: Option<String>,
    /// Accumulated input.
    pub raw_input: ToolInput,
    /// Last preview pushed to the host.
    pub preview: Option<ToolPreview>,
    /// Provenance of the current title.
    pub title_source: Option<TitleSource>,
    /// Whether the host has been asked to create a visible entry.
    pub entry_created: bool,
    /// Whether the entry has been finalized.
    pub finalized: bool,
}

impl ToolBuffer {
    /// Register a tool call with no title yet.
    #[must_use]
    pub fn new(key: &str, tool_name: Option<&str>, start_time: DateTime<Utc>) -> Self {
        Self {
            key: key.to_string(),
            buffer: StreamBuffer::new(start_time),
            tool_name: tool_name.map(str::to_string),
            raw_input: ToolInput::Empty,
            preview: None,
            title_source: None,
            entry_created: false,
            finalized: false,
        }
    }

    /// Current display title.
    pub fn title(&self) -> Option<&str> {
        self.buffer.title.as_deref()
    }
}

/// Bidirectional alias table mapping volatile tool identifiers to one stable key.
///
/// Providers address a streamed tool call by opaque id in one chunk and by
/// positional index in the next. Every alias seen for a call resolves to the
/// key chosen when the call was first sighted. Index aliases are re-pointed
/// when a new id claims the same position, since indices restart with each
/// assistant message while ids never repeat.
#[derive(Clone, Debug, Default)]
pub struct ToolKeyRegistry {
    aliases: HashMap<String, String>,
    by_key: HashMap<String, Vec<String>>,
    anonymous: u64,
}

fn index_alias(index: u64) -> String {
    format!("index:{index}")
}

impl ToolKeyRegistry {
    /// Resolve (allocating if needed) the stable key for an id and/or index.
    pub fn resolve(&mut self, id: Option<&str>, index: Option<u64>) -> String {
        let id = id.map(str::trim).filter(|id| !id.is_empty());
        let key = match id {
            Some(id) => self.aliases.get(id).cloned().unwrap_or_else(|| id.to_string()),
            None => match index.and_then(|i| self.aliases.get(&index_alias(i)).cloned()) {
                Some(key) => key,
                None => self.next_anonymous(),
            },
        };
        if let Some(id) = id {
            self.bind(id.to_string(), &key);
        }
        if let Some(index) = index {
            self.bind(index_alias(index), &key);
        }
        key
    }

    /// Allocate a fresh anonymous key, re-pointing `index` at it.
    pub fn allocate(&mut self, index: Option<u64>) -> String {
        let key = self.next_anonymous();
        if let Some(index) = index {
            self.bind(index_alias(index), &key);
        }
        key
    }

    /// Look up a key without allocating.
    pub fn lookup(&self, id: Option<&str>, index: Option<u64>) -> Option<&str> {
        id.and_then(|id| self.aliases.get(id))
            .or_else(|| index.and_then(|i| self.aliases.get(&index_alias(i))))
            .map(String::as_str)
    }

    /// Every alias currently bound to `key`.
    pub fn aliases_of(&self, key: &str) -> &[String] {
        self.by_key.get(key).map_or(&[], Vec::as_slice)
    }

    /// Drop a key and all of its aliases.
    pub fn forget(&mut self, key: &str) {
        if let Some(aliases) = self.by_key.remove(key) {
            for alias in aliases {
                let _ = self.aliases.remove(&alias);
            }
        }
    }

    /// Number of bound aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Whether no alias is bound.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn next_anonymous(&mut self) -> String {
        self.anonymous += 1;
        format!("tool-{}", self.anonymous)
    }

    fn bind(&mut self, alias: String, key: &str) {
        if let Some(previous) = self.aliases.insert(alias.clone(), key.to_string()) {
            if previous == key {
                return;
            }
            if let Some(list) = self.by_key.get_mut(&previous) {
                list.retain(|a| a != &alias);
            }
        }
        self.by_key.entry(key.to_string()).or_default().push(alias);
    }
}

/// Kind of an open Claude content block, by index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClaudeBlockKind {
    /// Assistant text.
    Text,
    /// Chain-of-thought.
    Thinking,
    /// Tool invocation.
    Tool,
}

/// Claude adapter scratch space.
#[derive(Clone, Debug, Default)]
pub struct ClaudeScratch {
    /// Open content blocks keyed by block index.
    pub block_kinds: HashMap<u64, ClaudeBlockKind>,
}

/// Classification of a Codex output item.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodexItemKind {
    /// Assistant message.
    Message,
    /// Reasoning summary.
    Reasoning,
    /// JSON-argument function call.
    FunctionCall,
    /// Free-form custom tool call (e.g. `apply_patch`).
    CustomToolCall,
    /// Hosted web search.
    WebSearch,
    /// Anything else; ignored.
    Other(String),
}

/// Codex adapter scratch space, keyed by stable tool key.
#[derive(Clone, Debug, Default)]
pub struct CodexScratch {
    /// Item classification.
    pub items: HashMap<String, CodexItemKind>,
    /// Streamed function-call arguments.
    pub argument_buffers: HashMap<String, String>,
    /// Streamed custom-tool input.
    pub custom_buffers: HashMap<String, String>,
}

/// Everything the processor remembers about one session.
#[derive(Clone, Debug)]
pub struct SessionState {
    /// Owning session.
    pub session_id: SessionId,
    /// In-flight assistant text.
    pub assistant: Option<StreamBuffer>,
    /// In-flight reasoning text.
    pub reasoning: Option<StreamBuffer>,
    /// Tool buffers keyed by stable key.
    pub tool_messages: HashMap<String, ToolBuffer>,
    /// Alias table for tool keys.
    pub tool_keys: ToolKeyRegistry,
    /// Highest sequence accepted so far.
    pub last_sequence: Option<i64>,
    /// Whether a turn is in progress.
    pub busy: bool,
    /// Claude/GLM scratch.
    pub claude: ClaudeScratch,
    /// Codex scratch.
    pub codex: CodexScratch,
}

impl SessionState {
    /// Fresh state for a session.
    #[must_use]
    pub fn new(session_id: SessionId) -> Self {
        Self {
            session_id,
            assistant: None,
            reasoning: None,
            tool_messages: HashMap::new(),
            tool_keys: ToolKeyRegistry::default(),
            last_sequence: None,
            busy: false,
            claude: ClaudeScratch::default(),
            codex: CodexScratch::default(),
        }
    }

    /// Advance the watermark. Returns `false` for a duplicate or stale sequence.
    pub fn accept_sequence(&mut self, sequence: i64) -> bool {
        if self.last_sequence.is_some_and(|last| sequence <= last) {
            return false;
        }
        self.last_sequence = Some(sequence);
        true
    }

    /// Discard buffers, tool calls, aliases and scratch. The watermark
    /// survives so already-seen events stay deduplicated.
    pub fn reset(&mut self) {
        let last_sequence = self.last_sequence;
        *self = Self::new(self.session_id.clone());
        self.last_sequence = last_sequence;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ── sequence watermark ──────────────────────────────────────────────

    #[test]
    fn accepts_increasing_sequences() {
        let mut state = SessionState::new("s1".into());
        assert!(state.accept_sequence(1));
        assert!(state.accept_sequence(5));
        assert_eq!(state.last_sequence, Some(5));
    }

    #[test]
    fn rejects_duplicate_and_stale_sequences() {
        let mut state = SessionState::new("s1".into());
        assert!(state.accept_sequence(5));
        assert!(!state.accept_sequence(5));
        assert!(!state.accept_sequence(3));
        assert_eq!(state.last_sequence, Some(5));
    }

    #[test]
    fn reset_keeps_watermark() {
        let mut state = SessionState::new("s1".into());
        let _ = state.accept_sequence(7);
        state.assistant = Some(StreamBuffer::new(Utc::now()));
        let _ = state.tool_keys.resolve(Some("abc"), Some(0));
        state.reset();
        assert!(state.assistant.is_none());
        assert!(state.tool_keys.is_empty());
        assert_eq!(state.last_sequence, Some(7));
    }

    // ── key registry ────────────────────────────────────────────────────

    #[test]
    fn id_then_index_resolve_to_same_key() {
        let mut keys = ToolKeyRegistry::default();
        let first = keys.resolve(Some("abc"), Some(2));
        assert_eq!(first, "abc");
        assert_eq!(keys.resolve(None, Some(2)), "abc");
        assert_eq!(keys.lookup(None, Some(2)), Some("abc"));
    }

    #[test]
    fn anonymous_index_key_is_reused() {
        let mut keys = ToolKeyRegistry::default();
        assert_eq!(keys.resolve(None, Some(0)), "tool-1");
        assert_eq!(keys.resolve(None, Some(0)), "tool-1");
        assert_eq!(keys.resolve(None, Some(1)), "tool-2");
    }

    #[test]
    fn new_id_repoints_reused_index() {
        let mut keys = ToolKeyRegistry::default();
        let _ = keys.resolve(Some("first"), Some(1));
        let second = keys.resolve(Some("second"), Some(1));
        assert_eq!(second, "second");
        assert_eq!(keys.lookup(None, Some(1)), Some("second"));
        assert_eq!(keys.aliases_of("first"), ["first".to_string()]);
    }

    #[test]
    fn allocate_repoints_index_to_fresh_key() {
        let mut keys = ToolKeyRegistry::default();
        assert_eq!(keys.resolve(None, Some(0)), "tool-1");
        assert_eq!(keys.allocate(Some(0)), "tool-2");
        assert_eq!(keys.lookup(None, Some(0)), Some("tool-2"));
        assert!(keys.aliases_of("tool-1").is_empty());
    }

    #[test]
    fn forget_drops_all_aliases() {
        let mut keys = ToolKeyRegistry::default();
        let _ = keys.resolve(Some("abc"), Some(3));
        keys.forget("abc");
        assert!(keys.lookup(Some("abc"), None).is_none());
        assert!(keys.lookup(None, Some(3)).is_none());
    }

    // ── tool input ──────────────────────────────────────────────────────

    #[test]
    fn partial_input_parses_best_effort() {
        let mut input = ToolInput::Empty;
        input.push_fragment(r#"{"file_path": "/home/daytona/ws/a"#);
        assert!(input.complete().is_none());
        let value = input.best_effort().unwrap();
        assert_eq!(value["file_path"], "/home/daytona/ws/a");
    }

    #[test]
    fn fragments_replace_parsed_input() {
        let mut input = ToolInput::Parsed(Map::new());
        input.push_fragment(r#"{"a":1}"#);
        assert_eq!(input.complete(), Some(json!({"a": 1})));
    }
}
