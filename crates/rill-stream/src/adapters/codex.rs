//! Codex adapter.
//!
//! Two vocabularies reach this adapter:
//!
//! - protocol events (`exec_command_begin`, `agent_message_delta`, ...),
//!   where each tool call is addressed by `call_id`;
//! - Responses streaming items (`response.output_item.added`, argument
//!   deltas, `response.output_item.done`), addressed by item id in some
//!   chunks and by `output_index` in others.
//!
//! Responses items are classified on arrival and their streamed arguments
//! kept in the session's Codex scratch partition until the item is done.

use rill_core::{ChatEvent, Provider};
use serde_json::{Map, Value, json};
use tracing::debug;

use super::{ProviderAdapter, event_kind, index_field};
use crate::common::str_field;
use crate::context::EventContext;
use crate::format::{
    Formatter, flatten_content, normalize_tool_name, parse_partial_json, tool_title,
};
use crate::state::{CodexItemKind, TitleSource, ToolInput};

/// Adapter for Codex protocol and Responses events.
#[derive(Clone, Copy, Debug, Default)]
pub struct CodexAdapter;

impl ProviderAdapter for CodexAdapter {
    fn provider(&self) -> Provider {
        Provider::Codex
    }

    fn process(&self, event: &ChatEvent, ctx: &mut EventContext<'_>) {
        let raw = &event.payload.raw;
        let msg = raw.get("msg").filter(|m| m.is_object()).unwrap_or(raw);
        match event_kind(event, msg) {
            "agent_message_delta" | "response.output_text.delta" => {
                if let Some(delta) = str_field(msg, "delta") {
                    ctx.append_assistant(delta);
                    ctx.refresh_preview();
                }
            }
            "agent_message" => ctx.finalize_assistant(str_field(msg, "message")),
            "agent_reasoning_delta"
            | "agent_reasoning_raw_content_delta"
            | "response.reasoning_summary_text.delta"
            | "response.reasoning_text.delta" => {
                if let Some(delta) = str_field(msg, "delta") {
                    ctx.append_reasoning(delta);
                }
            }
            "agent_reasoning" | "agent_reasoning_raw_content" => {
                ctx.finalize_reasoning(str_field(msg, "text"), true);
            }
            "exec_command_begin" => exec_begin(msg, ctx),
            "exec_command_end" => exec_end(msg, ctx),
            "patch_apply_begin" => patch_begin(msg, ctx),
            "web_search_begin" => web_search(msg, ctx, false),
            "web_search_end" => web_search(msg, ctx, true),
            "mcp_tool_call_begin" => mcp_begin(msg, ctx),
            "patch_apply_end" | "mcp_tool_call_end" => end_call(msg, ctx, None),
            "task_complete" => ctx.flush_buffers(false),
            "response.output_item.added" => item_added(msg, ctx),
            "response.function_call_arguments.delta" => argument_delta(msg, ctx),
            "response.custom_tool_call_input.delta" => custom_input_delta(msg, ctx),
            "response.output_item.done" => item_done(msg, ctx),
            "exec_command_output_delta" => {}
            other => {
                debug!(session_id = %event.session_id, event = %event.event, kind = other, "codex event ignored");
            }
        }
    }
}

// ── protocol events ─────────────────────────────────────────────────────

fn call_key(msg: &Value, ctx: &mut EventContext<'_>) -> String {
    ctx.state.tool_keys.resolve(str_field(msg, "call_id"), None)
}

fn begin_call(ctx: &mut EventContext<'_>, key: &str, tool_name: &str, title: Option<String>) {
    ctx.ensure_tool(key, Some(tool_name));
    let (title, source) = match title {
        Some(title) => (title, TitleSource::Complete),
        None => (tool_title(normalize_tool_name(tool_name), None), TitleSource::Partial),
    };
    let _ = ctx.set_tool_title(key, &title, None, source);
}

fn end_call(msg: &Value, ctx: &mut EventContext<'_>, text: Option<&str>) {
    let key = call_key(msg, ctx);
    ctx.ensure_tool(&key, None);
    ctx.finalize_tool(&key, text);
}

fn exec_begin(msg: &Value, ctx: &mut EventContext<'_>) {
    let key = call_key(msg, ctx);
    let input = json!({ "command": msg.get("command").cloned().unwrap_or(Value::Null) });
    let title = ctx.formatter.tool_title("exec_command", &input);
    begin_call(ctx, &key, "exec_command", title);
}

fn exec_end(msg: &Value, ctx: &mut EventContext<'_>) {
    let key = call_key(msg, ctx);
    if ctx.tool(&key).is_none() {
        exec_begin(msg, ctx);
    }
    let exit_code = msg.get("exit_code").and_then(Value::as_i64).unwrap_or(0);
    let text = (exit_code != 0).then(|| {
        let title = ctx.tool(&key).and_then(|t| t.title()).unwrap_or("[Bash]");
        format!("{title} (exit {exit_code})")
    });
    ctx.finalize_tool(&key, text.as_deref());
}

/// A file operation in a patch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PatchOp {
    /// New file.
    Add,
    /// Modified file.
    Update,
    /// Removed file.
    Delete,
}

/// `[Write] path` / `[Edit] path` / `[Delete] path` for one change,
/// `[Edit] N files` for several.
pub fn patch_title(formatter: &Formatter, changes: &[(PatchOp, String)]) -> Option<String> {
    match changes {
        [] => None,
        [(op, path)] => {
            let name = match op {
                PatchOp::Add => "Write",
                PatchOp::Update => "Edit",
                PatchOp::Delete => "Delete",
            };
            let path = formatter.clean_path(path);
            Some(tool_title(name, Some(&path)))
        }
        many => Some(tool_title("Edit", Some(&format!("{} files", many.len())))),
    }
}

fn patch_changes(changes: &Map<String, Value>) -> Vec<(PatchOp, String)> {
    let mut out: Vec<(PatchOp, String)> = changes
        .iter()
        .map(|(path, change)| {
            let tag = str_field(change, "type");
            let op = if change.get("add").is_some() || tag == Some("add") {
                PatchOp::Add
            } else if change.get("delete").is_some() || tag == Some("delete") {
                PatchOp::Delete
            } else {
                PatchOp::Update
            };
            (op, path.clone())
        })
        .collect();
    out.sort_by(|a, b| a.1.cmp(&b.1));
    out
}

/// File operations named in an `apply_patch` envelope.
pub fn parse_patch_headers(patch: &str) -> Vec<(PatchOp, String)> {
    patch
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            [
                ("*** Add File:", PatchOp::Add),
                ("*** Update File:", PatchOp::Update),
                ("*** Delete File:", PatchOp::Delete),
            ]
            .into_iter()
            .find_map(|(prefix, op)| {
                line.strip_prefix(prefix)
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| (op, p.to_string()))
            })
        })
        .collect()
}

fn patch_begin(msg: &Value, ctx: &mut EventContext<'_>) {
    let key = call_key(msg, ctx);
    let changes = msg
        .get("changes")
        .and_then(Value::as_object)
        .map(patch_changes)
        .unwrap_or_default();
    let title = patch_title(ctx.formatter, &changes);
    begin_call(ctx, &key, "apply_patch", title);
}

fn web_search(msg: &Value, ctx: &mut EventContext<'_>, finished: bool) {
    let key = call_key(msg, ctx);
    let title = ctx.formatter.tool_title("web_search", msg);
    begin_call(ctx, &key, "web_search", title);
    if finished {
        ctx.finalize_tool(&key, None);
    }
}

fn mcp_begin(msg: &Value, ctx: &mut EventContext<'_>) {
    let key = call_key(msg, ctx);
    let invocation = msg.get("invocation").unwrap_or(msg);
    let title = ctx.formatter.tool_title("mcp_tool_call", invocation);
    begin_call(ctx, &key, "mcp_tool_call", title);
}

// ── Responses items ─────────────────────────────────────────────────────

fn item_key(msg: &Value, item: Option<&Value>, ctx: &mut EventContext<'_>) -> String {
    let id = item
        .and_then(|i| str_field(i, "id"))
        .or_else(|| str_field(msg, "item_id"));
    ctx.state.tool_keys.resolve(id, index_field(msg, "output_index"))
}

fn classify(item: &Value) -> CodexItemKind {
    match str_field(item, "type").unwrap_or("") {
        "message" => CodexItemKind::Message,
        "reasoning" => CodexItemKind::Reasoning,
        "function_call" | "local_shell_call" => CodexItemKind::FunctionCall,
        "custom_tool_call" => CodexItemKind::CustomToolCall,
        "web_search_call" => CodexItemKind::WebSearch,
        other => CodexItemKind::Other(other.to_string()),
    }
}

fn item_added(msg: &Value, ctx: &mut EventContext<'_>) {
    let Some(item) = msg.get("item") else {
        return;
    };
    let key = item_key(msg, Some(item), ctx);
    let kind = classify(item);
    match &kind {
        CodexItemKind::Reasoning => ctx.ensure_reasoning(),
        CodexItemKind::FunctionCall => {
            ctx.ensure_tool(&key, Some(str_field(item, "name").unwrap_or("shell")));
            let args = str_field(item, "arguments").unwrap_or("").to_string();
            let _ = ctx.state.codex.argument_buffers.insert(key.clone(), args);
        }
        CodexItemKind::CustomToolCall => {
            ctx.ensure_tool(&key, str_field(item, "name"));
            let input = str_field(item, "input").unwrap_or("").to_string();
            let _ = ctx.state.codex.custom_buffers.insert(key.clone(), input);
        }
        CodexItemKind::WebSearch => ctx.ensure_tool(&key, Some("web_search")),
        CodexItemKind::Message | CodexItemKind::Other(_) => {}
    }
    let _ = ctx.state.codex.items.insert(key, kind);
}

fn argument_delta(msg: &Value, ctx: &mut EventContext<'_>) {
    let key = item_key(msg, None, ctx);
    if ctx.tool_finalized(&key) {
        return;
    }
    let buffer = ctx.state.codex.argument_buffers.entry(key.clone()).or_default();
    buffer.push_str(str_field(msg, "delta").unwrap_or(""));
    let parsed = parse_partial_json(buffer);
    ctx.ensure_tool(&key, None);
    if let Some(parsed) = parsed {
        apply_input_title(ctx, &key, &parsed, TitleSource::Partial);
    }
}

fn custom_input_delta(msg: &Value, ctx: &mut EventContext<'_>) {
    let key = item_key(msg, None, ctx);
    if ctx.tool_finalized(&key) {
        return;
    }
    let buffer = ctx.state.codex.custom_buffers.entry(key.clone()).or_default();
    buffer.push_str(str_field(msg, "delta").unwrap_or(""));
    let changes = parse_patch_headers(buffer);
    ctx.ensure_tool(&key, None);
    if let Some(title) = patch_title(ctx.formatter, &changes) {
        let _ = ctx.set_tool_title(&key, &title, None, TitleSource::Partial);
    }
}

fn item_done(msg: &Value, ctx: &mut EventContext<'_>) {
    let Some(item) = msg.get("item") else {
        return;
    };
    let key = item_key(msg, Some(item), ctx);
    let kind = ctx
        .state
        .codex
        .items
        .remove(&key)
        .unwrap_or_else(|| classify(item));
    match kind {
        CodexItemKind::Message => {
            let text = item.get("content").map(flatten_content).unwrap_or_default();
            ctx.finalize_assistant(Some(&text));
        }
        CodexItemKind::Reasoning => {
            let summary = item.get("summary").map(flatten_content).unwrap_or_default();
            ctx.finalize_reasoning(Some(&summary), true);
        }
        CodexItemKind::FunctionCall => {
            let streamed = ctx.state.codex.argument_buffers.remove(&key);
            ctx.ensure_tool(&key, Some(str_field(item, "name").unwrap_or("shell")));
            let input = match str_field(item, "arguments").map(str::to_string).or(streamed) {
                Some(text) => serde_json::from_str::<Value>(&text).ok(),
                None => item.get("action").cloned(),
            };
            if let Some(input) = input {
                apply_input_title(ctx, &key, &input, TitleSource::Complete);
                if let (Some(tool), Value::Object(map)) = (ctx.tool_mut(&key), input) {
                    tool.raw_input = ToolInput::Parsed(map);
                }
            }
            ctx.finalize_tool(&key, None);
        }
        CodexItemKind::CustomToolCall => {
            let streamed = ctx.state.codex.custom_buffers.remove(&key);
            ctx.ensure_tool(&key, str_field(item, "name"));
            let input = str_field(item, "input").map(str::to_string).or(streamed).unwrap_or_default();
            let title = patch_title(ctx.formatter, &parse_patch_headers(&input)).or_else(|| {
                let name = ctx.tool(&key).and_then(|t| t.tool_name.clone())?;
                Some(tool_title(normalize_tool_name(&name), None))
            });
            if let Some(title) = title {
                let _ = ctx.set_tool_title(&key, &title, None, TitleSource::Complete);
            }
            ctx.finalize_tool(&key, None);
        }
        CodexItemKind::WebSearch => {
            ctx.ensure_tool(&key, Some("web_search"));
            let action = item.get("action").unwrap_or(item);
            let title = ctx
                .formatter
                .tool_title("web_search", action)
                .unwrap_or_else(|| tool_title("WebSearch", None));
            let _ = ctx.set_tool_title(&key, &title, None, TitleSource::Complete);
            ctx.finalize_tool(&key, None);
        }
        CodexItemKind::Other(kind) => {
            debug!(item_kind = %kind, "codex item ignored");
        }
    }
}

fn apply_input_title(ctx: &mut EventContext<'_>, key: &str, input: &Value, source: TitleSource) {
    let Some(name) = ctx.tool(key).and_then(|t| t.tool_name.clone()) else {
        return;
    };
    let argument = ctx.formatter.primary_argument(&name, input);
    if let Some(title) = ctx.formatter.tool_title(&name, input) {
        let _ = ctx.set_tool_title(key, &title, argument.as_deref(), source);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::SessionState;
    use crate::testutil::run_events;

    fn run(state: &mut SessionState, events: &[(&str, Value)]) {
        run_events(&CodexAdapter, state, events);
    }

    // ── protocol events ─────────────────────────────────────────────────

    #[test]
    fn message_deltas_then_final_message() {
        let mut state = SessionState::new("s1".into());
        run(
            &mut state,
            &[
                ("codex.agent_message_delta", json!({"msg": {"type": "agent_message_delta", "delta": "Hel"}})),
                ("codex.agent_message_delta", json!({"msg": {"type": "agent_message_delta", "delta": "lo"}})),
            ],
        );
        assert_eq!(state.assistant.as_ref().unwrap().content, "Hello");
        run(
            &mut state,
            &[("codex.agent_message", json!({"msg": {"type": "agent_message", "message": "Hello"}}))],
        );
        assert!(state.assistant.is_none());
    }

    #[test]
    fn exec_command_lifecycle() {
        let mut state = SessionState::new("s1".into());
        run(
            &mut state,
            &[
                (
                    "codex.exec_command_begin",
                    json!({"call_id": "c1", "command": ["npm", "test"]}),
                ),
                ("codex.exec_command_output_delta", json!({"call_id": "c1", "chunk": "ok"})),
            ],
        );
        let tool = &state.tool_messages["c1"];
        assert_eq!(tool.title(), Some("[Bash] npm test"));
        assert!(!tool.finalized);
        run(
            &mut state,
            &[("codex.exec_command_end", json!({"call_id": "c1", "exit_code": 0}))],
        );
        assert!(state.tool_messages["c1"].finalized);
    }

    #[test]
    fn patch_titles() {
        let formatter = Formatter::default();
        let single = patch_changes(
            json!({"/home/daytona/ws/src/new.ts": {"add": {"content": ""}}})
                .as_object()
                .unwrap(),
        );
        assert_eq!(patch_title(&formatter, &single).as_deref(), Some("[Write] src/new.ts"));
        let many = parse_patch_headers(
            "*** Begin Patch\n*** Update File: a.rs\n*** Delete File: b.rs\n*** End Patch",
        );
        assert_eq!(many, vec![
                (PatchOp::Update, "a.rs".to_string()),
                (PatchOp::Delete, "b.rs".to_string())
            ]);
        assert_eq!(patch_title(&formatter, &many).as_deref(), Some("[Edit] 2 files"));
    }

    #[test]
    fn mcp_call_title() {
        let mut state = SessionState::new("s1".into());
        run(
            &mut state,
            &[(
                "codex.mcp_tool_call_begin",
                json!({"call_id": "m1", "invocation": {"server": "docs", "tool": "search"}}),
            )],
        );
        assert_eq!(state.tool_messages["m1"].title(), Some("[MCP] docs.search"));
    }

    // ── Responses items ─────────────────────────────────────────────────

    #[test]
    fn function_call_streams_by_index() {
        let mut state = SessionState::new("s1".into());
        run(
            &mut state,
            &[
                (
                    "codex.response.output_item.added",
                    json!({"type": "response.output_item.added", "output_index": 1,
                           "item": {"type": "function_call", "id": "fc_1", "name": "read_file", "arguments": ""}}),
                ),
                (
                    "codex.response.function_call_arguments.delta",
                    json!({"type": "response.function_call_arguments.delta", "output_index": 1,
                           "delta": "{\"path\": \"/home/daytona/ws/lib.rs\""}),
                ),
            ],
        );
        assert_eq!(state.tool_messages.len(), 1);
        assert_eq!(state.tool_messages["fc_1"].title(), Some("[Read] lib.rs"));
        run(
            &mut state,
            &[(
                "codex.response.output_item.done",
                json!({"type": "response.output_item.done", "output_index": 1,
                       "item": {"type": "function_call", "id": "fc_1", "name": "read_file",
                                "arguments": "{\"path\": \"/home/daytona/ws/main.rs\"}"}}),
            )],
        );
        let tool = &state.tool_messages["fc_1"];
        assert_eq!(tool.title(), Some("[Read] main.rs"));
        assert!(tool.finalized);
        assert!(state.codex.argument_buffers.is_empty());
        assert!(state.codex.items.is_empty());
    }

    #[test]
    fn custom_tool_input_titles_from_patch() {
        let mut state = SessionState::new("s1".into());
        run(
            &mut state,
            &[
                (
                    "codex.response.output_item.added",
                    json!({"type": "response.output_item.added", "output_index": 0,
                           "item": {"type": "custom_tool_call", "id": "ct_1", "name": "apply_patch"}}),
                ),
                (
                    "codex.response.custom_tool_call_input.delta",
                    json!({"type": "response.custom_tool_call_input.delta", "item_id": "ct_1",
                           "delta": "*** Begin Patch\n*** Update File: src/app.ts\n"}),
                ),
                (
                    "codex.response.output_item.done",
                    json!({"type": "response.output_item.done", "output_index": 0,
                           "item": {"type": "custom_tool_call", "id": "ct_1", "name": "apply_patch"}}),
                ),
            ],
        );
        let tool = &state.tool_messages["ct_1"];
        assert_eq!(tool.title(), Some("[Edit] src/app.ts"));
        assert!(tool.finalized);
    }

    #[test]
    fn message_item_finalizes_assistant() {
        let mut state = SessionState::new("s1".into());
        run(
            &mut state,
            &[
                ("codex.response.output_text.delta", json!({"type": "response.output_text.delta", "delta": "Hi"})),
                (
                    "codex.response.output_item.done",
                    json!({"type": "response.output_item.done", "output_index": 0,
                           "item": {"type": "message", "id": "msg_1",
                                    "content": [{"type": "output_text", "text": "Hi there"}]}}),
                ),
            ],
        );
        assert!(state.assistant.is_none());
    }
}
