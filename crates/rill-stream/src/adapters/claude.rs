//! Claude block-streaming adapter (shared by GLM).
//!
//! Content blocks open with `content_block_start`, stream through
//! `content_block_delta` and close with `content_block_stop`. Tool blocks
//! carry an id at start and only a positional index afterwards, so every
//! tool lookup goes through the session's [`ToolKeyRegistry`].
//!
//! [`ToolKeyRegistry`]: crate::state::ToolKeyRegistry

use rill_core::{ChatEvent, Provider};
use serde_json::Value;
use tracing::debug;

use super::{ProviderAdapter, event_kind, index_field};
use crate::common::str_field;
use crate::context::EventContext;
use crate::format::extract_message_text;
use crate::state::{ClaudeBlockKind, TitleSource, ToolInput};

/// Adapter for Claude's streaming vocabulary.
#[derive(Clone, Copy, Debug, Default)]
pub struct ClaudeAdapter;

impl ProviderAdapter for ClaudeAdapter {
    fn provider(&self) -> Provider {
        Provider::Claude
    }

    fn process(&self, event: &ChatEvent, ctx: &mut EventContext<'_>) {
        let raw = &event.payload.raw;
        // SDK stream events wrap the API event.
        let inner = match raw.get("event") {
            Some(inner) if str_field(raw, "type") == Some("stream_event") => inner,
            _ => raw,
        };
        match event_kind(event, inner) {
            "content_block_start" => block_start(inner, ctx),
            "content_block_delta" => block_delta(inner, ctx),
            "content_block_stop" => block_stop(inner, ctx),
            "message_stop" => ctx.finalize_reasoning(None, true),
            "assistant" => assistant_message(inner, ctx),
            "user" | "message_start" | "message_delta" | "ping" => {}
            other => {
                debug!(session_id = %event.session_id, event = %event.event, kind = other, "claude event ignored");
            }
        }
    }
}

fn block_start(inner: &Value, ctx: &mut EventContext<'_>) {
    let index = index_field(inner, "index");
    let Some(block) = inner.get("content_block") else {
        return;
    };
    match str_field(block, "type") {
        Some("thinking" | "redacted_thinking") => {
            remember_block(ctx, index, ClaudeBlockKind::Thinking);
            ctx.ensure_reasoning();
        }
        Some("tool_use" | "server_tool_use" | "mcp_tool_use") => {
            remember_block(ctx, index, ClaudeBlockKind::Tool);
            let key = start_tool_key(ctx, str_field(block, "id"), index);
            let name = str_field(block, "name");
            ctx.ensure_tool(&key, name);
            let input = block
                .get("input")
                .and_then(Value::as_object)
                .filter(|input| !input.is_empty());
            if let Some(input) = input {
                if let Some(tool) = ctx.tool_mut(&key) {
                    tool.raw_input = ToolInput::Parsed(input.clone());
                }
                apply_title(ctx, &key, &Value::Object(input.clone()), TitleSource::Complete);
            }
        }
        Some("text") => {
            remember_block(ctx, index, ClaudeBlockKind::Text);
            if let Some(text) = str_field(block, "text") {
                ctx.append_assistant(text);
            }
        }
        _ => {}
    }
}

fn block_delta(inner: &Value, ctx: &mut EventContext<'_>) {
    let index = index_field(inner, "index");
    let Some(delta) = inner.get("delta") else {
        return;
    };
    match str_field(delta, "type") {
        Some("thinking_delta") => {
            if let Some(text) = str_field(delta, "thinking") {
                ctx.append_reasoning(text);
            }
        }
        Some("text_delta") => {
            if let Some(text) = str_field(delta, "text") {
                ctx.append_assistant(text);
                ctx.refresh_preview();
            }
        }
        Some("input_json_delta") => {
            let key = ctx.state.tool_keys.resolve(str_field(inner, "id"), index);
            ctx.ensure_tool(&key, None);
            let Some(tool) = ctx.tool_mut(&key) else {
                return;
            };
            if tool.finalized {
                debug!(tool_key = %key, "late input delta for finalized tool ignored");
                return;
            }
            tool.raw_input
                .push_fragment(delta.get("partial_json").and_then(Value::as_str).unwrap_or(""));
            if let Some(parsed) = tool.raw_input.best_effort() {
                apply_title(ctx, &key, &parsed, TitleSource::Partial);
            }
        }
        _ => {}
    }
}

fn block_stop(inner: &Value, ctx: &mut EventContext<'_>) {
    let index = index_field(inner, "index");
    let kind = index.and_then(|i| ctx.state.claude.block_kinds.remove(&i));
    let tool_key = ctx
        .state
        .tool_keys
        .lookup(str_field(inner, "id"), index)
        .map(str::to_string);
    match (kind, tool_key) {
        (Some(ClaudeBlockKind::Thinking), _) => ctx.finalize_reasoning(None, true),
        (Some(ClaudeBlockKind::Tool) | None, Some(key)) => {
            let complete = ctx.tool(&key).and_then(|t| t.raw_input.complete());
            if let Some(input) = complete {
                apply_title(ctx, &key, &input, TitleSource::Complete);
                if let (Some(tool), Value::Object(map)) = (ctx.tool_mut(&key), input) {
                    tool.raw_input = ToolInput::Parsed(map);
                }
            }
            ctx.finalize_tool(&key, None);
        }
        _ => {}
    }
}

/// A complete assistant message: finalize its text and register any tool
/// calls that never streamed.
fn assistant_message(inner: &Value, ctx: &mut EventContext<'_>) {
    let text = extract_message_text(inner);
    if !text.is_empty() {
        ctx.finalize_assistant(Some(&text));
    }
    let blocks = inner
        .get("message")
        .and_then(|m| m.get("content"))
        .or_else(|| inner.get("content"))
        .and_then(Value::as_array);
    for block in blocks.into_iter().flatten() {
        if str_field(block, "type") != Some("tool_use") {
            continue;
        }
        let Some(id) = str_field(block, "id") else {
            continue;
        };
        if ctx.state.tool_keys.lookup(Some(id), None).is_some() {
            continue;
        }
        let key = ctx.state.tool_keys.resolve(Some(id), None);
        ctx.ensure_tool(&key, str_field(block, "name"));
        let input = block.get("input").cloned().unwrap_or(Value::Null);
        if let (Some(tool), Some(map)) = (ctx.tool_mut(&key), input.as_object()) {
            tool.raw_input = ToolInput::Parsed(map.clone());
        }
        apply_title(ctx, &key, &input, TitleSource::Complete);
        ctx.finalize_tool(&key, None);
    }
}

/// Key for a starting tool block. An id-less start whose index still points
/// at a finished call opens a new call.
fn start_tool_key(ctx: &mut EventContext<'_>, id: Option<&str>, index: Option<u64>) -> String {
    if id.is_none() {
        let stale = ctx
            .state
            .tool_keys
            .lookup(None, index)
            .is_some_and(|key| ctx.tool_finalized(key));
        if stale {
            return ctx.state.tool_keys.allocate(index);
        }
    }
    ctx.state.tool_keys.resolve(id, index)
}

fn remember_block(ctx: &mut EventContext<'_>, index: Option<u64>, kind: ClaudeBlockKind) {
    if let Some(index) = index {
        let _ = ctx.state.claude.block_kinds.insert(index, kind);
    }
}

fn apply_title(ctx: &mut EventContext<'_>, key: &str, input: &Value, source: TitleSource) {
    let Some(name) = ctx.tool(key).and_then(|t| t.tool_name.clone()) else {
        return;
    };
    let Some(argument) = ctx.formatter.primary_argument(&name, input) else {
        return;
    };
    let Some(title) = ctx.formatter.tool_title(&name, input) else {
        return;
    };
    let _ = ctx.set_tool_title(key, &title, Some(&argument), source);
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
