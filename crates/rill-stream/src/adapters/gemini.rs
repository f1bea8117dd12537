//! Gemini session-update adapter.
//!
//! Gemini streams flat `sessionUpdate` records with no block triad. Thought
//! and answer chunks interleave without boundaries, so each switch
//! finalizes the other buffer. Tool identity is a composite
//! `"<kind>-<timestamp>"` id; the kind selects the title rules.

use rill_core::{ChatEvent, Provider};
use serde_json::Value;
use tracing::debug;

use super::ProviderAdapter;
use crate::common::str_field;
use crate::context::EventContext;
use crate::format::{Formatter, flatten_content, normalize_tool_name, tool_title, truncate_display};

/// Tool kinds that only ever report through `tool_call_update`.
const UPDATE_ONLY_KINDS: &[&str] = &["write_file", "run_shell_command", "save_memory"];

/// Boilerplate Gemini prefixes web-search titles with.
const SEARCH_PREFIXES: &[&str] = &["searching the web for:", "searching the web for", "search:"];

/// Adapter for Gemini's session-update vocabulary.
#[derive(Clone, Copy, Debug, Default)]
pub struct GeminiAdapter;

impl ProviderAdapter for GeminiAdapter {
    fn provider(&self) -> Provider {
        Provider::Gemini
    }

    fn process(&self, event: &ChatEvent, ctx: &mut EventContext<'_>) {
        let raw = &event.payload.raw;
        let update = raw.get("update").unwrap_or(raw);
        let kind = str_field(update, "sessionUpdate")
            .or_else(|| str_field(update, "type"))
            .unwrap_or_else(|| event.kind());
        match kind {
            "agent_thought_chunk" => {
                ctx.finalize_assistant(None);
                ctx.append_reasoning(&chunk_text(update));
            }
            "agent_message_chunk" => {
                ctx.finalize_reasoning(None, true);
                ctx.append_assistant(&chunk_text(update));
                ctx.refresh_preview();
            }
            "plan" => {
                let body = render_plan(update, ctx.formatter.plan_entry_limit());
                let key = format!("plan-{}", event.sequence);
                ctx.one_shot_tool(&key, "Plan", "[Plan]", Some(&body));
            }
            "tool_call" => {
                ctx.finalize_reasoning(None, true);
                let (id, tool_kind) = tool_identity(update);
                if UPDATE_ONLY_KINDS.contains(&tool_kind.as_str()) {
                    return;
                }
                finalize_tool_call(ctx, id, &tool_kind, update);
            }
            "tool_call_update" => {
                let (id, tool_kind) = tool_identity(update);
                if str_field(update, "status") == Some("completed")
                    && UPDATE_ONLY_KINDS.contains(&tool_kind.as_str())
                {
                    finalize_tool_call(ctx, id, &tool_kind, update);
                }
            }
            "error" | "turn_end" => ctx.flush_buffers(false),
            other => {
                debug!(session_id = %event.session_id, event = %event.event, kind = other, "gemini event ignored");
            }
        }
    }
}

fn chunk_text(update: &Value) -> String {
    update.get("content").map(flatten_content).unwrap_or_default()
}

/// Tool-call id and the kind prefix before its first hyphen.
fn tool_identity(update: &Value) -> (Option<&str>, String) {
    let id = str_field(update, "toolCallId").or_else(|| str_field(update, "id"));
    let kind = id
        .and_then(|id| id.split('-').next())
        .filter(|k| !k.is_empty())
        .or_else(|| str_field(update, "kind"))
        .unwrap_or("tool");
    (id, kind.to_string())
}

fn finalize_tool_call(ctx: &mut EventContext<'_>, id: Option<&str>, kind: &str, update: &Value) {
    let key = ctx.state.tool_keys.resolve(id, None);
    if ctx.tool_finalized(&key) {
        return;
    }
    let (display, argument) = describe_tool(ctx.formatter, kind, update);
    let title = tool_title(&display, argument.as_deref());
    ctx.one_shot_tool(&key, kind, &title, None);
}

/// Display name and primary argument for a Gemini tool call.
pub fn describe_tool(formatter: &Formatter, kind: &str, update: &Value) -> (String, Option<String>) {
    let raw_input = update.get("rawInput").unwrap_or(&Value::Null);
    let title_line = str_field(update, "title").map(truncate_display);
    match kind {
        "run_shell_command" => {
            let command = str_field(raw_input, "command")
                .or_else(|| str_field(update, "command"))
                .map(truncate_display)
                .or(title_line);
            ("Run Shell".to_string(), command)
        }
        "google_web_search" | "web_search" => {
            let query = str_field(raw_input, "query")
                .map(str::to_string)
                .or_else(|| str_field(update, "title").map(strip_search_boilerplate))
                .map(|q| truncate_display(&q))
                .filter(|q| !q.is_empty());
            ("WebSearch".to_string(), query)
        }
        "read_many_files" => {
            let listing = str_field(update, "title")
                .or_else(|| str_field(raw_input, "paths"))
                .map(truncate_display)
                .or_else(|| {
                    raw_input
                        .get("paths")
                        .and_then(Value::as_array)
                        .and_then(|paths| paths.first())
                        .and_then(Value::as_str)
                        .map(truncate_display)
                });
            ("Read".to_string(), listing)
        }
        _ => {
            let display = normalize_tool_name(kind).to_string();
            let argument = tool_path(formatter, update)
                .or_else(|| formatter.primary_argument(kind, raw_input))
                .or(title_line);
            (display, argument)
        }
    }
}

/// File path of a tool call: `locations[0].path`, then the first
/// `content[*].path`. Sandbox-cleaned; `None` when cleaning leaves nothing.
pub fn tool_path(formatter: &Formatter, update: &Value) -> Option<String> {
    let from_locations = update
        .get("locations")
        .and_then(Value::as_array)
        .and_then(|locations| locations.first())
        .and_then(|loc| str_field(loc, "path"));
    let from_content = || {
        update
            .get("content")
            .and_then(Value::as_array)
            .and_then(|items| items.iter().find_map(|item| str_field(item, "path")))
    };
    from_locations
        .or_else(from_content)
        .map(|path| formatter.clean_path(path))
        .filter(|path| !path.is_empty())
        .map(|path| truncate_display(&path))
}

fn strip_search_boilerplate(title: &str) -> String {
    let mut text = title.trim();
    let lower = text.to_ascii_lowercase();
    if let Some(prefix) = SEARCH_PREFIXES.iter().find(|p| lower.starts_with(**p)) {
        text = text[prefix.len()..].trim();
    }
    text.trim_matches(|c| matches!(c, '"' | '\'' | '“' | '”'))
        .trim()
        .to_string()
}

/// Render plan entries as bullet lines, capped at `limit`.
pub fn render_plan(update: &Value, limit: usize) -> String {
    let entries: Vec<&str> = update
        .get("entries")
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e.as_str().or_else(|| str_field(e, "content")))
                .map(str::trim)
                .filter(|e| !e.is_empty())
                .collect()
        })
        .unwrap_or_default();
    if entries.is_empty() {
        return "Planning…".to_string();
    }
    let mut lines: Vec<String> = entries
        .iter()
        .take(limit)
        .map(|entry| format!("• {entry}"))
        .collect();
    if entries.len() > limit {
        lines.push(format!("… {} more", entries.len() - limit));
    }
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
