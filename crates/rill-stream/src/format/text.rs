//! Display-text extraction from provider message shapes.
//!
//! Providers wrap text in many shapes: a bare string, an array of content
//! nodes (`{"type": "text", "text": ...}`), nested `content` arrays, or a
//! message envelope (`{"message": {"content": ...}}`). These helpers reduce
//! all of them to plain text and skip non-text nodes.

use serde_json::Value;

/// Node types that never contribute display text.
const NON_TEXT_NODES: &[&str] = &[
    "thinking",
    "redacted_thinking",
    "tool_use",
    "tool_result",
    "image",
    "server_tool_use",
];

/// Flatten a content value (string, node, or array of nodes) to plain text.
pub fn flatten_content(value: &Value) -> String {
    let mut out = String::new();
    flatten_into(value, &mut out);
    out
}

fn flatten_into(value: &Value, out: &mut String) {
    match value {
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            for item in items {
                flatten_into(item, out);
            }
        }
        Value::Object(map) => {
            if let Some(kind) = map.get("type").and_then(Value::as_str) {
                if NON_TEXT_NODES.contains(&kind) {
                    return;
                }
            }
            if let Some(text) = map.get("text").and_then(Value::as_str) {
                out.push_str(text);
            } else if let Some(content) = map.get("content") {
                flatten_into(content, out);
            }
        }
        _ => {}
    }
}

/// Extract the display text of a provider message.
///
/// Looks at `message.content`, then `content`, then `text`, then
/// `delta.text`, returning the first non-empty flattening.
pub fn extract_message_text(raw: &Value) -> String {
    let candidates = [
        raw.get("message").and_then(|m| m.get("content")),
        raw.get("content"),
        raw.get("text"),
        raw.get("delta").and_then(|d| d.get("text")),
    ];
    candidates
        .into_iter()
        .flatten()
        .map(flatten_content)
        .find(|text| !text.is_empty())
        .unwrap_or_default()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flattens_plain_string() {
        assert_eq!(flatten_content(&json!("hi")), "hi");
    }

    #[test]
    fn flattens_text_nodes_and_skips_others() {
        let content = json!([
            {"type": "thinking", "thinking": "hmm"},
            {"type": "text", "text": "Hello "},
            {"type": "tool_use", "id": "t1", "name": "Read", "input": {}},
            {"type": "text", "text": "world"}
        ]);
        assert_eq!(flatten_content(&content), "Hello world");
    }

    #[test]
    fn flattens_nested_content() {
        let content = json!([{"type": "container", "content": [{"text": "a"}, "b"]}]);
        assert_eq!(flatten_content(&content), "ab");
    }

    #[test]
    fn non_text_scalars_are_empty() {
        assert_eq!(flatten_content(&json!(42)), "");
        assert_eq!(flatten_content(&Value::Null), "");
    }

    #[test]
    fn extracts_from_message_envelope() {
        let raw = json!({"type": "assistant", "message": {"content": [{"type": "text", "text": "Hi"}]}});
        assert_eq!(extract_message_text(&raw), "Hi");
    }

    #[test]
    fn extracts_from_flat_content() {
        assert_eq!(extract_message_text(&json!({"content": "Hi"})), "Hi");
        assert_eq!(extract_message_text(&json!({"text": "yo"})), "yo");
        assert_eq!(extract_message_text(&json!({"delta": {"text": "d"}})), "d");
    }

    #[test]
    fn falls_through_empty_candidates() {
        let raw = json!({"message": {"content": []}, "content": "fallback"});
        assert_eq!(extract_message_text(&raw), "fallback");
        assert_eq!(extract_message_text(&json!({})), "");
    }
}
