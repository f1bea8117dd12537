//! # Permissive JSON Parsing
//!
//! Tool arguments stream in as JSON fragments, so the accumulated text is
//! usually syntactically incomplete. [`parse_partial_json`] closes open
//! strings and containers and, failing that, backs off to the most recent
//! structural boundary. It never panics and reports failure as `None`.

use serde_json::{Map, Value};
use tracing::trace;

/// How many structural boundaries to try before giving up.
const MAX_BACKOFF: usize = 4;

/// Parse a complete JSON object. `None` for invalid JSON or non-objects.
pub fn parse_json_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Best-effort parse of a possibly-truncated JSON document.
///
/// Returns the value a complete document would most plausibly start with:
/// `{"file_path": "/src/ma` parses as `{"file_path": "/src/ma"}`.
pub fn parse_partial_json(input: &str) -> Option<Value> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str::<Value>(trimmed) {
        return Some(value);
    }

    let scan = Scan::run(trimmed)?;
    if let Some(value) = close_and_parse(trimmed, &scan.stack, scan.in_string, scan.escaped) {
        return Some(value);
    }
    for cut in scan.cuts.iter().rev().take(MAX_BACKOFF) {
        if let Some(value) = close_and_parse(&trimmed[..cut.len], &cut.stack, false, false) {
            return Some(value);
        }
    }
    trace!(len = trimmed.len(), "partial JSON not recoverable yet");
    None
}

/// A prefix length at which the document can be cut and closed.
struct Cut {
    len: usize,
    stack: Vec<u8>,
}

/// Structural state after scanning the whole input.
struct Scan {
    /// Pending closers, innermost last.
    stack: Vec<u8>,
    in_string: bool,
    escaped: bool,
    cuts: Vec<Cut>,
}

impl Scan {
    /// Scan bytes outside strings. Structural bytes are ASCII, so every
    /// recorded cut falls on a char boundary. Mismatched closers mean the
    /// input is malformed rather than truncated.
    fn run(input: &str) -> Option<Self> {
        let mut scan = Self {
            stack: Vec::new(),
            in_string: false,
            escaped: false,
            cuts: Vec::new(),
        };
        for (i, byte) in input.bytes().enumerate() {
            if scan.in_string {
                if scan.escaped {
                    scan.escaped = false;
                } else if byte == b'\\' {
                    scan.escaped = true;
                } else if byte == b'"' {
                    scan.in_string = false;
                }
                continue;
            }
            match byte {
                b'"' => scan.in_string = true,
                b'{' | b'[' => {
                    scan.stack.push(if byte == b'{' { b'}' } else { b']' });
                    scan.cut(i + 1);
                }
                b'}' | b']' => {
                    if scan.stack.pop() != Some(byte) {
                        return None;
                    }
                    scan.cut(i + 1);
                }
                b',' => scan.cut(i),
                _ => {}
            }
        }
        Some(scan)
    }

    fn cut(&mut self, len: usize) {
        self.cuts.push(Cut {
            len,
            stack: self.stack.clone(),
        });
    }
}

fn close_and_parse(prefix: &str, stack: &[u8], in_string: bool, escaped: bool) -> Option<Value> {
    let mut text = prefix.to_string();
    if in_string {
        if escaped {
            let _ = text.pop();
        }
        // A truncated \uXXXX escape cannot be closed; drop it.
        if let Some(pos) = text.rfind("\\u") {
            if text.len() - pos < 6 {
                text.truncate(pos);
            }
        }
        text.push('"');
    }
    loop {
        let trimmed_len = text.trim_end().len();
        text.truncate(trimmed_len);
        if text.ends_with(',') || text.ends_with(':') {
            let _ = text.pop();
        } else {
            break;
        }
    }
    text.extend(stack.iter().rev().map(|&b| char::from(b)));
    serde_json::from_str(&text).ok()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
