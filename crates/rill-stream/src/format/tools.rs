//! Tool-call display helpers.
//!
//! Every provider names its tools differently (`read_file`, `exec_command`,
//! `Read`). Names are normalized first so a single primary-argument table
//! serves all providers.

use serde_json::Value;

use super::path::clean_sandbox_path;

/// Longest primary argument shown before truncation.
const MAX_ARGUMENT_CHARS: usize = 80;

/// Map a provider-specific tool name to its display name.
pub fn normalize_tool_name(name: &str) -> &str {
    match name {
        "read_file" | "read" | "read_many_files" => "Read",
        "write_file" | "write" | "create_file" => "Write",
        "edit_file" | "replace" | "edit" | "apply_patch" => "Edit",
        "multi_edit" => "MultiEdit",
        "delete" | "delete_file" => "Delete",
        "shell" | "bash" | "run_terminal_command" | "run_shell_command" | "exec_command"
        | "local_shell" => "Bash",
        "search_file_content" | "codebase_search" | "grep" => "Grep",
        "find_files" | "glob" => "Glob",
        "list_directory" | "list_dir" | "ls" => "LS",
        "google_web_search" | "web_search" => "WebSearch",
        "web_fetch" => "WebFetch",
        "save_memory" => "SaveMemory",
        "mcp_tool_call" => "MCP",
        "todo_write" | "update_plan" => "TodoWrite",
        other => other,
    }
}

/// Format a tool title: `"[Tool] arg"`, or `"[Tool]"` without an argument.
pub fn tool_title(display_name: &str, argument: Option<&str>) -> String {
    match argument.map(str::trim).filter(|a| !a.is_empty()) {
        Some(arg) => format!("[{display_name}] {arg}"),
        None => format!("[{display_name}]"),
    }
}

/// Keep the first line and cap its length, marking truncation with `…`.
pub fn truncate_display(text: &str) -> String {
    let line = text.lines().next().unwrap_or("").trim();
    if line.chars().count() <= MAX_ARGUMENT_CHARS {
        return line.to_string();
    }
    let mut out: String = line.chars().take(MAX_ARGUMENT_CHARS - 1).collect();
    out.push('…');
    out
}

/// Extract the single most informative argument of a tool call.
///
/// `input` may be a complete object or the best-effort parse of a partial
/// one. File paths are sandbox-cleaned; an incomplete path yields `None`.
pub fn primary_argument(tool_name: &str, input: &Value, sandbox_root: &str) -> Option<String> {
    let input = input.as_object()?;
    let string = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| input.get(*k).and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };
    let path = |keys: &[&str]| {
        string(keys)
            .map(|p| clean_sandbox_path(&p, sandbox_root))
            .filter(|p| !p.is_empty())
    };

    let raw = match normalize_tool_name(tool_name) {
        "Read" | "Write" | "Edit" | "MultiEdit" | "Delete" => path(&["file_path", "path", "file"]),
        "NotebookEdit" => path(&["notebook_path"]),
        "LS" => path(&["path", "directory", "dir"]),
        "Glob" => string(&["pattern", "globPattern", "name"]),
        "Grep" => string(&["pattern", "query", "search"]),
        "Bash" => command_argument(input.get("command"))
            .or_else(|| string(&["cmd", "script"])),
        "WebSearch" => string(&["query", "search_query"]),
        "WebFetch" => string(&["url"]),
        "Task" => string(&["description", "subagent_type"]),
        "SaveMemory" => string(&["fact"]),
        "TodoWrite" => Some("Planning next steps".to_string()),
        "MCP" => match (string(&["server"]), string(&["tool"])) {
            (Some(server), Some(tool)) => Some(format!("{server}.{tool}")),
            (None, Some(tool)) => Some(tool),
            _ => None,
        },
        _ => path(&["file_path", "path"])
            .or_else(|| string(&["command", "query", "pattern", "url"])),
    };
    raw.map(|arg| truncate_display(&arg)).filter(|a| !a.is_empty())
}

/// Commands arrive as a string or as an argv array.
fn command_argument(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            Some(joined).filter(|s| !s.is_empty())
        }
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::path::DEFAULT_SANDBOX_ROOT;
    use serde_json::json;

    fn arg(tool: &str, input: Value) -> Option<String> {
        primary_argument(tool, &input, DEFAULT_SANDBOX_ROOT)
    }

    // ── normalization ───────────────────────────────────────────────────

    #[test]
    fn normalizes_cross_provider_names() {
        assert_eq!(normalize_tool_name("read_file"), "Read");
        assert_eq!(normalize_tool_name("exec_command"), "Bash");
        assert_eq!(normalize_tool_name("google_web_search"), "WebSearch");
        assert_eq!(normalize_tool_name("apply_patch"), "Edit");
        assert_eq!(normalize_tool_name("Read"), "Read");
        assert_eq!(normalize_tool_name("CustomTool"), "CustomTool");
    }

    // ── primary argument table ──────────────────────────────────────────

    #[test]
    fn file_tools_use_clean_path() {
        for tool in ["Read", "Write", "Edit", "MultiEdit"] {
            assert_eq!(
                arg(tool, json!({"file_path": "/home/daytona/ws/src/app.ts"})),
                Some("src/app.ts".to_string())
            );
        }
    }

    #[test]
    fn incomplete_path_yields_none() {
        assert_eq!(arg("Read", json!({"file_path": "/home/dayt"})), None);
    }

    #[test]
    fn search_tools_use_pattern() {
        assert_eq!(arg("Glob", json!({"pattern": "**/*.rs"})), Some("**/*.rs".into()));
        assert_eq!(arg("Grep", json!({"pattern": "fn main"})), Some("fn main".into()));
    }

    #[test]
    fn bash_uses_command_string_or_argv() {
        assert_eq!(arg("Bash", json!({"command": "npm run build"})), Some("npm run build".into()));
        assert_eq!(
            arg("exec_command", json!({"command": ["git", "status"]})),
            Some("git status".into())
        );
    }

    #[test]
    fn web_tools() {
        assert_eq!(arg("WebSearch", json!({"query": "rust serde"})), Some("rust serde".into()));
        assert_eq!(arg("WebFetch", json!({"url": "https://x.dev"})), Some("https://x.dev".into()));
    }

    #[test]
    fn mcp_joins_server_and_tool() {
        assert_eq!(
            arg("mcp_tool_call", json!({"server": "fs", "tool": "read"})),
            Some("fs.read".into())
        );
    }

    #[test]
    fn todo_write_has_fixed_label() {
        assert_eq!(arg("TodoWrite", json!({"todos": []})), Some("Planning next steps".into()));
    }

    #[test]
    fn unknown_tool_falls_back_to_common_keys() {
        assert_eq!(arg("Mystery", json!({"url": "https://a.b"})), Some("https://a.b".into()));
        assert_eq!(arg("Mystery", json!({"other": 1})), None);
    }

    #[test]
    fn non_object_input_is_none() {
        assert_eq!(arg("Read", json!("file")), None);
    }

    // ── display ─────────────────────────────────────────────────────────

    #[test]
    fn long_arguments_are_truncated() {
        let long = "x".repeat(200);
        let out = arg("Bash", json!({"command": long})).unwrap();
        assert_eq!(out.chars().count(), MAX_ARGUMENT_CHARS);
        assert!(out.ends_with('…'));
    }

    #[test]
    fn multiline_arguments_keep_first_line() {
        assert_eq!(
            arg("Bash", json!({"command": "cd app\nnpm test"})),
            Some("cd app".into())
        );
    }

    #[test]
    fn title_format() {
        assert_eq!(tool_title("Read", Some("a.ts")), "[Read] a.ts");
        assert_eq!(tool_title("Read", Some("  ")), "[Read]");
        assert_eq!(tool_title("Read", None), "[Read]");
    }
}
