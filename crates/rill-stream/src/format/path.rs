//! Sandbox path cleaning.
//!
//! Agents run inside a sandbox whose absolute paths look like
//! `/home/daytona/<workspace>/src/app.ts`. Only the workspace-relative part
//! is shown to users. A path that is still being streamed (a prefix of the
//! root, or the root without a workspace-relative part yet) cleans to the
//! empty string rather than leaking an internal fragment.

/// Sandbox runtime root used when no other root is configured.
pub const DEFAULT_SANDBOX_ROOT: &str = "/home/daytona";

/// Strip `<root>/<workspace>/` from a path.
///
/// - `/home/daytona/ws/src/app.ts` → `src/app.ts`
/// - `/home/da`, `/home/daytona/ws` → `""` (incomplete)
/// - paths outside the root are returned unchanged (minus a `file://` scheme)
pub fn clean_sandbox_path(path: &str, root: &str) -> String {
    let path = path.trim();
    let path = path.strip_prefix("file://").unwrap_or(path);
    let root = root.trim_end_matches('/');
    if path.is_empty() || root.is_empty() {
        return path.to_string();
    }

    if root.starts_with(path) {
        return String::new();
    }

    if let Some(rest) = path.strip_prefix(root) {
        return match rest.strip_prefix('/').and_then(|r| r.split_once('/')) {
            Some((_workspace, relative)) => relative.to_string(),
            None => String::new(),
        };
    }

    path.to_string()
}

/// Last path segment, for compact display.
pub fn file_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(path: &str) -> String {
        clean_sandbox_path(path, DEFAULT_SANDBOX_ROOT)
    }

    #[test]
    fn strips_root_and_workspace() {
        assert_eq!(clean("/home/daytona/myworkspace/src/app.ts"), "src/app.ts");
        assert_eq!(clean("/home/daytona/ws/index.html"), "index.html");
    }

    #[test]
    fn incomplete_paths_are_empty() {
        assert_eq!(clean("/home/da"), "");
        assert_eq!(clean("/home/daytona"), "");
        assert_eq!(clean("/home/daytona/"), "");
        assert_eq!(clean("/home/daytona/ws"), "");
        assert_eq!(clean("/home/daytona/ws/"), "");
    }

    #[test]
    fn root_lookalike_is_not_leaked() {
        assert_eq!(clean("/home/daytonaX/file"), "");
    }

    #[test]
    fn outside_paths_are_unchanged() {
        assert_eq!(clean("src/lib.rs"), "src/lib.rs");
        assert_eq!(clean("/etc/hosts"), "/etc/hosts");
    }

    #[test]
    fn file_scheme_is_stripped() {
        assert_eq!(clean("file:///home/daytona/ws/a.txt"), "a.txt");
        assert_eq!(clean("file:///tmp/x"), "/tmp/x");
    }

    #[test]
    fn custom_root() {
        assert_eq!(clean_sandbox_path("/workspace/app/a/b.rs", "/workspace/"), "a/b.rs");
    }

    #[test]
    fn file_name_takes_last_segment() {
        assert_eq!(file_name("src/app.ts"), "app.ts");
        assert_eq!(file_name("app.ts"), "app.ts");
        assert_eq!(file_name("dir/"), "dir");
    }
}
