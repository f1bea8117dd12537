//! Stateless formatting utilities.
//!
//! - [`text`]: flatten provider message shapes to display text
//! - [`json`]: permissive parsing of possibly-incomplete JSON
//! - [`path`]: sandbox path cleaning
//! - [`tools`]: tool-name normalization, primary-argument extraction, titles
//!
//! [`Formatter`] bundles the configurable pieces (sandbox root, plan limit)
//! so adapters receive one value instead of loose settings.

pub mod json;
pub mod path;
pub mod text;
pub mod tools;

use serde_json::Value;

pub use json::{parse_json_object, parse_partial_json};
pub use path::{DEFAULT_SANDBOX_ROOT, clean_sandbox_path};
pub use text::{extract_message_text, flatten_content};
pub use tools::{normalize_tool_name, tool_title, truncate_display};

/// Formatting configuration shared by all adapters.
#[derive(Clone, Debug)]
pub struct Formatter {
    sandbox_root: String,
    plan_entry_limit: usize,
}

impl Default for Formatter {
    fn default() -> Self {
        Self {
            sandbox_root: DEFAULT_SANDBOX_ROOT.to_string(),
            plan_entry_limit: 6,
        }
    }
}

impl Formatter {
    /// Create a formatter for a sandbox root and plan entry cap.
    #[must_use]
    pub fn new(sandbox_root: impl Into<String>, plan_entry_limit: usize) -> Self {
        Self {
            sandbox_root: sandbox_root.into(),
            plan_entry_limit: plan_entry_limit.max(1),
        }
    }

    /// Sandbox root stripped from displayed paths.
    pub fn sandbox_root(&self) -> &str {
        &self.sandbox_root
    }

    /// Maximum plan entries rendered.
    pub fn plan_entry_limit(&self) -> usize {
        self.plan_entry_limit
    }

    /// Strip the sandbox prefix from a path (see [`clean_sandbox_path`]).
    pub fn clean_path(&self, path: &str) -> String {
        clean_sandbox_path(path, &self.sandbox_root)
    }

    /// Primary argument of a tool call, if the input has one yet.
    pub fn primary_argument(&self, tool_name: &str, input: &Value) -> Option<String> {
        tools::primary_argument(tool_name, input, &self.sandbox_root)
    }

    /// `"[Tool] arg"` title for a tool call, or `None` while no argument is known.
    pub fn tool_title(&self, tool_name: &str, input: &Value) -> Option<String> {
        self.primary_argument(tool_name, input)
            .map(|arg| tool_title(normalize_tool_name(tool_name), Some(&arg)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
