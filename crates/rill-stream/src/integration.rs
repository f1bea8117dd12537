//! Integration-marker detection in free assistant text.
//!
//! An explicit `[INTEGRATION_REQUIRED:<name>]` tag always wins and is
//! stripped from the displayed text. Without a tag, the configured
//! heuristic patterns run, but only for integrations the host does not
//! already report as connected.

use std::sync::LazyLock;

use regex::Regex;
use rill_settings::{IntegrationSettings, SettingsError};

use crate::host::IntegrationHints;

static INTEGRATION_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[INTEGRATION_REQUIRED:\s*([A-Za-z0-9_\-]+)\s*\]").unwrap()
});

/// A detected integration requirement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IntegrationMatch {
    /// Lower-case integration name (`supabase`, `github`).
    pub integration: String,
    /// Text to display, with any explicit tag removed.
    pub display_text: String,
    /// Whether the match came from an explicit tag.
    pub explicit: bool,
}

/// Compiled integration detector.
#[derive(Clone, Debug, Default)]
pub struct IntegrationDetector {
    heuristics_enabled: bool,
    patterns: Vec<(String, Regex)>,
}

impl IntegrationDetector {
    /// Compile the configured heuristic patterns.
    pub fn from_settings(settings: &IntegrationSettings) -> Result<Self, SettingsError> {
        let patterns = settings
            .patterns
            .iter()
            .map(|p| Ok((p.integration.to_ascii_lowercase(), p.compile()?)))
            .collect::<Result<Vec<_>, SettingsError>>()?;
        Ok(Self {
            heuristics_enabled: settings.enabled,
            patterns,
        })
    }

    /// Number of compiled heuristic patterns.
    pub fn pattern_count(&self) -> usize {
        self.patterns.len()
    }

    /// Scan `text` for an integration requirement.
    pub fn detect(&self, text: &str, hints: IntegrationHints) -> Option<IntegrationMatch> {
        if let Some(caps) = INTEGRATION_TAG.captures(text) {
            let integration = caps[1].to_ascii_lowercase();
            let stripped = INTEGRATION_TAG.replace_all(text, "");
            let display_text = collapse_blank_lines(stripped.trim());
            return Some(IntegrationMatch {
                display_text: if display_text.is_empty() {
                    default_prompt(&integration)
                } else {
                    display_text
                },
                integration,
                explicit: true,
            });
        }
        if !self.heuristics_enabled {
            return None;
        }
        self.patterns
            .iter()
            .filter(|(integration, _)| !hints.is_connected(integration))
            .find(|(_, re)| re.is_match(text))
            .map(|(integration, _)| IntegrationMatch {
                integration: integration.clone(),
                display_text: text.trim().to_string(),
                explicit: false,
            })
    }
}

fn collapse_blank_lines(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0;
    for line in text.lines() {
        if line.trim().is_empty() {
            blank_run += 1;
            if blank_run > 1 {
                continue;
            }
        } else {
            blank_run = 0;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(line.trim_end());
    }
    out
}

/// Display name for an integration (`github` → `GitHub`).
pub fn integration_display_name(integration: &str) -> String {
    match integration.to_ascii_lowercase().as_str() {
        "github" => "GitHub".to_string(),
        "supabase" => "Supabase".to_string(),
        other => {
            let mut chars = other.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars).collect()
            })
        }
    }
}

/// Button label for an integration prompt.
pub fn button_text(integration: &str) -> String {
    format!("Connect {}", integration_display_name(integration))
}

/// Prompt text used when a tag carries no surrounding text.
pub fn default_prompt(integration: &str) -> String {
    format!(
        "Connect {} to continue.",
        integration_display_name(integration)
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
