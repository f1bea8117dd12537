//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON
//! settings file. Types marked with `#[serde(default)]` allow partial JSON;
//! missing fields get their default value during deserialization.

use regex::Regex;
use rill_core::LogFormat;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RillSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Logging configuration.
    pub logging: LoggingSettings,
    /// Integration-marker detection.
    pub integrations: IntegrationSettings,
    /// Event processor behavior.
    pub processor: ProcessorSettings,
}

impl Default for RillSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "rill".to_string(),
            logging: LoggingSettings::default(),
            integrations: IntegrationSettings::default(),
            processor: ProcessorSettings::default(),
        }
    }
}

impl RillSettings {
    /// Check values that deserialization alone cannot reject.
    pub fn validate(&self) -> Result<()> {
        if self.processor.plan_entry_limit == 0 {
            return Err(SettingsError::InvalidValue(
                "processor.planEntryLimit must be greater than 0".to_string(),
            ));
        }
        if !self.processor.sandbox_root.starts_with('/') {
            return Err(SettingsError::InvalidValue(format!(
                "processor.sandboxRoot must be absolute, got {:?}",
                self.processor.sandbox_root
            )));
        }
        for pattern in &self.integrations.patterns {
            let _ = pattern.compile()?;
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level or filter directive.
    pub level: String,
    /// Output format.
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: LogFormat::Compact,
        }
    }
}

/// Integration-marker detection settings.
///
/// The heuristic patterns match free-form model output and are inherently
/// approximate; they are configuration, not logic.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IntegrationSettings {
    /// Whether heuristic (untagged) detection runs at all.
    pub enabled: bool,
    /// Ask the host to open the connection modal as soon as a prompt is emitted.
    pub auto_open_modal: bool,
    /// Heuristic patterns, checked in order.
    pub patterns: Vec<IntegrationPattern>,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_open_modal: false,
            patterns: vec![
                IntegrationPattern::new(
                    "supabase",
                    r"(?i)\bsupabase\b[^.\n]{0,80}\b(?:not|isn't|is not)\s+(?:yet\s+)?connected",
                ),
                IntegrationPattern::new(
                    "supabase",
                    r"(?i)\bplease\s+connect\s+(?:your\s+|a\s+)?supabase\b",
                ),
                IntegrationPattern::new(
                    "github",
                    r"(?i)\bgithub\b[^.\n]{0,80}\b(?:not|isn't|is not)\s+(?:yet\s+)?connected",
                ),
                IntegrationPattern::new(
                    "github",
                    r"(?i)\bplease\s+connect\s+(?:your\s+|a\s+)?github\b",
                ),
            ],
        }
    }
}

/// One heuristic integration pattern.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationPattern {
    /// Integration the pattern signals (`supabase`, `github`).
    pub integration: String,
    /// Regex source.
    pub pattern: String,
}

impl IntegrationPattern {
    /// Create a pattern entry.
    #[must_use]
    pub fn new(integration: &str, pattern: &str) -> Self {
        Self {
            integration: integration.to_string(),
            pattern: pattern.to_string(),
        }
    }

    /// Compile the regex source.
    pub fn compile(&self) -> Result<Regex> {
        Regex::new(&self.pattern).map_err(|source| SettingsError::InvalidPattern {
            integration: self.integration.clone(),
            source,
        })
    }
}

/// Event processor behavior.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessorSettings {
    /// Sandbox runtime root stripped from displayed paths.
    pub sandbox_root: String,
    /// Maximum number of plan entries rendered for a Gemini plan.
    pub plan_entry_limit: usize,
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self {
            sandbox_root: "/home/daytona".to_string(),
            plan_entry_limit: 6,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
