//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RillSettings::default()`]
//! 2. If `~/.rill/settings.json` exists, deep-merge user values over defaults
//! 3. Apply environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use rill_core::LogFormat;
use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::RillSettings;

/// Resolve the path to the settings file (`~/.rill/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".rill").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<RillSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or invalid values, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<RillSettings> {
    let defaults = serde_json::to_value(RillSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: RillSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `RILL_*` environment variable overrides.
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_env_overrides(settings: &mut RillSettings) {
    apply_overrides(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary lookup. Split out so tests need not
/// mutate the process environment.
pub fn apply_overrides(settings: &mut RillSettings, lookup: impl Fn(&str) -> Option<String>) {
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("RILL_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("RILL_LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => tracing::warn!(key = "RILL_LOG_FORMAT", value = %v, "invalid log format env var, ignoring"),
        }
    }
    if let Some(v) = read("RILL_INTEGRATIONS_ENABLED") {
        match parse_bool(&v) {
            Some(b) => settings.integrations.enabled = b,
            None => tracing::warn!(key = "RILL_INTEGRATIONS_ENABLED", value = %v, "invalid boolean env var, ignoring"),
        }
    }
    if let Some(v) = read("RILL_AUTO_OPEN_MODAL") {
        match parse_bool(&v) {
            Some(b) => settings.integrations.auto_open_modal = b,
            None => tracing::warn!(key = "RILL_AUTO_OPEN_MODAL", value = %v, "invalid boolean env var, ignoring"),
        }
    }
    if let Some(v) = read("RILL_SANDBOX_ROOT") {
        settings.processor.sandbox_root = v.trim_end_matches('/').to_string();
    }
    if let Some(v) = read("RILL_PLAN_ENTRY_LIMIT") {
        match parse_usize_range(&v, 1, 50) {
            Some(n) => settings.processor.plan_entry_limit = n,
            None => tracing::warn!(key = "RILL_PLAN_ENTRY_LIMIT", value = %v, "invalid usize env var, ignoring"),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a log format name.
pub fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"logging": {"level": "warn", "format": "compact"}});
        let source = serde_json::json!({"logging": {"level": "debug"}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["logging"]["level"], "debug");
        assert_eq!(merged["logging"]["format"], "compact");
    }

    #[test]
    fn merge_replaces_arrays() {
        let target = serde_json::json!({"patterns": [1, 2, 3]});
        let source = serde_json::json!({"patterns": [9]});
        assert_eq!(deep_merge(target, source)["patterns"], serde_json::json!([9]));
    }

    #[test]
    fn merge_skips_nulls() {
        let target = serde_json::json!({"a": 1});
        let source = serde_json::json!({"a": null});
        assert_eq!(deep_merge(target, source)["a"], 1);
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("nope.json")).unwrap();
        assert_eq!(settings.processor.plan_entry_limit, 6);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"integrations": {"autoOpenModal": true}, "processor": {"planEntryLimit": 3}}"#,
        )
        .unwrap();
        let settings = load_settings_from_path(&path).unwrap();
        assert!(settings.integrations.auto_open_modal);
        assert!(settings.integrations.enabled);
        assert_eq!(settings.integrations.patterns.len(), 4);
        assert_eq!(settings.processor.plan_entry_limit, 3);
        assert_eq!(settings.processor.sandbox_root, "/home/daytona");
    }

    #[test]
    fn invalid_json_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::Json(_))
        ));
    }

    #[test]
    fn invalid_pattern_in_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"integrations": {"patterns": [{"integration": "github", "pattern": "(["}]}}"#,
        )
        .unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidPattern { .. })
        ));
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn overrides_apply() {
        let mut settings = RillSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("RILL_LOG_LEVEL", "debug"),
                ("RILL_LOG_FORMAT", "json"),
                ("RILL_INTEGRATIONS_ENABLED", "off"),
                ("RILL_AUTO_OPEN_MODAL", "yes"),
                ("RILL_SANDBOX_ROOT", "/workspace/"),
                ("RILL_PLAN_ENTRY_LIMIT", "10"),
            ]),
        );
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert!(!settings.integrations.enabled);
        assert!(settings.integrations.auto_open_modal);
        assert_eq!(settings.processor.sandbox_root, "/workspace");
        assert_eq!(settings.processor.plan_entry_limit, 10);
    }

    #[test]
    fn invalid_overrides_are_ignored() {
        let mut settings = RillSettings::default();
        apply_overrides(
            &mut settings,
            env(&[
                ("RILL_LOG_FORMAT", "xml"),
                ("RILL_INTEGRATIONS_ENABLED", "maybe"),
                ("RILL_PLAN_ENTRY_LIMIT", "0"),
                ("RILL_LOG_LEVEL", ""),
            ]),
        );
        assert_eq!(settings.logging.format, LogFormat::Compact);
        assert!(settings.integrations.enabled);
        assert_eq!(settings.processor.plan_entry_limit, 6);
        assert_eq!(settings.logging.level, "warn");
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool("nah"), None);
    }

    #[test]
    fn parse_usize_range_bounds() {
        assert_eq!(parse_usize_range("1", 1, 50), Some(1));
        assert_eq!(parse_usize_range("51", 1, 50), None);
        assert_eq!(parse_usize_range("x", 1, 50), None);
    }
}
