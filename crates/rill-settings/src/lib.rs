//! # rill-settings
//!
//! Configuration management with layered sources for the rill processor.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`RillSettings::default()`]
//! 2. **User file**: `~/.rill/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `RILL_*` overrides (highest priority)
//!
//! There is no global: binaries load settings once and hand the processor
//! its configuration explicitly.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_settings_are_valid() {
        let settings = RillSettings::default();
        assert_eq!(settings.name, "rill");
        assert_eq!(settings.logging.level, "warn");
        assert!(settings.integrations.enabled);
        assert!(!settings.integrations.auto_open_modal);
        assert_eq!(settings.processor.sandbox_root, "/home/daytona");
        assert_eq!(settings.processor.plan_entry_limit, 6);
        settings.validate().unwrap();
    }
}
