//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or validating settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read the settings file from disk.
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse JSON in the settings file.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value was invalid (e.g., out of range).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
    /// An integration heuristic pattern is not a valid regex.
    #[error("invalid integration pattern for {integration}: {source}")]
    InvalidPattern {
        /// Integration the pattern belongs to.
        integration: String,
        /// Regex compilation error.
        #[source]
        source: regex::Error,
    },
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid").unwrap_err();
        let err = SettingsError::Json(json_err);
        assert!(err.to_string().contains("parse settings JSON"));
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("planEntryLimit must be > 0".to_string());
        assert_eq!(
            err.to_string(),
            "invalid settings value: planEntryLimit must be > 0"
        );
    }

    #[test]
    fn invalid_pattern_display() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = SettingsError::InvalidPattern {
            integration: "github".into(),
            source,
        };
        assert!(err.to_string().starts_with("invalid integration pattern for github"));
    }
}
