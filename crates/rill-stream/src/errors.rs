//! Provider error reclassification.
//!
//! Provider diagnostics are rewritten into short, actionable chat entries.
//! Usage/rate/quota/billing failures get a provider-specific body; any
//! other failure keeps its diagnostic in a status/reason/error summary.

use rill_core::Provider;

/// Lower-case phrases that mark a usage-limit failure.
const LIMIT_PHRASES: &[&str] = &[
    "rate_limit",
    "rate limit",
    "ratelimit",
    "usage limit",
    "usage_limit",
    "quota",
    "billing",
    "credit balance",
    "too many requests",
    "limit reached",
    "limit exceeded",
    "resource_exhausted",
];

/// Phrases that mean the account must be upgraded rather than waited out.
const UPGRADE_PHRASES: &[&str] = &[
    "insufficient_quota",
    "billing",
    "payment",
    "upgrade",
    "credit balance",
    "purchase",
];

/// A user-facing error entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FriendlyError {
    /// Short title (`"Claude • Usage Limit"`).
    pub title: String,
    /// Explanatory body.
    pub body: String,
}

fn contains_any(haystack: &str, phrases: &[&str]) -> bool {
    phrases.iter().any(|p| haystack.contains(p))
}

/// Whether `text` reads like a usage/rate/quota/billing failure.
pub fn is_limit_error(text: &str) -> bool {
    contains_any(&text.to_ascii_lowercase(), LIMIT_PHRASES)
}

fn provider_label(provider: Option<Provider>) -> &'static str {
    provider.map_or("Agent", Provider::display_name)
}

/// Rewrite a usage-limit failure into a provider-specific message.
/// Returns `None` when `text` is not a limit error.
pub fn classify_limit_error(provider: Option<Provider>, text: &str) -> Option<FriendlyError> {
    let lower = text.to_ascii_lowercase();
    if !contains_any(&lower, LIMIT_PHRASES) {
        return None;
    }
    let body = match provider {
        Some(Provider::Claude) => {
            "You've reached your Claude usage limit. Wait for the limit to reset, \
             or upgrade to a higher tier for more capacity."
        }
        Some(Provider::Glm) => {
            "You've reached your GLM usage limit. Wait for the limit to reset, \
             or upgrade your GLM subscription."
        }
        Some(Provider::Codex) if contains_any(&lower, UPGRADE_PHRASES) => {
            "Your OpenAI account has no remaining quota. Add credits or upgrade \
             your plan to keep using Codex."
        }
        Some(Provider::Codex) => {
            "You've hit the Codex rate limit for your current plan. Your plan is \
             active; wait for the limit to reset and try again."
        }
        Some(Provider::Gemini) => {
            "You've reached your Gemini usage limit. Switch to another Google \
             account, or upgrade your Gemini plan."
        }
        None => "The agent reached a usage limit. Wait for it to reset and try again.",
    };
    Some(FriendlyError {
        title: format!("{} • Usage Limit", provider_label(provider)),
        body: body.to_string(),
    })
}

/// `error_max_turns` → `Error Max Turns`.
pub fn humanize_status(status: &str) -> String {
    status
        .split(['_', '-', ' '])
        .filter(|w| !w.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect()
            })
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Entry for a turn that ended with a non-success status.
pub fn turn_failure(
    provider: Option<Provider>,
    status: &str,
    reason: Option<&str>,
    error: Option<&str>,
) -> FriendlyError {
    let combined = [Some(status), reason, error]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if let Some(friendly) = classify_limit_error(provider, &combined) {
        return friendly;
    }
    let mut lines = vec![format!("Status: {status}")];
    if let Some(reason) = reason {
        lines.push(format!("Reason: {reason}"));
    }
    if let Some(error) = error {
        lines.push(format!("Error: {error}"));
    }
    FriendlyError {
        title: format!("{} • {}", provider_label(provider), humanize_status(status)),
        body: lines.join("\n"),
    }
}

/// Entry for an explicit error event.
pub fn error_event(provider: Option<Provider>, text: Option<&str>) -> FriendlyError {
    let text = text.map(str::trim).filter(|t| !t.is_empty());
    if let Some(friendly) = text.and_then(|t| classify_limit_error(provider, t)) {
        return friendly;
    }
    FriendlyError {
        title: format!("{} • Error", provider_label(provider)),
        body: text.unwrap_or("An unknown error occurred.").to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
