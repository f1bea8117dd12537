//! Provider-agnostic event policy.
//!
//! Runs before any adapter. Each rule that matches ends processing for the
//! event, except the tool-shaped heuristic, which only schedules a file-tree
//! refresh and lets the event continue.

use rill_core::{ChatEvent, ChatMessage, MessageId, Provider, SecretsRequest};
use rill_settings::{IntegrationSettings, SettingsError};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::context::EventContext;
use crate::host::HostEffect;
use crate::errors::{FriendlyError, error_event, turn_failure};
use crate::integration::{IntegrationDetector, IntegrationMatch, button_text, default_prompt};

/// Statuses that end a turn without a failure notice.
const SUCCESS_STATUSES: &[&str] = &["completed", "success", "cancelled"];

/// Event-name suffixes that are not statuses.
const NON_STATUS_SUFFIXES: &[&str] = &["turn_end", "result", "completed", "cancelled"];

/// Provider-agnostic handler.
#[derive(Clone, Debug, Default)]
pub struct CommonHandler {
    detector: IntegrationDetector,
    auto_open_modal: bool,
}

pub(crate) fn str_field<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Error text from a string field or an `{ message }` object.
fn error_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Object(obj) => obj
            .get("message")
            .and_then(error_text)
            .or_else(|| obj.get("error").and_then(error_text))
            .or_else(|| obj.get("type").and_then(error_text)),
        _ => None,
    }
}

impl CommonHandler {
    /// Build from integration settings; fails on an invalid pattern.
    pub fn from_settings(settings: &IntegrationSettings) -> Result<Self, SettingsError> {
        Ok(Self {
            detector: IntegrationDetector::from_settings(settings)?,
            auto_open_modal: settings.auto_open_modal,
        })
    }

    /// Apply the common rules. Returns `true` when the event is fully handled.
    pub fn handle(&self, event: &ChatEvent, ctx: &mut EventContext<'_>) -> bool {
        let provider = Provider::resolve(event);
        let kind = event.kind();

        if is_turn_end(event, provider) {
            self.handle_turn_end(event, provider, ctx);
            return true;
        }

        if provider == Some(Provider::Codex) {
            if kind == "stderr" || str_field(&event.payload.raw, "type") == Some("stderr") {
                debug!(session_id = %event.session_id, sequence = event.sequence, "codex stderr swallowed");
                return true;
            }
            if matches!(kind, "stream_error" | "response_error" | "response.failed") {
                handle_codex_stream_error(event, ctx);
                return true;
            }
        }

        if event.event == "error" || event.event.ends_with(".error") {
            ctx.flush_buffers(false);
            let text = event_error_text(event);
            warn!(session_id = %event.session_id, event = %event.event, error = ?text, "provider error event");
            emit(ctx, &error_event(provider, text.as_deref()));
            return true;
        }

        if kind == "system" {
            return true;
        }

        if kind == "ask_secrets" {
            handle_ask_secrets(event, ctx);
            return true;
        }

        if kind == "prompt_integration" {
            self.handle_prompt_integration(event, ctx);
            return true;
        }

        if is_tool_shaped(event) {
            ctx.queue(HostEffect::FileTreeRefresh);
        }

        if let Some(content) = event.payload_str("content") {
            match self.detector.detect(content, ctx.hints) {
                Some(found) => self.emit_integration_prompt(&found, ctx),
                None => {
                    ctx.append_assistant(content);
                    ctx.refresh_preview();
                }
            }
            return true;
        }

        false
    }

    fn handle_turn_end(
        &self,
        event: &ChatEvent,
        provider: Option<Provider>,
        ctx: &mut EventContext<'_>,
    ) {
        ctx.state.busy = false;
        ctx.queue(HostEffect::SetLoading(false));
        ctx.queue(HostEffect::TurnEnd);
        ctx.flush_buffers(false);

        let status = turn_status(event).unwrap_or_else(|| "completed".to_string());
        info!(
            session_id = %event.session_id,
            sequence = event.sequence,
            provider = provider.map(Provider::tag),
            status = %status,
            "turn ended"
        );
        if SUCCESS_STATUSES.contains(&status.to_ascii_lowercase().as_str()) {
            return;
        }

        let raw = &event.payload.raw;
        let reason = str_field(raw, "reason")
            .or_else(|| event.payload_str("reason"))
            .or_else(|| str_field(raw, "stop_reason"));
        let error = event_error_text(event).or_else(|| {
            raw.get("is_error")
                .and_then(Value::as_bool)
                .filter(|is_error| *is_error)
                .and_then(|_| str_field(raw, "result"))
                .map(str::to_string)
        });
        warn!(session_id = %event.session_id, status = %status, error = ?error, "turn failed");
        emit(ctx, &turn_failure(provider, &status, reason, error.as_deref()));
    }

    fn handle_prompt_integration(&self, event: &ChatEvent, ctx: &mut EventContext<'_>) {
        let raw = &event.payload.raw;
        let Some(integration) = str_field(raw, "integration")
            .or_else(|| event.payload_str("integration"))
            .map(str::to_ascii_lowercase)
        else {
            debug!(session_id = %event.session_id, "integration prompt without integration");
            return;
        };
        let text = str_field(raw, "message")
            .or_else(|| str_field(raw, "content"))
            .map_or_else(|| default_prompt(&integration), str::to_string);
        self.emit_integration_prompt(
            &IntegrationMatch {
                integration,
                display_text: text,
                explicit: true,
            },
            ctx,
        );
    }

    fn emit_integration_prompt(&self, found: &IntegrationMatch, ctx: &mut EventContext<'_>) {
        let message = ChatMessage::integration_prompt(
            MessageId::for_integration_prompt(&ctx.state.session_id, &found.integration),
            &found.integration,
            button_text(&found.integration),
            found.display_text.clone(),
            ctx.created_at,
        );
        ctx.upsert(&message);
        if self.auto_open_modal {
            ctx.queue(HostEffect::OpenIntegrationModal(found.integration.clone()));
        }
    }
}

fn emit(ctx: &EventContext<'_>, friendly: &FriendlyError) {
    ctx.upsert(&ChatMessage::system(
        friendly.title.clone(),
        friendly.body.clone(),
        ctx.created_at,
    ));
}

fn is_turn_end(event: &ChatEvent, provider: Option<Provider>) -> bool {
    let name = event.event.as_str();
    if name.ends_with("turn_end") || name.ends_with(".completed") || name.ends_with(".cancelled") {
        return true;
    }
    if event.metadata_kind() == Some("turn_end") || event.payload_str("type") == Some("turn_end") {
        return true;
    }
    provider != Some(Provider::Glm)
        && (event.kind().starts_with("result")
            || str_field(&event.payload.raw, "type") == Some("result"))
}

/// Status of a turn-end event from the first candidate field that has one.
fn turn_status(event: &ChatEvent) -> Option<String> {
    let raw = &event.payload.raw;
    event
        .payload
        .metadata
        .as_ref()
        .and_then(|m| m.status.as_deref())
        .or_else(|| event.payload_str("status"))
        .or_else(|| str_field(raw, "status"))
        .or_else(|| str_field(raw, "subtype"))
        .map(str::to_string)
        .or_else(|| {
            (raw.get("is_error").and_then(Value::as_bool) == Some(true)).then(|| "error".to_string())
        })
        .or_else(|| {
            event
                .event
                .rsplit_once('.')
                .map(|(_, suffix)| suffix)
                .filter(|s| !NON_STATUS_SUFFIXES.contains(s))
                .map(str::to_string)
        })
}

fn event_error_text(event: &ChatEvent) -> Option<String> {
    let raw = &event.payload.raw;
    raw.get("error")
        .and_then(error_text)
        .or_else(|| event.payload_field("error").and_then(error_text))
        .or_else(|| raw.get("message").and_then(error_text))
        .or_else(|| event.payload_field("message").and_then(error_text))
        .or_else(|| raw.as_str().map(str::to_string))
}

fn is_tool_shaped(event: &ChatEvent) -> bool {
    let contains_tool = |s: &str| s.to_ascii_lowercase().contains("tool");
    contains_tool(&event.event)
        || event.metadata_kind().is_some_and(contains_tool)
        || str_field(&event.payload.raw, "type").is_some_and(contains_tool)
}

fn handle_ask_secrets(event: &ChatEvent, ctx: &mut EventContext<'_>) {
    let raw = &event.payload.raw;
    let secret_names: Vec<String> = raw
        .get("secrets")
        .or_else(|| raw.get("secret_names"))
        .or_else(|| raw.get("secretNames"))
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    item.as_str()
                        .or_else(|| str_field(item, "name"))
                        .or_else(|| str_field(item, "key"))
                })
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    let request_id = str_field(raw, "request_id")
        .or_else(|| str_field(raw, "requestId"))
        .map_or_else(
            || format!("{}-{}", event.session_id, event.sequence),
            str::to_string,
        );
    let content = str_field(raw, "message").map_or_else(
        || {
            format!(
                "The agent needs the following secrets to continue: {}",
                secret_names.join(", ")
            )
        },
        str::to_string,
    );
    ctx.upsert(&ChatMessage::secrets_request(
        SecretsRequest {
            request_id,
            secret_names,
        },
        content,
        ctx.created_at,
    ));
}

fn handle_codex_stream_error(event: &ChatEvent, ctx: &mut EventContext<'_>) {
    ctx.flush_buffers(false);
    let text = event_error_text(event).unwrap_or_else(|| "The Codex stream failed.".to_string());
    warn!(session_id = %event.session_id, sequence = event.sequence, error = %text, "codex stream error");
    let key = format!("codex-error-{}", event.sequence);
    ctx.ensure_tool(&key, Some("Codex"));
    let _ = ctx.set_tool_title(
        &key,
        "Codex • Stream Error",
        None,
        crate::state::TitleSource::Complete,
    );
    ctx.append_tool_text(&key, &text);
    ctx.finalize_tool(&key, Some(&text));
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
