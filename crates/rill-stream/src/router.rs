//! Event router: the processor's entry point.
//!
//! `process` gates on the session's sequence watermark, short-circuits
//! replay traffic, then runs the common handler and finally the provider
//! adapter. It never fails: malformed input degrades to "no update yet" and
//! unknown providers are ignored.

use rill_core::{ChatEvent, Provider, SessionId};
use rill_settings::{IntegrationSettings, RillSettings, SettingsError};
use tracing::debug;

use crate::adapters::AdapterRegistry;
use crate::common::CommonHandler;
use crate::context::{EventContext, ProcessOptions};
use crate::format::Formatter;
use crate::host::{HostDependencies, HostEffect, IntegrationHints, MessageBufferHandlers};
use crate::state::SessionState;
use crate::store::SessionStore;

/// What happened to an event. Informational only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Sequence at or below the watermark; dropped.
    Duplicate,
    /// Replay traffic; watermark advanced, nothing else.
    Replayed,
    /// Fully handled by the common handler.
    Common,
    /// Handled by a provider adapter.
    Adapter(Provider),
    /// No adapter for the event's provider.
    Unhandled,
}

/// Processor configuration.
#[derive(Clone, Debug, Default)]
pub struct ProcessorConfig {
    /// Path and plan formatting.
    pub formatter: Formatter,
    /// Integration-marker detection.
    pub integrations: IntegrationSettings,
}

impl ProcessorConfig {
    /// Derive the processor configuration from loaded settings.
    pub fn from_settings(settings: &RillSettings) -> Self {
        Self {
            formatter: Formatter::new(
                settings.processor.sandbox_root.clone(),
                settings.processor.plan_entry_limit,
            ),
            integrations: settings.integrations.clone(),
        }
    }
}

/// Multi-provider streaming event processor.
pub struct EventProcessor {
    store: SessionStore,
    adapters: AdapterRegistry,
    common: CommonHandler,
    formatter: Formatter,
}

impl EventProcessor {
    /// Build a processor with the built-in adapters.
    pub fn new(config: ProcessorConfig) -> Result<Self, SettingsError> {
        Self::with_adapters(config, AdapterRegistry::default())
    }

    /// Build a processor with a custom adapter table.
    pub fn with_adapters(
        config: ProcessorConfig,
        adapters: AdapterRegistry,
    ) -> Result<Self, SettingsError> {
        Ok(Self {
            store: SessionStore::new(),
            adapters,
            common: CommonHandler::from_settings(&config.integrations)?,
            formatter: config.formatter,
        })
    }

    /// Process one event to completion.
    ///
    /// Buffer handlers run under the session lock; queued side effects are
    /// delivered to `deps` after it is released.
    pub fn process(
        &self,
        event: &ChatEvent,
        handlers: &dyn MessageBufferHandlers,
        deps: &dyn HostDependencies,
        options: ProcessOptions,
    ) -> ProcessOutcome {
        let hints = deps.integration_connection_hints();
        let (outcome, effects) = self.process_locked(event, handlers, options, hints);
        for effect in &effects {
            effect.apply(deps);
        }
        outcome
    }

    fn process_locked(
        &self,
        event: &ChatEvent,
        handlers: &dyn MessageBufferHandlers,
        options: ProcessOptions,
        hints: IntegrationHints,
    ) -> (ProcessOutcome, Vec<HostEffect>) {
        let session = self.store.session(&event.session_id);
        let mut state = session.lock();

        if !state.accept_sequence(event.sequence) {
            debug!(
                session_id = %event.session_id,
                sequence = event.sequence,
                last_sequence = ?state.last_sequence,
                event = %event.event,
                "stale event dropped"
            );
            return (ProcessOutcome::Duplicate, Vec::new());
        }
        if options.replay {
            return (ProcessOutcome::Replayed, Vec::new());
        }

        state.busy = true;
        let mut ctx = EventContext::new(
            &mut state,
            handlers,
            &self.formatter,
            options,
            hints,
            event.created_at,
        );
        ctx.queue(HostEffect::SetLoading(true));
        let outcome = self.route(event, &mut ctx);
        (outcome, ctx.take_effects())
    }

    fn route(&self, event: &ChatEvent, ctx: &mut EventContext<'_>) -> ProcessOutcome {
        if self.common.handle(event, ctx) {
            return ProcessOutcome::Common;
        }

        let Some(provider) = Provider::resolve(event) else {
            debug!(session_id = %event.session_id, event = %event.event, "no provider for event");
            return ProcessOutcome::Unhandled;
        };
        let Some(adapter) = self.adapters.get(provider) else {
            debug!(session_id = %event.session_id, provider = provider.tag(), "no adapter registered");
            return ProcessOutcome::Unhandled;
        };
        adapter.process(event, ctx);
        ProcessOutcome::Adapter(provider)
    }

    /// Discard a session's buffers and tool registry; the watermark survives.
    pub fn reset_session(&self, session_id: &SessionId) -> bool {
        self.store.reset(session_id)
    }

    /// Clone of a session's state.
    pub fn session_snapshot(&self, session_id: &SessionId) -> Option<SessionState> {
        self.store.snapshot(session_id)
    }

    /// The underlying session store.
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    /// The formatter in use.
    pub fn formatter(&self) -> &Formatter {
        &self.formatter
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::NullHost;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicBool, Ordering};
    use serde_json::json;

    fn processor() -> EventProcessor {
        EventProcessor::new(ProcessorConfig::default()).unwrap()
    }

    fn send(processor: &EventProcessor, event: &ChatEvent, replay: bool) -> ProcessOutcome {
        processor.process(event, &NullHost, &NullHost, ProcessOptions { replay })
    }

    #[test]
    fn outcomes() {
        let p = processor();
        let delta = ChatEvent::new(
            "s1",
            1,
            "claude.content_block_delta",
            json!({"index": 0, "delta": {"type": "text_delta", "text": "a"}}),
        );
        assert_matches!(send(&p, &delta, false), ProcessOutcome::Adapter(Provider::Claude));
        assert_matches!(send(&p, &delta, false), ProcessOutcome::Duplicate);

        let system = ChatEvent::new("s1", 2, "claude.system", json!({}));
        assert_matches!(send(&p, &system, false), ProcessOutcome::Common);

        let unknown = ChatEvent::new("s1", 3, "mystery.event", json!({}));
        assert_matches!(send(&p, &unknown, false), ProcessOutcome::Unhandled);

        let replayed = ChatEvent::new("s1", 4, "claude.content_block_delta", json!({}));
        assert_matches!(send(&p, &replayed, true), ProcessOutcome::Replayed);
        assert_eq!(p.session_snapshot(&"s1".into()).unwrap().last_sequence, Some(4));
    }

    #[test]
    fn empty_registry_leaves_events_unhandled() {
        let p = EventProcessor::with_adapters(ProcessorConfig::default(), AdapterRegistry::empty())
            .unwrap();
        let event = ChatEvent::new("s1", 1, "claude.content_block_delta", json!({}));
        assert_matches!(send(&p, &event, false), ProcessOutcome::Unhandled);
    }

    // ── host re-entry ───────────────────────────────────────────────────

    struct ResetOnTurnEnd<'a> {
        processor: &'a EventProcessor,
        reset: AtomicBool,
    }

    impl HostDependencies for ResetOnTurnEnd<'_> {
        fn set_loading(&self, _: bool) {
            let _ = self.processor.session_snapshot(&"s1".into());
        }
        fn trigger_live_preview_refresh(&self) {}
        fn refresh_file_tree(&self) {}
        fn on_turn_end(&self) {
            let reset = self.processor.reset_session(&"s1".into());
            self.reset.store(reset, Ordering::SeqCst);
        }
        fn open_integration_modal(&self, _: &str) {}
    }

    #[test]
    fn host_may_reset_session_from_turn_end() {
        let p = processor();
        let host = ResetOnTurnEnd {
            processor: &p,
            reset: AtomicBool::new(false),
        };
        let text = ChatEvent::new("s1", 1, "claude.assistant", json!({"content": "Hi"}));
        let _ = p.process(&text, &NullHost, &host, ProcessOptions::default());
        let end = ChatEvent::new("s1", 2, "claude.turn_end", json!({}));
        assert_matches!(
            p.process(&end, &NullHost, &host, ProcessOptions::default()),
            ProcessOutcome::Common
        );

        assert!(host.reset.load(Ordering::SeqCst));
        let snap = p.session_snapshot(&"s1".into()).unwrap();
        assert!(snap.assistant.is_none());
        assert!(!snap.busy);
        assert_eq!(snap.last_sequence, Some(2));
    }

    #[test]
    fn config_from_settings() {
        let mut settings = RillSettings::default();
        settings.processor.sandbox_root = "/workspace".into();
        settings.processor.plan_entry_limit = 3;
        let config = ProcessorConfig::from_settings(&settings);
        assert_eq!(config.formatter.sandbox_root(), "/workspace");
        assert_eq!(config.formatter.plan_entry_limit(), 3);
    }
}
