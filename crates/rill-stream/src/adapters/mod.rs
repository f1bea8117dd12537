//! Provider adapters.
//!
//! Each adapter translates one backend's event vocabulary into buffer
//! operations on an [`EventContext`]. Adapters are selected once per event
//! through [`AdapterRegistry`], keyed by [`Provider`].

pub mod claude;
pub mod codex;
pub mod gemini;
pub mod glm;

use std::collections::HashMap;
use std::sync::Arc;

use rill_core::{ChatEvent, Provider};
use serde_json::Value;

use crate::context::EventContext;

pub use claude::ClaudeAdapter;
pub use codex::CodexAdapter;
pub use gemini::GeminiAdapter;
pub use glm::GlmAdapter;

/// Translates one provider's events into buffer operations.
///
/// Adapters only touch their own scratch partition of the session state
/// plus the shared buffers and tool registry.
pub trait ProviderAdapter: Send + Sync {
    /// Provider this adapter serves.
    fn provider(&self) -> Provider;

    /// Process one event. Unknown event kinds are ignored.
    fn process(&self, event: &ChatEvent, ctx: &mut EventContext<'_>);
}

/// Provider → adapter lookup table.
pub struct AdapterRegistry {
    adapters: HashMap<Provider, Arc<dyn ProviderAdapter>>,
}

impl AdapterRegistry {
    /// Empty registry.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            adapters: HashMap::new(),
        }
    }

    /// Register (or replace) the adapter for its provider.
    pub fn register(&mut self, adapter: Arc<dyn ProviderAdapter>) {
        let _ = self.adapters.insert(adapter.provider(), adapter);
    }

    /// Adapter for a provider.
    pub fn get(&self, provider: Provider) -> Option<&Arc<dyn ProviderAdapter>> {
        self.adapters.get(&provider)
    }

    /// Number of registered adapters.
    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    /// Whether no adapter is registered.
    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for AdapterRegistry {
    /// Registry with the built-in Claude, GLM, Gemini and Codex adapters.
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(ClaudeAdapter));
        registry.register(Arc::new(GlmAdapter::default()));
        registry.register(Arc::new(GeminiAdapter));
        registry.register(Arc::new(CodexAdapter));
        registry
    }
}

/// Event kind from a `type` field, falling back to the name without its
/// provider prefix.
pub(crate) fn event_kind<'e>(event: &'e ChatEvent, raw: &'e Value) -> &'e str {
    raw.get("type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| event.kind())
}

pub(crate) fn index_field(value: &Value, key: &str) -> Option<u64> {
    value.get(key).and_then(Value::as_u64)
}
