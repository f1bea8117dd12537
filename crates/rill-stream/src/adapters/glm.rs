//! GLM adapter: the Claude wire shape under a `glm.` prefix.

use rill_core::{ChatEvent, EventMetadata, Provider};

use super::ProviderAdapter;
use super::claude::ClaudeAdapter;
use crate::context::EventContext;

/// Remaps GLM events onto Claude's and delegates.
#[derive(Clone, Copy, Debug, Default)]
pub struct GlmAdapter {
    claude: ClaudeAdapter,
}

/// Rewrite `glm.*` to `claude.*` and tag the metadata provider as `glm`.
pub fn remap_event(event: &ChatEvent) -> ChatEvent {
    let mut remapped = event.clone();
    if let Some(rest) = event.event.strip_prefix("glm.") {
        remapped.event = format!("claude.{rest}");
    }
    let metadata = remapped
        .payload
        .metadata
        .get_or_insert_with(EventMetadata::default);
    metadata.provider = Some(Provider::Glm.tag().to_string());
    remapped
}

impl ProviderAdapter for GlmAdapter {
    fn provider(&self) -> Provider {
        Provider::Glm
    }

    fn process(&self, event: &ChatEvent, ctx: &mut EventContext<'_>) {
        self.claude.process(&remap_event(event), ctx);
    }
}
