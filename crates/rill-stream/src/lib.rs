//! # rill-stream
//!
//! Multi-provider streaming event processor.
//!
//! Turns per-provider, partially ordered event streams into a small set of
//! buffer mutations on a host: assistant text, reasoning text, and tool-call
//! entries.
//!
//! - **Router**: [`EventProcessor`] gates duplicates, suppresses replay side
//!   effects, and dispatches to the common handler then an adapter
//! - **Adapters**: Claude, GLM, Gemini and Codex vocabularies
//! - **State**: per-session buffers and the tool-key alias table
//! - **Format**: text flattening, partial JSON, primary arguments, paths
//! - **Dispatch**: one tokio worker per session

#![deny(unsafe_code)]

pub mod adapters;
pub mod common;
pub mod context;
pub mod dispatch;
pub mod errors;
pub mod format;
pub mod host;
pub mod integration;
pub mod router;
pub mod state;
pub mod store;

#[cfg(test)]
mod testutil;

pub use adapters::{AdapterRegistry, ProviderAdapter};
pub use common::CommonHandler;
pub use context::{EventContext, ProcessOptions};
pub use dispatch::SessionDispatcher;
pub use errors::{FriendlyError, classify_limit_error};
pub use format::Formatter;
pub use host::{
    EnsureToolOptions, FinalizeOptions, HostDependencies, HostEffect, IntegrationHints,
    MessageBufferHandlers,
};
pub use integration::{IntegrationDetector, IntegrationMatch};
pub use router::{EventProcessor, ProcessOutcome, ProcessorConfig};
pub use state::{SessionState, StreamBuffer, TitleSource, ToolBuffer, ToolInput, ToolPreview};
pub use store::SessionStore;
