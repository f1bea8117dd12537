//! # rill-core
//!
//! Shared vocabulary for the rill streaming event processor.
//!
//! - **IDs**: `SessionId` wraps the wire value, `MessageId` is generated or derived
//! - **Wire events**: [`ChatEvent`] with its payload and metadata envelope
//! - **Providers**: the closed [`Provider`] tag set used for adapter dispatch
//! - **Messages**: [`ChatMessage`] entries the processor hands to the host
//! - **Errors**: [`EventError`] for wire decoding failures
//! - **Logging**: `tracing` subscriber initialization

#![deny(unsafe_code)]

pub mod errors;
pub mod event;
pub mod ids;
pub mod logging;
pub mod message;
pub mod provider;

pub use errors::EventError;
pub use event::{ChatEvent, EventMetadata, EventPayload};
pub use ids::{MessageId, SessionId};
pub use logging::{LogFormat, init_subscriber};
pub use message::{ChatMessage, MessageAction, MessageRole, MessageVariant, SecretsRequest};
pub use provider::Provider;
