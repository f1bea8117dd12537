//! Session state store.
//!
//! One lock per session, no cross-session locking. The map shard lock is
//! held only long enough to clone the session's `Arc`, so a long-running
//! event never blocks lookups for other sessions.

use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rill_core::SessionId;
use tracing::debug;

use crate::state::SessionState;

/// Shared handle to one session's state.
pub type SessionHandle = Arc<Mutex<SessionState>>;

/// Owns every [`SessionState`], keyed by session.
#[derive(Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionHandle>,
}

impl SessionStore {
    /// Empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a session's state, creating it on first use.
    pub fn session(&self, session_id: &SessionId) -> SessionHandle {
        if let Some(existing) = self.sessions.get(session_id) {
            return Arc::clone(existing.value());
        }
        Arc::clone(
            self.sessions
                .entry(session_id.clone())
                .or_insert_with(|| {
                    debug!(session_id = %session_id, "session state created");
                    Arc::new(Mutex::new(SessionState::new(session_id.clone())))
                })
                .value(),
        )
    }

    /// Clone of a session's current state, if it exists.
    pub fn snapshot(&self, session_id: &SessionId) -> Option<SessionState> {
        let handle = self.sessions.get(session_id).map(|s| Arc::clone(s.value()))?;
        let state = handle.lock().clone();
        Some(state)
    }

    /// Discard a session's buffers and aliases. Returns `false` if unknown.
    pub fn reset(&self, session_id: &SessionId) -> bool {
        let Some(handle) = self.sessions.get(session_id).map(|s| Arc::clone(s.value())) else {
            return false;
        };
        handle.lock().reset();
        debug!(session_id = %session_id, "session state reset");
        true
    }

    /// Drop a session entirely, including its watermark.
    pub fn remove(&self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Number of tracked sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is tracked.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// IDs of every tracked session.
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
