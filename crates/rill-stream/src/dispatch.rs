//! Per-session worker dispatch.
//!
//! Each session gets one tokio task fed by an unbounded channel, so a
//! session's events are processed strictly in arrival order while sessions
//! run independently. Processing is synchronous inside the worker; host
//! calls are fire-and-forget and never awaited.

use std::sync::Arc;

use dashmap::DashMap;
use rill_core::{ChatEvent, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::context::ProcessOptions;
use crate::host::{HostDependencies, MessageBufferHandlers};
use crate::router::EventProcessor;

type Envelope = (ChatEvent, ProcessOptions);

struct Worker {
    sender: mpsc::UnboundedSender<Envelope>,
    task: JoinHandle<()>,
}

/// Routes events to one worker task per session.
pub struct SessionDispatcher {
    processor: Arc<EventProcessor>,
    handlers: Arc<dyn MessageBufferHandlers>,
    deps: Arc<dyn HostDependencies>,
    workers: DashMap<SessionId, Worker>,
}

impl SessionDispatcher {
    /// Create a dispatcher around a shared processor and host.
    pub fn new(
        processor: Arc<EventProcessor>,
        handlers: Arc<dyn MessageBufferHandlers>,
        deps: Arc<dyn HostDependencies>,
    ) -> Self {
        Self {
            processor,
            handlers,
            deps,
            workers: DashMap::new(),
        }
    }

    /// Queue an event on its session's worker, spawning the worker on first
    /// use. Must be called from within a tokio runtime.
    pub fn dispatch(&self, event: ChatEvent, options: ProcessOptions) {
        let session_id = event.session_id.clone();
        let mut envelope = (event, options);
        // A worker whose receiver is gone is replaced once.
        for _ in 0..2 {
            let sender = self
                .workers
                .entry(session_id.clone())
                .or_insert_with(|| self.spawn_worker(&session_id))
                .sender
                .clone();
            match sender.send(envelope) {
                Ok(()) => return,
                Err(mpsc::error::SendError(returned)) => {
                    warn!(session_id = %session_id, "session worker closed; respawning");
                    let _ = self.workers.remove(&session_id);
                    envelope = returned;
                }
            }
        }
        warn!(session_id = %session_id, sequence = envelope.0.sequence, "event dropped: no worker");
    }

    fn spawn_worker(&self, session_id: &SessionId) -> Worker {
        let (sender, mut rx) = mpsc::unbounded_channel::<Envelope>();
        let processor = Arc::clone(&self.processor);
        let handlers = Arc::clone(&self.handlers);
        let deps = Arc::clone(&self.deps);
        let session = session_id.clone();
        let task = tokio::spawn(async move {
            debug!(session_id = %session, "session worker started");
            while let Some((event, options)) = rx.recv().await {
                let _ = processor.process(&event, handlers.as_ref(), deps.as_ref(), options);
            }
            debug!(session_id = %session, "session worker stopped");
        });
        Worker { sender, task }
    }

    /// Close one session: drain its queued events, stop its worker, and drop
    /// its state from the processor's store. Returns `false` if the session
    /// was unknown to both.
    ///
    /// Events dispatched to the session while it is closing start a new
    /// worker and fresh state.
    pub async fn close_session(&self, session_id: &SessionId) -> bool {
        let worker = self.workers.remove(session_id).map(|(_, worker)| worker);
        let had_worker = worker.is_some();
        if let Some(Worker { sender, task }) = worker {
            drop(sender);
            if let Err(error) = task.await {
                warn!(session_id = %session_id, %error, "session worker panicked");
            }
        }
        let had_state = self.processor.store().remove(session_id);
        debug!(session_id = %session_id, had_worker, had_state, "session closed");
        had_worker || had_state
    }

    /// Number of live session workers.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// The shared processor.
    pub fn processor(&self) -> &Arc<EventProcessor> {
        &self.processor
    }

    /// Close every worker and wait for queued events to drain. Session state
    /// stays in the processor's store.
    pub async fn shutdown(self) {
        let tasks: Vec<JoinHandle<()>> = self
            .workers
            .into_iter()
            .map(|(_, Worker { task, .. })| task)
            .collect();
        for task in tasks {
            if let Err(error) = task.await {
                warn!(%error, "session worker panicked");
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
