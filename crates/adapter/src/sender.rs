//! Sender worker - one outbound payload at a time
//!
//! The session never blocks on the network. It drops payloads into a
//! single-slot mailbox and a dispatcher task puts them on the wire. A payload
//! enqueued while an earlier one is still waiting replaces it: only the most
//! recent state matters. There is no retry; the outcome of every send goes to
//! the completion callback.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::TransportError;
use crate::transport::Transport;

/// Handle to the dispatcher task.
pub struct SenderWorker {
    slot: Arc<Mutex<Option<Vec<u8>>>>,
    wake: Arc<Notify>,
    task: JoinHandle<()>,
}

impl SenderWorker {
    /// Spawn the dispatcher on the current runtime.
    ///
    /// `on_outcome` receives each payload that was attempted and how it went.
    pub fn spawn<F>(transport: Arc<dyn Transport>, on_outcome: F) -> Self
    where
        F: Fn(&[u8], Result<(), TransportError>) + Send + Sync + 'static,
    {
        let slot: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));
        let wake = Arc::new(Notify::new());

        let task = {
            let slot = slot.clone();
            let wake = wake.clone();
            tokio::spawn(async move {
                loop {
                    wake.notified().await;
                    let Some(payload) = slot.lock().take() else {
                        continue;
                    };
                    trace!(bytes = payload.len(), "dispatching payload");
                    let outcome = transport.send(&payload).await;
                    on_outcome(&payload, outcome);
                }
            })
        };

        Self { slot, wake, task }
    }

    /// Queue `payload`, replacing any payload not yet picked up.
    ///
    /// Returns true if an earlier payload was displaced.
    pub fn enqueue(&self, payload: Vec<u8>) -> bool {
        let displaced = self.slot.lock().replace(payload).is_some();
        if displaced {
            debug!("replaced payload still waiting to be sent");
        }
        self.wake.notify_one();
        displaced
    }

    /// Whether a payload is waiting for the dispatcher.
    pub fn is_pending(&self) -> bool {
        self.slot.lock().is_some()
    }

    /// Stop the dispatcher. A payload still in the slot is never sent.
    pub fn shutdown(&self) {
        self.task.abort();
    }
}

impl Drop for SenderWorker {
    fn drop(&mut self) {
        self.task.abort();
    }
}
