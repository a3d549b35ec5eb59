//! Revocable callback coordination primitive
//!
//! Long-running extension work awaits external signals by id through this
//! registry. A generation token tags every waiter factory handed out; when a
//! new completion request supersedes in-flight work, [`CallbackRegistry::revoke`]
//! advances the generation, cancels every pending waiter, and makes every
//! stale factory fail fast with a cancellation error distinct from any
//! domain error.
//!
//! Cancellation is cooperative: extensions must await the callback to observe
//! it; the primitive cannot interrupt synchronous host calls.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::debug;

use lexicomp_core::{PipelineError, Result};

#[derive(Debug, Default)]
struct Registry {
    generation: u64,
    waiters: HashMap<String, Vec<oneshot::Sender<serde_json::Value>>>,
}

/// Multi-waiter promise registry keyed by opaque string ids
#[derive(Debug, Clone, Default)]
pub struct CallbackRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl CallbackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The current generation token
    pub fn generation(&self) -> u64 {
        self.inner.lock().generation
    }

    /// Create a waiter factory bound to the current generation.
    ///
    /// Every `wait` through the returned factory fails with
    /// [`PipelineError::Cancelled`] once `revoke` has advanced the
    /// generation past the factory's.
    pub fn waiter_factory(&self) -> WaiterFactory {
        WaiterFactory {
            registry: self.clone(),
            generation: self.generation(),
        }
    }

    /// Resolve and remove every waiter currently pending for `id`.
    ///
    /// Waiters registered after this call are unaffected by this specific
    /// emit. Emitting an id with no pending waiters is a no-op.
    pub fn emit(&self, id: &str, payload: serde_json::Value) {
        let pending = {
            let mut inner = self.inner.lock();
            inner.waiters.remove(id).unwrap_or_default()
        };
        for sender in pending {
            // The receiver may already be gone; nothing to do then.
            let _ = sender.send(payload.clone());
        }
    }

    /// Advance the generation and cancel every pending waiter across all ids.
    pub fn revoke(&self) {
        let drained = {
            let mut inner = self.inner.lock();
            inner.generation += 1;
            debug!(generation = inner.generation, "callback registry revoked");
            std::mem::take(&mut inner.waiters)
        };
        // Dropping the senders settles every pending receiver with a
        // cancellation failure.
        drop(drained);
    }
}

/// Single-use awaiter factory bound to one generation
#[derive(Debug, Clone)]
pub struct WaiterFactory {
    registry: CallbackRegistry,
    generation: u64,
}

impl WaiterFactory {
    /// Register a waiter for `id` and await the first payload emitted for it
    /// after registration.
    pub async fn wait(&self, id: &str) -> Result<serde_json::Value> {
        let receiver = self.register(id)?;
        receiver.await.map_err(|_| PipelineError::Cancelled)
    }

    /// Like [`wait`](Self::wait) but bounded by a deadline.
    pub async fn wait_timeout(&self, id: &str, deadline: Duration) -> Result<serde_json::Value> {
        let receiver = self.register(id)?;
        match tokio::time::timeout(deadline, receiver).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(PipelineError::Cancelled),
            Err(_) => Err(PipelineError::Timeout),
        }
    }

    fn register(&self, id: &str) -> Result<oneshot::Receiver<serde_json::Value>> {
        let mut inner = self.registry.inner.lock();
        if inner.generation != self.generation {
            return Err(PipelineError::Cancelled);
        }
        let (sender, receiver) = oneshot::channel();
        inner.waiters.entry(id.to_string()).or_default().push(sender);
        Ok(receiver)
    }
}
