//! Per-conversation concurrency control.
//!
//! Ensures only one turn runs per conversation at a time, so concurrent
//! submissions cannot race on the message `order` sequence or the step
//! counter. A second request for the same conversation waits for the
//! in-flight turn to finish.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Manages per-conversation turn locks.
///
/// Each conversation id maps to a `Semaphore(1)`. Acquiring the permit
/// ensures exclusive access for one turn at a time.
pub struct ConversationLockMap {
    locks: Mutex<HashMap<String, Arc<Semaphore>>>,
}

impl Default for ConversationLockMap {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationLockMap {
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire the turn lock for a conversation.
    ///
    /// Returns the permit when the lock is acquired (hold it for the
    /// duration of the turn — it auto-releases on drop).
    pub async fn acquire(&self, conversation_id: &str) -> Result<OwnedSemaphorePermit, LockClosed> {
        let sem = {
            let mut locks = self.locks.lock();
            locks
                .entry(conversation_id.to_owned())
                .or_insert_with(|| Arc::new(Semaphore::new(1)))
                .clone()
        };

        sem.acquire_owned().await.map_err(|_| LockClosed)
    }

    /// Number of tracked conversations (for monitoring).
    pub fn conversation_count(&self) -> usize {
        self.locks.lock().len()
    }

    /// Remove locks for conversations that aren't actively held.
    pub fn prune_idle(&self) {
        let mut locks = self.locks.lock();
        locks.retain(|_, sem| sem.available_permits() == 0);
    }
}

/// Error returned if the semaphore was closed (never happens in practice;
/// the lock map owns its semaphores and never closes them).
#[derive(Debug)]
pub struct LockClosed;

impl std::fmt::Display for LockClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conversation lock closed")
    }
}

impl std::error::Error for LockClosed {}
