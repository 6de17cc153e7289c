use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// How many registered payment ids trigger a sweep for abandoned locks.
const CLEANUP_WATERMARK: usize = 512;

/// A set of asynchronous locks keyed by payment id.
///
/// All four reconciliation transitions on the same payment id must be serialized: platform callbacks and user
/// calls can race, and only one of two racing transitions may win. Holding the guard returned by
/// [`PaymentLocks::acquire`] for the duration of a transition guarantees that.
///
/// The store-level conditional writes remain the hard backstop; the lock exists so that the loser of a race
/// observes the committed state of the winner rather than a CAS miss.
#[derive(Clone, Default)]
pub struct PaymentLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl PaymentLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquires the lock for the given payment id, waiting if another transition currently holds it.
    pub async fn acquire(&self, payment_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().expect("payment lock map poisoned");
            if locks.len() > CLEANUP_WATERMARK {
                locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            }
            Arc::clone(locks.entry(payment_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }
}
