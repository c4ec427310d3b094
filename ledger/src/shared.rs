//! A ledger shared between threads.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::Ledger;

/// Cloneable handle serializing access to one [`Ledger`].
///
/// Each transaction runs under the lock, so concurrent callers observe the
/// ledger one transaction at a time.
#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Ledger>>,
}

impl SharedLedger {
    pub fn new(ledger: Ledger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Lock the ledger. A panic in another holder does not poison it: the
    /// transaction that panicked never committed.
    pub fn lock(&self) -> MutexGuard<'_, Ledger> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut Ledger) -> T) -> T {
        f(&mut self.lock())
    }
}
