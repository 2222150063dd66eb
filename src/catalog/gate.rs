//! Mutual exclusion for transfer operations
//!
//! The transfer path reuses one logical connection slot; overlapping
//! transfers would corrupt the stream. Every access is a write, so a
//! plain mutex is enough.

use std::sync::Mutex;

/// Serializes all transfer client invocations.
///
/// Calls must not re-enter `with_exclusive_access` from within `op`;
/// that deadlocks and is not detected.
#[derive(Default)]
pub struct TransferGate {
    lock: Mutex<()>,
}

impl TransferGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `op` while holding the gate; released on return and on panic
    pub fn with_exclusive_access<T>(&self, op: impl FnOnce() -> T) -> T {
        // A transfer that panicked must not wedge every later transfer
        let _guard = self
            .lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        op()
    }
}
