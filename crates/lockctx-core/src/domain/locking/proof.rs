//! Read-only lock capabilities
//!
//! Low-level operations that require a lock to be held take a [`Proof`] (or
//! any [`HoldsLocks`]) instead of a [`Context`](super::Context). A proof can
//! check which locks are held but cannot acquire or release anything.

use crate::error::{LockError, LockResult};

/// Capability to check whether specific locks are held
pub trait HoldsLocks {
    /// Whether the lock `id` is currently held
    fn holds_lock(&self, id: &str) -> bool;
}

/// Read-only view of a context
///
/// Not a snapshot: every check reads the context's current holding sequence.
#[derive(Clone, Copy)]
pub struct Proof<'a> {
    source: &'a dyn HoldsLocks,
}

impl<'a> Proof<'a> {
    pub(crate) fn new(source: &'a dyn HoldsLocks) -> Self {
        Self { source }
    }

    /// Whether the originating context currently holds `id`
    pub fn holds_lock(&self, id: &str) -> bool {
        self.source.holds_lock(id)
    }

    /// Fail with [`LockError::NotHeld`] unless `id` is held
    pub fn require(&self, id: &str) -> LockResult<()> {
        if self.holds_lock(id) {
            Ok(())
        } else {
            Err(LockError::NotHeld(id.to_string()))
        }
    }
}

impl HoldsLocks for Proof<'_> {
    fn holds_lock(&self, id: &str) -> bool {
        Proof::holds_lock(self, id)
    }
}

impl std::fmt::Debug for Proof<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Proof")
    }
}
