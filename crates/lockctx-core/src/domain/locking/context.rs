//! Per-caller lock contexts
//!
//! A context tracks the locks its owner holds, in acquisition order, and asks
//! the manager's policy before every new acquisition. It moves through three
//! states: fresh, holding, released. Released is terminal.
//!
//! # RAII
//!
//! Dropping a context that has not been released releases every lock it
//! holds, so early returns and panics never leak a lock.

use std::fmt;

use parking_lot::MutexGuard;
use tracing::debug;
use uuid::Uuid;

use super::manager::Manager;
use super::proof::{HoldsLocks, Proof};
use crate::error::{ContractViolation, LockError, LockResult, violation};

/// Handle through which one unit of work acquires and releases locks
///
/// A context is driven by a single owner. It borrows its manager, so it cannot
/// outlive it.
pub struct Context<'m> {
    /// Identifier used in log output
    id: Uuid,

    manager: &'m Manager,

    /// Held lock identifiers, in acquisition order
    holding: Vec<String>,

    /// Guards for the held locks; parallel to `holding`
    guards: Vec<MutexGuard<'m, ()>>,

    released: bool,
}

impl<'m> Context<'m> {
    pub(crate) fn new(manager: &'m Manager) -> Self {
        Self {
            id: Uuid::new_v4(),
            manager,
            holding: Vec::new(),
            guards: Vec::new(),
            released: false,
        }
    }

    /// Acquire the lock `id`, blocking until it is available
    ///
    /// Returns [`LockError::PolicyViolation`] without touching the lock if the
    /// policy rejects the request; the holding sequence is left unchanged.
    /// Locks acquired earlier stay held either way.
    ///
    /// # Panics
    ///
    /// Panics with a [`ContractViolation`] if the context was already released
    /// or `id` was not declared with the manager.
    #[track_caller]
    pub fn acquire_lock(&mut self, id: &str) -> LockResult<()> {
        self.ensure_live();
        let mutex = self.manager.mutex(id);

        if !self.manager.policy().can_acquire(&self.holding, id) {
            debug!(
                context = %self.id,
                lock = id,
                policy = self.manager.policy_name(),
                "Lock acquisition rejected by policy"
            );
            return Err(LockError::PolicyViolation {
                requested: id.to_string(),
                holding: self.holding.clone(),
            });
        }

        let guard = mutex.lock();
        self.guards.push(guard);
        self.holding.push(id.to_string());

        debug!(context = %self.id, lock = id, held = self.holding.len(), "Lock acquired");
        Ok(())
    }

    /// Whether this context currently holds `id`
    ///
    /// Always false once the context has been released.
    pub fn holds_lock(&self, id: &str) -> bool {
        !self.released && self.holding.iter().any(|held| held == id)
    }

    /// Release every held lock, in acquisition order, and retire the context
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::ContextReleased`] if the context was
    /// already released.
    #[track_caller]
    pub fn release(&mut self) {
        self.ensure_live();
        self.release_held();
    }

    /// Read-only view that can only check which locks are held
    pub fn proof(&self) -> Proof<'_> {
        Proof::new(self)
    }

    /// Held lock identifiers, in acquisition order
    pub fn holding(&self) -> &[String] {
        &self.holding
    }

    /// Whether the context has been released
    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Identifier used in log output
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[track_caller]
    fn ensure_live(&self) {
        if self.released {
            violation(ContractViolation::ContextReleased {
                context: self.id.to_string(),
            });
        }
    }

    fn release_held(&mut self) {
        let count = self.guards.len();
        // drain yields front to back, which is acquisition order
        for guard in self.guards.drain(..) {
            drop(guard);
        }
        self.holding.clear();
        self.released = true;

        debug!(context = %self.id, released = count, "Context released");
    }
}

impl HoldsLocks for Context<'_> {
    fn holds_lock(&self, id: &str) -> bool {
        Context::holds_lock(self, id)
    }
}

impl Drop for Context<'_> {
    fn drop(&mut self) {
        if !self.released {
            self.release_held();
        }
    }
}

impl fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.id)
            .field("holding", &self.holding)
            .field("released", &self.released)
            .finish()
    }
}
