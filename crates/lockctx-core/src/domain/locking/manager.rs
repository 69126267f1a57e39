//! Lock manager owning the named locks
//!
//! The manager is built once with every lock identifier the application uses
//! and one acquisition policy. It never changes afterwards and can be shared
//! freely across threads; all acquisition goes through a [`Context`] created
//! from it.

use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;
use tracing::info;

use super::context::Context;
use super::policy::Policy;
use crate::error::{ContractViolation, LockError, LockResult, violation};

/// Registry of named locks paired with an acquisition policy
pub struct Manager {
    /// Declared identifiers, in declaration order
    lock_ids: Vec<String>,

    /// One mutex per identifier
    locks: HashMap<String, Mutex<()>>,

    /// Policy consulted before every acquisition
    policy: Box<dyn Policy>,
}

impl Manager {
    /// Create a manager for `lock_ids` governed by `policy`
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::DuplicateLock`] if an identifier is
    /// declared twice.
    #[track_caller]
    pub fn new<I, S>(lock_ids: I, policy: impl Policy + 'static) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        match Self::try_new(lock_ids, policy) {
            Ok(manager) => manager,
            Err(LockError::DuplicateLock(id)) => violation(ContractViolation::DuplicateLock(id)),
            Err(other) => unreachable!("manager construction only reports duplicates: {other}"),
        }
    }

    /// Create a manager, reporting a duplicate identifier as an error
    pub fn try_new<I, S>(lock_ids: I, policy: impl Policy + 'static) -> LockResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut ids = Vec::new();
        let mut locks = HashMap::new();

        for id in lock_ids {
            let id = id.into();
            if locks.insert(id.clone(), Mutex::new(())).is_some() {
                return Err(LockError::DuplicateLock(id));
            }
            ids.push(id);
        }

        info!(
            locks = ids.len(),
            policy = policy.name(),
            "Lock manager created"
        );

        Ok(Self {
            lock_ids: ids,
            locks,
            policy: Box::new(policy),
        })
    }

    /// Create a fresh context holding no locks
    pub fn new_context(&self) -> Context<'_> {
        Context::new(self)
    }

    /// Run `f` with a fresh context, releasing it on every exit path
    ///
    /// Held locks are released when `f` returns, including early returns
    /// through `?` and unwinding. A context that `f` already released is not
    /// released again.
    pub fn scoped<R>(&self, f: impl FnOnce(&mut Context<'_>) -> R) -> R {
        let mut ctx = self.new_context();
        f(&mut ctx)
    }

    /// Declared lock identifiers, in declaration order
    pub fn lock_ids(&self) -> &[String] {
        &self.lock_ids
    }

    /// Whether `id` was declared with this manager
    pub fn contains(&self, id: &str) -> bool {
        self.locks.contains_key(id)
    }

    /// Name of the active policy
    pub fn policy_name(&self) -> &str {
        self.policy.name()
    }

    pub(crate) fn policy(&self) -> &dyn Policy {
        self.policy.as_ref()
    }

    /// The mutex for `id`, aborting on an undeclared identifier
    #[track_caller]
    pub(crate) fn mutex(&self, id: &str) -> &Mutex<()> {
        match self.locks.get(id) {
            Some(mutex) => mutex,
            None => violation(ContractViolation::UnknownLock(id.to_string())),
        }
    }
}

impl fmt::Debug for Manager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Manager")
            .field("lock_ids", &self.lock_ids)
            .field("policy", &self.policy.name())
            .finish()
    }
}
