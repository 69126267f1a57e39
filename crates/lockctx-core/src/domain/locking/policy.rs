//! Lock acquisition policies
//!
//! A policy decides whether a caller holding a sequence of locks (in
//! acquisition order) may request one more. Policies are pure: they never
//! block, never take a lock themselves, and are safe to call from any thread.

use std::fmt;

use crate::domain::graph::Graph;
use crate::error::{ContractViolation, LockError, LockResult, violation};

/// Decision rule for the next lock acquisition
pub trait Policy: Send + Sync {
    /// Whether a caller holding `holding` may acquire `next`
    ///
    /// `holding` is ordered by acquisition; its last element is the most
    /// recently acquired lock.
    fn can_acquire(&self, holding: &[String], next: &str) -> bool;

    /// Short name used in logs
    fn name(&self) -> &str {
        "custom"
    }
}

impl<P: Policy + ?Sized> Policy for Box<P> {
    fn can_acquire(&self, holding: &[String], next: &str) -> bool {
        (**self).can_acquire(holding, next)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Places no constraint on acquisition order
///
/// Offers no deadlock protection: a caller can block forever by acquiring a
/// lock it already holds, or two callers can wait on each other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NoPolicy;

impl Policy for NoPolicy {
    fn can_acquire(&self, _holding: &[String], _next: &str) -> bool {
        true
    }

    fn name(&self) -> &str {
        "none"
    }
}

/// Requires locks to be acquired in strictly ascending lexicographic order
///
/// Every caller follows the same global order, so no circular wait can form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TotalOrderPolicy;

impl Policy for TotalOrderPolicy {
    fn can_acquire(&self, holding: &[String], next: &str) -> bool {
        match holding.last() {
            None => true,
            Some(last) => last.as_str() < next,
        }
    }

    fn name(&self) -> &str {
        "total_order"
    }
}

/// Stateless policy defined by a closure
pub struct FnPolicy<F> {
    name: &'static str,
    rule: F,
}

impl<F> FnPolicy<F>
where
    F: Fn(&[String], &str) -> bool + Send + Sync,
{
    /// Wrap `rule` as a policy reported under `name`
    pub fn new(name: &'static str, rule: F) -> Self {
        Self { name, rule }
    }
}

impl<F> Policy for FnPolicy<F>
where
    F: Fn(&[String], &str) -> bool + Send + Sync,
{
    fn can_acquire(&self, holding: &[String], next: &str) -> bool {
        (self.rule)(holding, next)
    }

    fn name(&self) -> &str {
        self.name
    }
}

impl<F> fmt::Debug for FnPolicy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnPolicy").field("name", &self.name).finish()
    }
}

/// Builder for a [`DagPolicy`]
///
/// Each edge `lock1 -> lock2` allows a caller whose most recent acquisition
/// was `lock1` to acquire `lock2` next. Policies are meant to be defined once
/// at startup from static parameters, so [`DagPolicyBuilder::build`] treats a
/// cycle as a programmer error.
#[derive(Debug, Clone, Default)]
pub struct DagPolicyBuilder {
    dag: Graph,
}

impl DagPolicyBuilder {
    /// Start with an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow `lock2` to be acquired directly after `lock1`
    pub fn add(mut self, lock1: impl Into<String>, lock2: impl Into<String>) -> Self {
        self.dag.add_edge(lock1, lock2);
        self
    }

    /// Validate the graph and build the policy
    ///
    /// # Panics
    ///
    /// Panics with [`ContractViolation::CyclicPolicy`] if the edges form a cycle.
    #[track_caller]
    pub fn build(self) -> DagPolicy {
        match self.try_build() {
            Ok(policy) => policy,
            Err(LockError::CyclicPolicy(cycle)) => {
                violation(ContractViolation::CyclicPolicy(cycle))
            }
            Err(other) => unreachable!("DAG validation only reports cycles: {other}"),
        }
    }

    /// Validate the graph and build the policy, reporting a cycle as an error
    pub fn try_build(self) -> LockResult<DagPolicy> {
        if let Some(cycle) = self.dag.has_cycle() {
            return Err(LockError::CyclicPolicy(cycle));
        }
        Ok(DagPolicy { dag: self.dag })
    }
}

/// Policy backed by a validated acyclic graph
///
/// Only the most recently acquired lock constrains the next acquisition. The
/// rest of the holding sequence is ignored, so a DAG policy cannot express a
/// rule such as "c requires both a and b to be held".
#[derive(Debug, Clone)]
pub struct DagPolicy {
    dag: Graph,
}

impl DagPolicy {
    /// Start building a DAG policy
    pub fn builder() -> DagPolicyBuilder {
        DagPolicyBuilder::new()
    }

    /// The validated graph
    pub fn graph(&self) -> &Graph {
        &self.dag
    }
}

impl Policy for DagPolicy {
    fn can_acquire(&self, holding: &[String], next: &str) -> bool {
        match holding.last() {
            None => true,
            Some(last) => self.dag.contains_edge(last, next),
        }
    }

    fn name(&self) -> &str {
        "dag"
    }
}
