//! Error types for lockctx
//!
//! Two classes of failure exist:
//! - [`LockError`]: recoverable results returned through [`LockResult`]. A policy
//!   violation is an ordinary outcome of runtime interleaving and callers decide
//!   whether to retry.
//! - [`ContractViolation`]: programmer errors (unknown lock, use after release,
//!   cyclic DAG policy). These never travel through `Result`; they abort the
//!   current thread via [`violation`] with the typed value as the panic payload.

use std::fmt;
use thiserror::Error;

/// Result type alias for recoverable lock operations
pub type LockResult<T> = std::result::Result<T, LockError>;

/// Recoverable lock errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The acquisition policy rejected the requested lock
    #[error("Policy violation: cannot acquire '{requested}' while holding [{}]", .holding.join(", "))]
    PolicyViolation {
        requested: String,
        holding: Vec<String>,
    },

    /// A lock required by an operation is not held by the caller
    #[error("Lock '{0}' must be held by the caller")]
    NotHeld(String),

    /// The same lock identifier was declared twice
    #[error("Duplicate lock: '{0}' is already registered")]
    DuplicateLock(String),

    /// A DAG policy contains a cycle
    #[error("Invalid DAG policy contains cycle: {}", format_cycle(.0))]
    CyclicPolicy(Vec<String>),
}

impl LockError {
    /// Get error code for this lock error
    pub fn code(&self) -> &'static str {
        match self {
            Self::PolicyViolation { .. } => "E304",
            Self::NotHeld(_) => "E308",
            Self::DuplicateLock(_) => "E309",
            Self::CyclicPolicy(_) => "E310",
        }
    }

    /// Get suggestion for how to fix this error
    pub fn suggestion(&self) -> Option<String> {
        match self {
            Self::PolicyViolation { holding, .. } if !holding.is_empty() => Some(
                "Release held locks and reacquire them in an order the policy allows".to_string(),
            ),
            Self::NotHeld(id) => Some(format!("Acquire lock '{}' before calling this operation", id)),
            Self::CyclicPolicy(cycle) => Some(format!(
                "Remove one of the edges between {}",
                cycle.join(", ")
            )),
            _ => None,
        }
    }

    /// Whether this error is a policy rejection
    pub fn is_policy_violation(&self) -> bool {
        matches!(self, Self::PolicyViolation { .. })
    }
}

/// Programmer errors that abort the calling thread
///
/// Raised only through [`violation`], which panics with this value as the
/// payload. Recover it with `payload.downcast_ref::<ContractViolation>()`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// The lock identifier was never declared with the manager
    #[error("unknown lock '{0}'")]
    UnknownLock(String),

    /// The context was already released
    #[error("context {context} has already been released")]
    ContextReleased { context: String },

    /// The same lock identifier was passed twice to the manager
    #[error("duplicate lock '{0}'")]
    DuplicateLock(String),

    /// A DAG policy was built from cyclic edges
    #[error("invalid DAG policy contains cycle: {}", format_cycle(.0))]
    CyclicPolicy(Vec<String>),
}

impl ContractViolation {
    /// Get error code for this violation
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownLock(_) => "E390",
            Self::ContextReleased { .. } => "E391",
            Self::DuplicateLock(_) => "E392",
            Self::CyclicPolicy(_) => "E393",
        }
    }
}

/// Abort the current thread for a contract violation
///
/// Logs the violation and panics with the [`ContractViolation`] itself as the
/// payload. Unwinding drops any held guards, so other threads are not left
/// blocked on locks owned by the aborted caller.
#[track_caller]
pub fn violation(violation: ContractViolation) -> ! {
    tracing::error!(
        code = violation.code(),
        violation = %violation,
        "Lock contract violated"
    );
    std::panic::panic_any(violation)
}

fn format_cycle(cycle: &[String]) -> CycleDisplay<'_> {
    CycleDisplay(cycle)
}

/// Renders a cycle as `a -> b -> a`
struct CycleDisplay<'a>(&'a [String]);

impl fmt::Display for CycleDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for node in self.0 {
            write!(f, "{} -> ", node)?;
        }
        match self.0.first() {
            Some(first) => write!(f, "{}", first),
            None => write!(f, "(empty)"),
        }
    }
}
