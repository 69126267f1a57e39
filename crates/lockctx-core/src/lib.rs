//! Lockctx Core Library
//!
//! Deadlock-avoidance infrastructure for code that holds several named locks
//! at once:
//! - Lock manager owning one mutex per declared lock id
//! - Per-caller contexts that check an ordering policy before every acquisition
//! - Policies: unrestricted, total order, and validated DAG
//! - Read-only proofs for verifying held locks in low-level code
//! - TOML configuration for declaring locks and policies

pub mod config;
pub mod domain;
pub mod error;


pub use error::{ContractViolation, LockError, LockResult};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::{ManagerConfig, PolicyConfig};
    pub use crate::domain::locking::{
        Context, DagPolicy, DagPolicyBuilder, HoldsLocks, Manager, NoPolicy, Policy, Proof,
        TotalOrderPolicy,
    };
    pub use crate::error::{ContractViolation, LockError, LockResult};
}
