//! Named locks with deadlock-avoiding acquisition policies
//!
//! This module centralizes ownership of named mutual-exclusion locks behind a
//! manager and checks every acquisition against an ordering policy.
//!
//! # Architecture
//!
//! - **Policies**: `NoPolicy`, `TotalOrderPolicy`, `DagPolicy` (built with
//!   `DagPolicyBuilder`), or any `Policy` implementation
//! - **Lock Manager**: `Manager` owns one mutex per declared lock id
//! - **Contexts**: `Context` tracks the locks one unit of work holds
//! - **Proofs**: `Proof` lets low-level code check which locks are held
//!
//! # Example
//!
//! ```
//! use lockctx_core::domain::locking::{DagPolicy, Manager};
//!
//! let policy = DagPolicy::builder().add("catalog", "index").build();
//! let manager = Manager::new(["catalog", "index"], policy);
//!
//! let mut ctx = manager.new_context();
//! ctx.acquire_lock("catalog").unwrap();
//! ctx.acquire_lock("index").unwrap();
//! assert!(ctx.proof().holds_lock("catalog"));
//!
//! // locks are released together
//! ctx.release();
//! ```

pub mod context;
pub mod manager;
pub mod policy;
pub mod proof;

// Re-export main types
pub use context::Context;
pub use manager::Manager;
pub use policy::{DagPolicy, DagPolicyBuilder, FnPolicy, NoPolicy, Policy, TotalOrderPolicy};
pub use proof::{HoldsLocks, Proof};
