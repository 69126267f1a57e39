//! Domain layer
//!
//! Contains the lock-ordering model: the graph used to validate DAG policies
//! and the locking types built on top of it.

pub mod graph;
pub mod locking;
