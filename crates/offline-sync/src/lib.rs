//! Sync engine and application wiring for the Platewise offline core.
//!
//! The engine replays offline-staged records against the backend once
//! connectivity returns; the context constructs the whole component graph
//! explicitly and connects monitor transitions to engine drains.

pub mod context;
pub mod engine;
pub mod scheduler;

pub use context::*;
pub use engine::*;
pub use scheduler::*;
