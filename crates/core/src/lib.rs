//! Domain models and contracts for the Platewise offline core.
//!
//! This crate defines the shared vocabulary of the synchronization layer:
//! entity kinds and their typed creation payloads, the staged-record model,
//! the session model, connectivity states, the durable key-value storage
//! contract, and the retry/transport seams the sync engine is built on.

pub mod connectivity;
pub mod entities;
pub mod kv;
pub mod retry;
pub mod session;
pub mod staging;
pub mod transport;

pub use connectivity::*;
pub use entities::*;
pub use kv::*;
pub use retry::*;
pub use session::*;
pub use staging::*;
pub use transport::*;
