//! API gateway client for the Platewise backend.
//!
//! Single chokepoint for all backend HTTP: request shaping, bearer-token
//! attachment, response/error normalization, and the offline fallback that
//! substitutes locally staged/cached data when a read fails because the
//! network is unreachable. Also hosts the connectivity monitor with its
//! active reachability probes.

pub mod client;
pub mod config;
pub mod connectivity;
pub mod error;
pub mod types;

pub use client::*;
pub use config::*;
pub use connectivity::*;
pub use error::*;
pub use types::*;
