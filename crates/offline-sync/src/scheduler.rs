//! Scheduler constants for the periodic drain opportunity.

/// Cadence of the periodic drain while passively online, in seconds.
pub const PERIODIC_DRAIN_INTERVAL_SECS: u64 = 60;

/// Maximum jitter (seconds) added to each periodic interval.
pub const DRAIN_INTERVAL_JITTER_SECS: u64 = 5;
