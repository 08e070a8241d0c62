//! Replay retry policies and HTTP status classification.

use rand::Rng;
use std::time::Duration;

/// Retry policy classification for API failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryClass {
    Retryable,
    Permanent,
    ReauthRequired,
}

/// Classify HTTP status into retry behavior.
pub fn classify_http_status(status: u16) -> RetryClass {
    match status {
        401 | 403 => RetryClass::ReauthRequired,
        408 | 409 | 423 | 425 | 429 => RetryClass::Retryable,
        500..=599 => RetryClass::Retryable,
        _ => RetryClass::Permanent,
    }
}

/// Gate deciding when a staged record may be replayed again.
///
/// The engine consults the policy before each record: a record whose last
/// attempt is more recent than the returned backoff is deferred to a later
/// drain. Injected at engine construction so stricter deployments can add
/// backoff without changing the engine's contract.
pub trait RetryPolicy: Send + Sync {
    /// Minimum wait after `attempts` failed replays. `None` means the
    /// record is eligible again on the very next drain.
    fn backoff_after(&self, attempts: i32) -> Option<Duration>;
}

/// Observed default: every Pending record is replayed on every drain.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoBackoff;

impl RetryPolicy for NoBackoff {
    fn backoff_after(&self, _attempts: i32) -> Option<Duration> {
        None
    }
}

/// Constant wait between attempts at the same record.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    pub delay: Duration,
}

impl RetryPolicy for FixedDelay {
    fn backoff_after(&self, attempts: i32) -> Option<Duration> {
        if attempts <= 0 {
            None
        } else {
            Some(self.delay)
        }
    }
}

/// Exponential backoff with jitter and a cap.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    pub base: Duration,
    pub cap: Duration,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(5),
            cap: Duration::from_secs(1280),
        }
    }
}

impl RetryPolicy for ExponentialBackoff {
    fn backoff_after(&self, attempts: i32) -> Option<Duration> {
        if attempts <= 0 {
            return None;
        }
        let exp = (attempts - 1).clamp(0, 8) as u32;
        let base_ms = self.base.as_millis() as u64;
        let cap_ms = self.cap.as_millis() as u64;
        let backoff = base_ms.saturating_mul(1_u64 << exp).min(cap_ms);
        let jitter = rand::thread_rng().gen_range(0..=(backoff / 5).max(1));
        Some(Duration::from_millis(backoff.saturating_add(jitter)))
    }
}
