//! Connectivity state model.

use serde::{Deserialize, Serialize};

/// Best-effort answer to "can we reach the backend right now?". Driven by
/// the platform's passive signal and confirmed/refuted by active probes.
/// Never persisted; lifetime is the running process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    Online,
    Offline,
}

impl ConnectivityState {
    pub fn from_passive(online: bool) -> Self {
        if online {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        }
    }

    pub fn is_online(&self) -> bool {
        *self == ConnectivityState::Online
    }
}

/// One passive-signal edge observed by the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivityTransition {
    pub from: ConnectivityState,
    pub to: ConnectivityState,
}

impl ConnectivityTransition {
    /// The edge that triggers a sync drain.
    pub fn is_reconnect(&self) -> bool {
        self.from == ConnectivityState::Offline && self.to == ConnectivityState::Online
    }
}
