//! Connectivity monitor: passive platform signal plus active probes.

use log::{debug, info};
use std::sync::Mutex;
use std::time::Duration;

use platewise_core::{ConnectivityState, ConnectivityTransition};

use crate::config::{
    ApiClientConfig, HEALTH_PROBE_TIMEOUT_SECS, PROBE_FALLBACK_TIMEOUT_SECS,
    PROBE_PRIMARY_TIMEOUT_SECS,
};

type TransitionListener = Box<dyn Fn(ConnectivityTransition) + Send + Sync>;

/// Best-effort reachability tracker.
///
/// The passive signal is authoritative for *offline* but not for *online*
/// (captive portals, partial connectivity), so consumers that need
/// certainty confirm with an active probe. Transition listeners fire on
/// every passive flip with no debouncing; serializing the resulting drain
/// attempts is the sync engine's job.
pub struct ConnectivityMonitor {
    http: reqwest::Client,
    config: ApiClientConfig,
    state: Mutex<ConnectivityState>,
    listeners: Mutex<Vec<TransitionListener>>,
}

impl ConnectivityMonitor {
    /// Starts Online; the embedding shell feeds the real signal through
    /// [`ConnectivityMonitor::set_passive_online`] as soon as it knows it.
    pub fn new(config: ApiClientConfig) -> Self {
        // Probes carry their own time bounds; no client-wide timeout.
        let http = reqwest::Client::builder()
            .build()
            .expect("Failed to build HTTP client");

        Self {
            http,
            config,
            state: Mutex::new(ConnectivityState::Online),
            listeners: Mutex::new(Vec::new()),
        }
    }

    pub fn current_state(&self) -> ConnectivityState {
        *self.state.lock().unwrap()
    }

    /// Reflects the platform's own online/offline signal.
    pub fn is_passively_online(&self) -> bool {
        self.current_state().is_online()
    }

    /// Feed of the platform signal. Fires registered listeners on every
    /// flip; repeated reports of the same state are ignored.
    pub fn set_passive_online(&self, online: bool) {
        let to = ConnectivityState::from_passive(online);
        let transition = {
            let mut state = self.state.lock().unwrap();
            if *state == to {
                None
            } else {
                let from = *state;
                *state = to;
                Some(ConnectivityTransition { from, to })
            }
        };

        if let Some(transition) = transition {
            info!("connectivity: {:?} -> {:?}", transition.from, transition.to);
            let listeners = self.listeners.lock().unwrap();
            for listener in listeners.iter() {
                listener(transition);
            }
        }
    }

    /// Register a transition listener. Listeners run on the thread that
    /// reported the flip and should hand real work to the runtime.
    pub fn on_transition(&self, listener: impl Fn(ConnectivityTransition) + Send + Sync + 'static) {
        self.listeners.lock().unwrap().push(Box::new(listener));
    }

    async fn probe(&self, url: &str, bound: Duration) -> bool {
        match self.http.get(url).timeout(bound).send().await {
            Ok(_) => true,
            Err(e) => {
                debug!("reachability probe {} failed: {}", url, e);
                false
            }
        }
    }

    /// Probe well-known external endpoints. True on any response that
    /// completes; timeout, abort, and network errors all read as
    /// unreachable and are never surfaced to callers.
    pub async fn check_internet_reachable(&self) -> bool {
        if self
            .probe(
                &self.config.probe_primary_url,
                Duration::from_secs(PROBE_PRIMARY_TIMEOUT_SECS),
            )
            .await
        {
            return true;
        }
        self.probe(
            &self.config.probe_fallback_url,
            Duration::from_secs(PROBE_FALLBACK_TIMEOUT_SECS),
        )
        .await
    }

    /// Probe the backend health endpoint. True only on HTTP success.
    pub async fn check_server_reachable(&self) -> bool {
        match self
            .http
            .get(self.config.health_url())
            .timeout(Duration::from_secs(HEALTH_PROBE_TIMEOUT_SECS))
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("health probe failed: {}", e);
                false
            }
        }
    }
}
