//! Application context: explicit construction and wiring of the offline
//! core.

use std::sync::Arc;
use std::time::Duration;

use log::info;
use rand::Rng;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use platewise_api_client::{ApiClient, ApiClientConfig, ConnectivityMonitor};
use platewise_core::{KvStore, NoBackoff, RetryPolicy};
use platewise_storage_kv::{ResponseCache, SessionStore, StagingStore};

use crate::engine::SyncEngine;
use crate::scheduler::{DRAIN_INTERVAL_JITTER_SECS, PERIODIC_DRAIN_INTERVAL_SECS};

/// Handle to the background periodic drain task.
#[derive(Debug, Default)]
struct SyncRuntimeState {
    background_task: Mutex<Option<JoinHandle<()>>>,
}

/// The component graph, constructed once at application start and passed by
/// reference to every consumer. No ambient singletons: tests and
/// alternative shells build their own context over their own stores.
pub struct AppContext {
    pub kv: Arc<dyn KvStore>,
    pub staging: Arc<StagingStore>,
    pub session: Arc<SessionStore>,
    pub cache: Arc<ResponseCache>,
    pub api: Arc<ApiClient>,
    pub monitor: Arc<ConnectivityMonitor>,
    pub engine: Arc<SyncEngine>,
    runtime: SyncRuntimeState,
}

impl AppContext {
    /// Build the graph with the observed default retry policy (replay
    /// everything pending on every drain).
    pub fn new(config: ApiClientConfig, kv: Arc<dyn KvStore>) -> Self {
        Self::with_retry_policy(config, kv, Arc::new(NoBackoff))
    }

    pub fn with_retry_policy(
        config: ApiClientConfig,
        kv: Arc<dyn KvStore>,
        retry: Arc<dyn RetryPolicy>,
    ) -> Self {
        let staging = Arc::new(StagingStore::new(Arc::clone(&kv)));
        let session = Arc::new(SessionStore::new(Arc::clone(&kv)));
        let cache = Arc::new(ResponseCache::new(Arc::clone(&kv)));
        let api = Arc::new(ApiClient::new(
            config.clone(),
            Arc::clone(&session),
            Arc::clone(&cache),
            Arc::clone(&staging),
        ));
        let monitor = Arc::new(ConnectivityMonitor::new(config));
        let transport: Arc<dyn platewise_core::ReplayTransport> = api.clone();
        let engine = Arc::new(SyncEngine::new(Arc::clone(&staging), transport, retry));

        Self {
            kv,
            staging,
            session,
            cache,
            api,
            monitor,
            engine,
            runtime: SyncRuntimeState::default(),
        }
    }

    /// Register the Offline→Online listener that spawns a drain. Fire and
    /// forget: the reporting thread is never blocked on replay. Must be
    /// called from within a tokio runtime.
    pub fn wire_connectivity(&self) {
        let engine = Arc::clone(&self.engine);
        let handle = tokio::runtime::Handle::current();
        self.monitor.on_transition(move |transition| {
            if transition.is_reconnect() {
                let engine = Arc::clone(&engine);
                handle.spawn(async move {
                    engine.drain().await;
                });
            }
        });
    }

    /// Spawn the periodic drain loop: while passively online, a drain
    /// opportunity fires every interval (plus jitter). At most one loop
    /// runs; calling again replaces the previous task.
    pub async fn start_periodic_drain(&self) {
        let engine = Arc::clone(&self.engine);
        let monitor = Arc::clone(&self.monitor);
        let handle = tokio::spawn(async move {
            loop {
                let jitter = rand::thread_rng().gen_range(0..=DRAIN_INTERVAL_JITTER_SECS);
                tokio::time::sleep(Duration::from_secs(PERIODIC_DRAIN_INTERVAL_SECS + jitter))
                    .await;
                if monitor.is_passively_online() {
                    engine.drain().await;
                }
            }
        });

        if let Some(previous) = self.runtime.background_task.lock().await.replace(handle) {
            previous.abort();
        }
        info!("periodic drain started");
    }

    /// Abort the periodic drain loop, if one is running.
    pub async fn stop_background(&self) {
        if let Some(task) = self.runtime.background_task.lock().await.take() {
            task.abort();
            info!("periodic drain stopped");
        }
    }
}
