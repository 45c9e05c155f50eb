//! Sync coordinator
//!
//! Owns the live query subscriptions of one application session. Callers
//! start a sync with a query spec and two callbacks, and stop it by id (or
//! all at once on sign-out).
//!
//! ## Syncing flag
//!
//! A subscription only counts as syncing once its first snapshot has been
//! delivered. A listener fault clears the flag; the subscription stays
//! registered until the caller stops it, and is never retried here.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::error::SyncError;
use super::subscription::{ActiveSync, Gate, Registry, Subscription, SubscriptionId};
use crate::config::Config;
use crate::query::QuerySpec;
use crate::record::Record;
use crate::store::{DocumentStore, PersistenceSettings, Snapshot, SnapshotListener, StoreError};

type UpdateCallback = Box<dyn Fn(Vec<Record>) + Send + Sync>;
type ErrorCallback = Box<dyn Fn(&SyncError) + Send + Sync>;

/// Coordinator settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    /// Try to enable the local offline cache on construction
    pub offline_cache: bool,
    /// Cache file; `None` keeps the cache in memory
    pub cache_path: Option<PathBuf>,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            offline_cache: true,
            cache_path: None,
        }
    }
}

impl SyncSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            offline_cache: config.offline_cache,
            cache_path: Some(config.cache_path()),
        }
    }
}

/// Message form of a subscription's callbacks, used by `start_stream`
#[derive(Debug, Clone, PartialEq)]
pub enum SyncUpdate {
    /// Full current result set
    Snapshot(Vec<Record>),
    /// Listener fault
    Error {
        /// Fixed notice for the end user
        notice: &'static str,
        /// Descriptive message for logs
        detail: String,
    },
}

/// Adapts caller callbacks to the store's listener interface
struct CoordinatorListener {
    id: SubscriptionId,
    collection: String,
    gate: Arc<Gate>,
    on_update: UpdateCallback,
    on_error: ErrorCallback,
}

impl CoordinatorListener {
    /// Report a construction failure straight to the caller
    fn report(&self, error: &SyncError) {
        (self.on_error)(error);
    }
}

impl SnapshotListener for CoordinatorListener {
    fn on_snapshot(&self, snapshot: Snapshot) {
        let count = snapshot.records.len();
        let from_cache = snapshot.from_cache;
        let delivered = self.gate.deliver(|| {
            self.gate.set_syncing(true);
            (self.on_update)(snapshot.records);
        });

        if delivered {
            debug!(
                "Delivered {} records to sync {} (from_cache={})",
                count, self.id, from_cache
            );
        } else {
            debug!("Dropped snapshot for stopped sync {}", self.id);
        }
    }

    fn on_error(&self, error: StoreError) {
        warn!("Sync {} on '{}' failed: {}", self.id, self.collection, error);
        let error = SyncError::Delivery {
            id: self.id.clone(),
            collection: self.collection.clone(),
            message: error.to_string(),
        };
        self.gate.deliver(|| {
            self.gate.set_syncing(false);
            (self.on_error)(&error);
        });
    }
}

/// Manages the lifecycle of live query subscriptions
///
/// Construct one per application session and pass it to whatever owns UI
/// lifecycles. Dropping the coordinator stops every subscription.
pub struct SyncCoordinator {
    store: Arc<dyn DocumentStore>,
    registry: Arc<Registry>,
    next_seq: AtomicU64,
    offline_cache_enabled: bool,
}

impl SyncCoordinator {
    /// Create a coordinator over `store`
    ///
    /// Turns on the offline cache when requested. A failure to do so is
    /// logged and otherwise ignored: network-only sync still works.
    pub fn new(store: Arc<dyn DocumentStore>, settings: &SyncSettings) -> Self {
        let offline_cache_enabled = if settings.offline_cache {
            let persistence = PersistenceSettings {
                path: settings.cache_path.clone(),
            };
            match store.enable_offline_persistence(&persistence) {
                Ok(()) => true,
                Err(StoreError::PersistenceAlreadyEnabled) => {
                    debug!("Offline cache was already enabled");
                    true
                }
                Err(e) => {
                    warn!("Offline cache unavailable, continuing with network-only sync: {}", e);
                    false
                }
            }
        } else {
            false
        };

        Self {
            store,
            registry: Arc::new(Registry::default()),
            next_seq: AtomicU64::new(0),
            offline_cache_enabled,
        }
    }

    /// Whether the offline cache is on
    pub fn offline_cache_enabled(&self) -> bool {
        self.offline_cache_enabled
    }

    fn next_id(&self, collection: &str) -> SubscriptionId {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        SubscriptionId::generate(collection, Utc::now().timestamp_millis(), seq)
    }

    /// Start a live query
    ///
    /// `on_update` receives the full result set every time it changes, in
    /// the order the store produced them. `on_error` receives every
    /// listener fault. If the query cannot be constructed, `on_error` is
    /// called once and the error is returned.
    pub fn start_sync<U, E>(
        &self,
        query: QuerySpec,
        on_update: U,
        on_error: E,
    ) -> Result<SubscriptionId, SyncError>
    where
        U: Fn(Vec<Record>) + Send + Sync + 'static,
        E: Fn(&SyncError) + Send + Sync + 'static,
    {
        let id = self.next_id(&query.collection);
        let gate = Arc::new(Gate::new());
        let listener = Arc::new(CoordinatorListener {
            id: id.clone(),
            collection: query.collection.clone(),
            gate: Arc::clone(&gate),
            on_update: Box::new(on_update),
            on_error: Box::new(on_error),
        });

        if let Err(source) = query.validate() {
            let error = SyncError::InvalidQuery {
                collection: query.collection.clone(),
                source,
            };
            warn!("Rejected sync for {}: {}", query.collection, error);
            listener.report(&error);
            return Err(error);
        }

        let registration = match self.store.listen(&query, listener.clone()) {
            Ok(registration) => registration,
            Err(e) => {
                gate.shut();
                let error = SyncError::from_store(&query.collection, e);
                warn!("Failed to start sync for {}: {}", query, error);
                listener.report(&error);
                return Err(error);
            }
        };

        info!("Started sync {} ({})", id, query);
        self.registry.insert(
            id.clone(),
            ActiveSync {
                query,
                gate,
                registration,
            },
        );

        Ok(id)
    }

    /// Start a live query whose lifetime is tied to the returned handle
    pub fn subscribe<U, E>(
        &self,
        query: QuerySpec,
        on_update: U,
        on_error: E,
    ) -> Result<Subscription, SyncError>
    where
        U: Fn(Vec<Record>) + Send + Sync + 'static,
        E: Fn(&SyncError) + Send + Sync + 'static,
    {
        let id = self.start_sync(query, on_update, on_error)?;
        Ok(Subscription::new(id, &self.registry))
    }

    /// Start a live query delivering into a channel
    ///
    /// The channel closes once the subscription is stopped.
    pub fn start_stream(
        &self,
        query: QuerySpec,
    ) -> Result<(SubscriptionId, mpsc::UnboundedReceiver<SyncUpdate>), SyncError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let error_tx = tx.clone();

        let id = self.start_sync(
            query,
            move |records| {
                let _ = tx.send(SyncUpdate::Snapshot(records));
            },
            move |error| {
                let _ = error_tx.send(SyncUpdate::Error {
                    notice: error.user_message(),
                    detail: error.to_string(),
                });
            },
        )?;

        Ok((id, rx))
    }

    /// Stop a subscription
    ///
    /// Unknown or already stopped ids are a no-op. Once this returns, the
    /// subscription's `on_update` will not be called again.
    pub fn stop_sync(&self, id: &SubscriptionId) {
        self.registry.stop(id);
    }

    /// Whether the subscription has delivered a snapshot since it started
    /// or last faulted; `false` for unknown ids
    pub fn is_syncing(&self, id: &SubscriptionId) -> bool {
        self.registry.is_syncing(id)
    }

    /// Whether `id` is still registered
    pub fn is_active(&self, id: &SubscriptionId) -> bool {
        self.registry.contains(id)
    }

    /// Stop every subscription (e.g. on sign-out)
    pub fn stop_all_syncs(&self) {
        let stopped = self.registry.stop_all();
        if stopped > 0 {
            info!("Stopped {} syncs", stopped);
        }
    }

    /// Number of registered subscriptions
    pub fn active_count(&self) -> usize {
        self.registry.len()
    }
}

impl Drop for SyncCoordinator {
    fn drop(&mut self) {
        self.stop_all_syncs();
    }
}
