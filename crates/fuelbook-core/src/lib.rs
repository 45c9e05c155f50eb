//! Fuelbook Core Library
//!
//! This crate provides the data layer of Fuelbook, a back-office app for
//! fuel stations: live query subscriptions over a remote document
//! database, with an offline cache for when the network is gone.
//!
//! # Architecture
//!
//! - **DocumentStore**: the remote database, seen only through live
//!   listeners and offline persistence
//! - **SyncCoordinator**: owns every live query of a session and the
//!   guarantee that stopped queries stay silent
//! - **OfflineCache**: SQLite copy of observed collections
//!
//! # Quick Start
//!
//! ```text
//! let store = Arc::new(MemoryStore::new());
//! let coordinator = SyncCoordinator::new(store.clone(), &SyncSettings::default());
//!
//! let id = coordinator.start_sync(
//!     QuerySpec::new("shifts").filter("open", FilterOp::Eq, true),
//!     |records| render(records),
//!     |error| show_banner(error.user_message()),
//! )?;
//!
//! store.pump();
//! coordinator.stop_sync(&id);
//! ```
//!
//! # Modules
//!
//! - `sync`: Sync coordinator and subscription handles (main entry point)
//! - `query`: Query specs and their evaluation
//! - `record`: Documents tagged with their identifier
//! - `store`: Document store abstraction and the in-process backend
//! - `storage`: SQLite offline cache
//! - `summary`: Daily summary aggregation
//! - `config`: Application configuration

pub mod config;
pub mod query;
pub mod record;
pub mod storage;
pub mod store;
pub mod summary;
pub mod sync;

use std::sync::{Mutex, MutexGuard, PoisonError};

pub use config::Config;
pub use query::{Direction, Filter, FilterOp, OrderBy, QueryError, QuerySpec};
pub use record::Record;
pub use storage::{CacheError, CacheStats, OfflineCache};
pub use store::{
    DocumentStore, ListenerRegistration, MemoryStore, PersistenceSettings, Snapshot,
    SnapshotListener, StoreError,
};
pub use summary::{DailySummary, GroupTotal, SummaryOptions};
pub use sync::{Subscription, SubscriptionId, SyncCoordinator, SyncError, SyncSettings, SyncUpdate};

/// Lock a mutex, recovering the data if a callback panicked while holding it
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
