//! Document store abstraction
//!
//! The sync coordinator talks to the remote database only through the
//! `DocumentStore` trait: register a live listener for a query, and turn
//! on the local offline cache. Transport, authentication and reconnection
//! belong to the implementation behind the trait.
//!
//! ## Listener contract
//!
//! - Every snapshot is the full current result set, never a diff
//! - Snapshots for one listener arrive in the order the store produced them
//! - `ListenerRegistration::remove` may be called any number of times

pub mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::query::{QueryError, QuerySpec};
use crate::record::Record;
use crate::storage::CacheError;

pub use memory::{MemoryStore, WriteBatch};

/// Errors reported by a document store
#[derive(Error, Debug)]
pub enum StoreError {
    /// The query could not be constructed
    #[error("Invalid query: {0}")]
    InvalidQuery(#[from] QueryError),

    /// The store cannot be reached and no offline copy exists
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Offline persistence was already turned on for this store
    #[error("Offline persistence is already enabled")]
    PersistenceAlreadyEnabled,

    /// The offline cache failed
    #[error("Offline cache error: {0}")]
    Persistence(#[from] CacheError),

    /// A live listener failed after it was registered
    #[error("Listener on '{collection}' failed: {message}")]
    ListenerFault { collection: String, message: String },

    /// A write was rejected before anything was applied
    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    /// Seed data could not be imported
    #[error("Invalid seed data: {0}")]
    InvalidSeed(String),
}

/// Full materialized result set of a query at one point in time
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    /// Matching records, each tagged with its identifier
    pub records: Vec<Record>,
    /// Whether the result was served from the offline cache
    pub from_cache: bool,
}

/// Receiver of live query results
pub trait SnapshotListener: Send + Sync {
    /// Called with the full result set every time it changes
    fn on_snapshot(&self, snapshot: Snapshot);

    /// Called every time the listener faults
    fn on_error(&self, error: StoreError);
}

/// Cancel handle for a registered listener
pub trait ListenerRegistration: Send {
    /// Detach the listener. Calling this more than once is harmless.
    fn remove(&self);
}

/// How the offline cache should be set up
///
/// The cache is unbounded and shared between processes that point at the
/// same file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PersistenceSettings {
    /// Cache file location; `None` keeps the cache in memory
    pub path: Option<PathBuf>,
}

/// A remote document database offering live queries
pub trait DocumentStore: Send + Sync {
    /// Register a live listener for `query`
    ///
    /// Fails synchronously when the query cannot be constructed. The
    /// first snapshot is never delivered from inside this call.
    fn listen(
        &self,
        query: &QuerySpec,
        listener: Arc<dyn SnapshotListener>,
    ) -> Result<Box<dyn ListenerRegistration>, StoreError>;

    /// Turn on the local offline cache
    fn enable_offline_persistence(&self, settings: &PersistenceSettings) -> Result<(), StoreError>;
}
