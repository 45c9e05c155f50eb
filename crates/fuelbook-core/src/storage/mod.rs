//! Storage layer
//!
//! Local persistence for offline reads.
//!
//! ## Architecture
//!
//! - **Remote store**: Source of truth, reached through `DocumentStore`
//! - **SQLite**: Offline cache of the documents live queries have seen
//!
//! The cache is written while connected and read only when the remote
//! store is unreachable.

pub mod cache;
pub mod error;
pub mod schema;

pub use cache::{CacheStats, OfflineCache};
pub use error::{CacheError, CacheResult};
pub use schema::{init_schema, needs_init, SCHEMA_VERSION};
