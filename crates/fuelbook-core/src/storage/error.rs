//! Offline cache error handling
//!
//! Provides typed errors for cache operations with descriptive messages
//! and recovery suggestions.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while opening or using the offline cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// Failed to create the directory holding the cache file
    #[error("Failed to create cache directory '{path}': {source}")]
    CreateDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Failed to open the SQLite cache file
    #[error("Failed to open offline cache at '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Cache file is held by another process for longer than the busy timeout
    #[error("Offline cache at '{path}' is locked by another process")]
    Locked { path: PathBuf },

    /// A cached document could not be decoded
    #[error("Corrupt cached document '{collection}/{id}': {source}")]
    CorruptDocument {
        collection: String,
        id: String,
        #[source]
        source: serde_json::Error,
    },

    /// Failed to encode a document for storage
    #[error("Failed to encode document: {0}")]
    Encode(#[from] serde_json::Error),

    /// SQLite database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl CacheError {
    /// Classify an error from opening the cache file
    pub fn from_open(error: rusqlite::Error, path: PathBuf) -> Self {
        if is_busy_error(&error) {
            CacheError::Locked { path }
        } else {
            CacheError::Open {
                path,
                source: error,
            }
        }
    }

    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CacheError::Locked { .. } | CacheError::CorruptDocument { .. }
        )
    }

    /// Get a recovery suggestion for this error
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            CacheError::Locked { .. } => {
                Some("Close other Fuelbook sessions using the same data directory and try again.")
            }
            CacheError::CorruptDocument { .. } => {
                Some("The offline cache is only a copy of remote data. Delete the cache file to rebuild it.")
            }
            CacheError::CreateDirectory { .. } => {
                Some("Check that the parent directory exists and you have write permissions.")
            }
            _ => None,
        }
    }
}

/// Check if a SQLite error means the database is busy or locked
fn is_busy_error(error: &rusqlite::Error) -> bool {
    matches!(
        error.sqlite_error_code(),
        Some(rusqlite::ErrorCode::DatabaseBusy) | Some(rusqlite::ErrorCode::DatabaseLocked)
    )
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_busy_error_classified_as_locked() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        let err = CacheError::from_open(sqlite_err, PathBuf::from("/data/cache.db"));

        assert!(matches!(err, CacheError::Locked { .. }));
        assert!(err.is_recoverable());
        assert!(err.recovery_suggestion().is_some());
    }

    #[test]
    fn test_other_open_error_keeps_source() {
        let sqlite_err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_CANTOPEN),
            None,
        );
        let err = CacheError::from_open(sqlite_err, PathBuf::from("/nope/cache.db"));

        assert!(matches!(err, CacheError::Open { .. }));
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("/nope/cache.db"));
    }

    #[test]
    fn test_corrupt_document_display() {
        let source = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err = CacheError::CorruptDocument {
            collection: "expenses".to_string(),
            id: "e1".to_string(),
            source,
        };

        let msg = err.to_string();
        assert!(msg.contains("expenses/e1"));
        assert!(err.is_recoverable());
    }
}
