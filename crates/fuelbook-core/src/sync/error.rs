//! Sync error handling

use thiserror::Error;

use super::subscription::SubscriptionId;
use crate::query::QueryError;
use crate::store::StoreError;

/// Errors surfaced by the sync coordinator
///
/// Construction errors are returned from `start_sync` (after being handed
/// to `on_error` once). Delivery errors only reach `on_error`.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The query spec is malformed
    #[error("Invalid query on '{collection}': {source}")]
    InvalidQuery {
        collection: String,
        #[source]
        source: QueryError,
    },

    /// The store refused to register the listener
    #[error("Failed to start sync on '{collection}': {source}")]
    Store {
        collection: String,
        #[source]
        source: StoreError,
    },

    /// A registered listener reported a fault
    #[error("Sync {id} on '{collection}' failed: {message}")]
    Delivery {
        id: SubscriptionId,
        collection: String,
        message: String,
    },
}

impl SyncError {
    pub(crate) fn from_store(collection: &str, error: StoreError) -> Self {
        match error {
            StoreError::InvalidQuery(source) => SyncError::InvalidQuery {
                collection: collection.to_string(),
                source,
            },
            source => SyncError::Store {
                collection: collection.to_string(),
                source,
            },
        }
    }

    /// Collection the failing query targeted
    pub fn collection(&self) -> &str {
        match self {
            SyncError::InvalidQuery { collection, .. }
            | SyncError::Store { collection, .. }
            | SyncError::Delivery { collection, .. } => collection,
        }
    }

    /// Fixed notice suitable for showing to an end user
    pub fn user_message(&self) -> &'static str {
        match self {
            SyncError::InvalidQuery { .. } => "Unable to load data. Please try again.",
            SyncError::Store { .. } => "Unable to connect. Please check your connection and try again.",
            SyncError::Delivery { .. } => "Live updates were interrupted. Please refresh to try again.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_store_maps_invalid_query() {
        let err = SyncError::from_store("expenses", StoreError::InvalidQuery(QueryError::ZeroLimit));
        assert!(matches!(err, SyncError::InvalidQuery { .. }));
        assert_eq!(err.collection(), "expenses");

        let err = SyncError::from_store("expenses", StoreError::Unavailable("offline".into()));
        assert!(matches!(err, SyncError::Store { .. }));
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn test_delivery_display_is_descriptive() {
        let err = SyncError::Delivery {
            id: SubscriptionId::from("expenses-1-0"),
            collection: "expenses".to_string(),
            message: "permission denied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("expenses-1-0"));
        assert!(msg.contains("permission denied"));
        assert!(!err.user_message().is_empty());
    }
}
