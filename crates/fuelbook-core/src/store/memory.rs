//! In-process document store
//!
//! `MemoryStore` stands in for the managed database in tests and in the
//! CLI. It keeps collections of JSON documents in ordered maps and drives
//! listeners from a cooperative event loop:
//!
//! 1. Writes (and new registrations) queue a refresh for every listener
//!    on the affected collection
//! 2. `pump()` materializes each queued refresh and hands the full result
//!    set to the listener, skipping results identical to the last one sent
//!
//! Listeners are never called while the store's state lock is held, so a
//! listener may write to the store or remove itself. Calling `pump()`
//! from inside a listener is not supported.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{
    DocumentStore, ListenerRegistration, PersistenceSettings, Snapshot, SnapshotListener,
    StoreError,
};
use crate::lock;
use crate::query::QuerySpec;
use crate::record::{Record, ID_FIELD};
use crate::storage::OfflineCache;

/// Documents of one collection, keyed by id
type Collection = BTreeMap<String, Map<String, Value>>;

/// Work queued for a listener until the next pump
enum Pending {
    Refresh,
    Fault(String),
}

struct ListenerSlot {
    query: QuerySpec,
    listener: Arc<dyn SnapshotListener>,
    pending: VecDeque<Pending>,
    last_delivered: Option<Vec<Record>>,
}

impl ListenerSlot {
    fn schedule_refresh(&mut self) {
        if !matches!(self.pending.back(), Some(Pending::Refresh)) {
            self.pending.push_back(Pending::Refresh);
        }
    }
}

enum Delivery {
    Snapshot(Arc<dyn SnapshotListener>, Snapshot),
    Error(Arc<dyn SnapshotListener>, StoreError),
}

#[derive(Default)]
struct Inner {
    collections: BTreeMap<String, Collection>,
    listeners: BTreeMap<u64, ListenerSlot>,
    next_listener_id: u64,
    offline: bool,
    cache: Option<OfflineCache>,
}

impl Inner {
    fn touch(&mut self, collection: &str) {
        for slot in self.listeners.values_mut() {
            if slot.query.collection == collection {
                slot.schedule_refresh();
            }
        }
    }

    fn touch_all(&mut self) {
        for slot in self.listeners.values_mut() {
            slot.schedule_refresh();
        }
    }

    /// Copy every collection about to be refreshed into the offline cache
    fn mirror_to_cache(&mut self) {
        if self.offline {
            return;
        }
        let Some(cache) = self.cache.as_mut() else {
            return;
        };

        let refreshed: BTreeSet<&str> = self
            .listeners
            .values()
            .filter(|slot| slot.pending.iter().any(|p| matches!(p, Pending::Refresh)))
            .map(|slot| slot.query.collection.as_str())
            .collect();

        for collection in refreshed {
            let records = collection_records(&self.collections, collection);
            if let Err(e) = cache.replace_collection(collection, &records) {
                warn!("Failed to mirror '{}' into offline cache: {}", collection, e);
            }
        }
    }

    fn collect_deliveries(&mut self) -> Vec<Delivery> {
        self.mirror_to_cache();

        let Inner {
            collections,
            listeners,
            offline,
            cache,
            ..
        } = self;

        let mut deliveries = Vec::new();
        for slot in listeners.values_mut() {
            while let Some(pending) = slot.pending.pop_front() {
                match pending {
                    Pending::Fault(message) => {
                        // Next refresh re-sends the full result set
                        slot.last_delivered = None;
                        deliveries.push(Delivery::Error(
                            Arc::clone(&slot.listener),
                            StoreError::ListenerFault {
                                collection: slot.query.collection.clone(),
                                message,
                            },
                        ));
                    }
                    Pending::Refresh => {
                        let result = if !*offline {
                            let records = collection_records(collections, &slot.query.collection);
                            Ok(Snapshot {
                                records: slot.query.evaluate(records),
                                from_cache: false,
                            })
                        } else if let Some(cache) = cache.as_ref() {
                            cache
                                .query(&slot.query)
                                .map(|records| Snapshot {
                                    records,
                                    from_cache: true,
                                })
                                .map_err(StoreError::from)
                        } else {
                            Err(StoreError::Unavailable(format!(
                                "cannot reach the store for '{}' and offline persistence is disabled",
                                slot.query.collection
                            )))
                        };

                        match result {
                            Ok(snapshot) => {
                                if slot.last_delivered.as_ref() == Some(&snapshot.records) {
                                    continue;
                                }
                                slot.last_delivered = Some(snapshot.records.clone());
                                deliveries
                                    .push(Delivery::Snapshot(Arc::clone(&slot.listener), snapshot));
                            }
                            Err(e) => {
                                deliveries.push(Delivery::Error(Arc::clone(&slot.listener), e));
                            }
                        }
                    }
                }
            }
        }

        deliveries
    }
}

fn collection_records(collections: &BTreeMap<String, Collection>, name: &str) -> Vec<Record> {
    collections
        .get(name)
        .map(|docs| {
            docs.iter()
                .map(|(id, fields)| Record::new(id.clone(), fields.clone()))
                .collect()
        })
        .unwrap_or_default()
}

fn check_collection(collection: &str) -> Result<(), StoreError> {
    if collection.trim().is_empty() || collection.contains('/') {
        return Err(StoreError::InvalidDocument(format!(
            "invalid collection name '{}'",
            collection
        )));
    }
    Ok(())
}

type SeedDocs = Vec<(String, Vec<(String, Value)>)>;

/// Split seed data into documents per collection
///
/// A document without an `id` is keyed by its position in the array, so
/// reloading an unchanged seed keeps the same ids.
fn parse_seed(seed: &Value) -> Result<SeedDocs, StoreError> {
    let Value::Object(collections) = seed else {
        return Err(StoreError::InvalidSeed(
            "expected an object mapping collection names to arrays".to_string(),
        ));
    };

    let mut parsed = Vec::with_capacity(collections.len());
    for (collection, docs) in collections {
        let Value::Array(docs) = docs else {
            return Err(StoreError::InvalidSeed(format!(
                "collection '{}' must be an array of documents",
                collection
            )));
        };

        let mut entries = Vec::with_capacity(docs.len());
        for (index, doc) in docs.iter().enumerate() {
            let id = match doc.get(ID_FIELD) {
                Some(Value::String(id)) => id.clone(),
                Some(Value::Number(n)) => n.to_string(),
                Some(other) => {
                    return Err(StoreError::InvalidSeed(format!(
                        "document id in '{}' must be a string or number, got {}",
                        collection, other
                    )))
                }
                None => index.to_string(),
            };
            entries.push((id, doc.clone()));
        }
        parsed.push((collection.clone(), entries));
    }

    Ok(parsed)
}

/// Simulated managed database held in process memory
#[derive(Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
    /// Serializes pumps so deliveries keep their production order
    dispatch: Mutex<()>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start an atomic group of writes
    pub fn batch(&self) -> WriteBatch<'_> {
        WriteBatch {
            store: self,
            ops: Vec::new(),
        }
    }

    /// Create or overwrite a document
    pub fn set(&self, collection: &str, id: &str, fields: Value) -> Result<(), StoreError> {
        let mut batch = self.batch();
        batch.set(collection, id, fields);
        batch.commit().map(|_| ())
    }

    /// Create a document with a generated id
    pub fn add(&self, collection: &str, fields: Value) -> Result<String, StoreError> {
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, fields)?;
        Ok(id)
    }

    /// Delete a document (deleting a missing document is not an error)
    pub fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let mut batch = self.batch();
        batch.delete(collection, id);
        batch.commit().map(|_| ())
    }

    /// Current contents of a collection, ordered by id
    pub fn records(&self, collection: &str) -> Vec<Record> {
        collection_records(&lock(&self.inner).collections, collection)
    }

    /// Load seed data shaped as `{ "<collection>": [ {..}, .. ] }`
    ///
    /// Documents without an `id` are keyed by their array position. Returns
    /// the number of documents written.
    pub fn import_json(&self, seed: &Value) -> Result<usize, StoreError> {
        let mut batch = self.batch();
        for (collection, docs) in parse_seed(seed)? {
            for (id, doc) in docs {
                batch.set(&collection, &id, doc);
            }
        }
        batch.commit()
    }

    /// Make every collection named in `seed` match it exactly
    ///
    /// Documents missing from the seed are deleted in the same change.
    /// Returns the number of writes applied.
    pub fn replace_json(&self, seed: &Value) -> Result<usize, StoreError> {
        let seed = parse_seed(seed)?;
        let mut batch = self.batch();
        for (collection, docs) in seed {
            let keep: BTreeSet<&str> = docs.iter().map(|(id, _)| id.as_str()).collect();
            for existing in self.records(&collection) {
                if !keep.contains(existing.id.as_str()) {
                    batch.delete(&collection, &existing.id);
                }
            }
            for (id, doc) in &docs {
                batch.set(&collection, id, doc.clone());
            }
        }
        batch.commit()
    }

    /// Queue a listener fault for every listener on `collection`
    pub fn inject_fault(&self, collection: &str, message: &str) {
        let mut inner = lock(&self.inner);
        for slot in inner.listeners.values_mut() {
            if slot.query.collection == collection {
                slot.pending.push_back(Pending::Fault(message.to_string()));
            }
        }
    }

    /// Simulate connectivity changes
    ///
    /// Every listener is re-evaluated on the next pump.
    pub fn set_online(&self, online: bool) {
        let mut inner = lock(&self.inner);
        if inner.offline == !online {
            return;
        }
        info!("Store is now {}", if online { "online" } else { "offline" });
        inner.offline = !online;
        inner.touch_all();
    }

    /// Number of registered listeners
    pub fn listener_count(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    /// Whether offline persistence has been turned on
    pub fn persistence_enabled(&self) -> bool {
        lock(&self.inner).cache.is_some()
    }

    /// Deliver everything queued since the last pump
    ///
    /// Returns the number of callbacks invoked.
    pub fn pump(&self) -> usize {
        let _dispatch = lock(&self.dispatch);
        let deliveries = lock(&self.inner).collect_deliveries();
        let count = deliveries.len();

        for delivery in deliveries {
            match delivery {
                Delivery::Snapshot(listener, snapshot) => listener.on_snapshot(snapshot),
                Delivery::Error(listener, error) => listener.on_error(error),
            }
        }

        if count > 0 {
            debug!("Pumped {} deliveries", count);
        }
        count
    }
}

impl DocumentStore for MemoryStore {
    fn listen(
        &self,
        query: &QuerySpec,
        listener: Arc<dyn SnapshotListener>,
    ) -> Result<Box<dyn ListenerRegistration>, StoreError> {
        query.validate()?;

        let mut inner = lock(&self.inner);
        let id = inner.next_listener_id;
        inner.next_listener_id += 1;

        let mut slot = ListenerSlot {
            query: query.clone(),
            listener,
            pending: VecDeque::new(),
            last_delivered: None,
        };
        slot.schedule_refresh();
        inner.listeners.insert(id, slot);
        debug!("Registered listener {} for {}", id, query);

        Ok(Box::new(MemoryRegistration {
            inner: Arc::downgrade(&self.inner),
            id,
            removed: AtomicBool::new(false),
        }))
    }

    fn enable_offline_persistence(&self, settings: &PersistenceSettings) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        if inner.cache.is_some() {
            return Err(StoreError::PersistenceAlreadyEnabled);
        }

        let cache = match &settings.path {
            Some(path) => OfflineCache::open(path)?,
            None => OfflineCache::open_in_memory()?,
        };
        info!(
            "Offline persistence enabled ({})",
            settings
                .path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "in memory".to_string())
        );
        inner.cache = Some(cache);
        Ok(())
    }
}

struct MemoryRegistration {
    inner: Weak<Mutex<Inner>>,
    id: u64,
    removed: AtomicBool,
}

impl ListenerRegistration for MemoryRegistration {
    fn remove(&self) {
        if self.removed.swap(true, Ordering::SeqCst) {
            return;
        }
        if let Some(inner) = self.inner.upgrade() {
            lock(&inner).listeners.remove(&self.id);
            debug!("Removed listener {}", self.id);
        }
    }
}

enum WriteOp {
    Set {
        collection: String,
        id: String,
        fields: Value,
    },
    Delete {
        collection: String,
        id: String,
    },
}

/// Group of writes applied together as one backend change
pub struct WriteBatch<'a> {
    store: &'a MemoryStore,
    ops: Vec<WriteOp>,
}

impl WriteBatch<'_> {
    pub fn set(&mut self, collection: &str, id: &str, fields: Value) -> &mut Self {
        self.ops.push(WriteOp::Set {
            collection: collection.to_string(),
            id: id.to_string(),
            fields,
        });
        self
    }

    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.ops.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    /// Apply every write, or none if any is invalid
    ///
    /// Returns the number of writes applied.
    pub fn commit(self) -> Result<usize, StoreError> {
        for op in &self.ops {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    fields,
                } => {
                    check_collection(collection)?;
                    if id.is_empty() {
                        return Err(StoreError::InvalidDocument(format!(
                            "empty document id in '{}'",
                            collection
                        )));
                    }
                    if !fields.is_object() {
                        return Err(StoreError::InvalidDocument(format!(
                            "{}/{} must be a JSON object",
                            collection, id
                        )));
                    }
                }
                WriteOp::Delete { collection, .. } => check_collection(collection)?,
            }
        }

        let mut inner = lock(&self.store.inner);
        if inner.offline {
            return Err(StoreError::Unavailable(
                "writes require a connection to the store".to_string(),
            ));
        }

        let count = self.ops.len();
        let mut touched = BTreeSet::new();
        for op in self.ops {
            match op {
                WriteOp::Set {
                    collection,
                    id,
                    fields,
                } => {
                    if let Value::Object(mut fields) = fields {
                        fields.remove(ID_FIELD);
                        inner
                            .collections
                            .entry(collection.clone())
                            .or_default()
                            .insert(id, fields);
                        touched.insert(collection);
                    }
                }
                WriteOp::Delete { collection, id } => {
                    if let Some(docs) = inner.collections.get_mut(&collection) {
                        docs.remove(&id);
                    }
                    touched.insert(collection);
                }
            }
        }

        for collection in &touched {
            inner.touch(collection);
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Direction, FilterOp};
    use serde_json::json;

    /// Listener that records everything it receives
    #[derive(Default)]
    struct Recorder {
        snapshots: Mutex<Vec<Snapshot>>,
        errors: Mutex<Vec<String>>,
    }

    impl SnapshotListener for Recorder {
        fn on_snapshot(&self, snapshot: Snapshot) {
            self.snapshots.lock().unwrap().push(snapshot);
        }

        fn on_error(&self, error: StoreError) {
            self.errors.lock().unwrap().push(error.to_string());
        }
    }

    impl Recorder {
        fn snapshot_count(&self) -> usize {
            self.snapshots.lock().unwrap().len()
        }

        fn last_ids(&self) -> Vec<String> {
            self.snapshots
                .lock()
                .unwrap()
                .last()
                .map(|s| s.records.iter().map(|r| r.id.clone()).collect())
                .unwrap_or_default()
        }
    }

    fn listen(store: &MemoryStore, spec: QuerySpec) -> (Arc<Recorder>, Box<dyn ListenerRegistration>) {
        let recorder = Arc::new(Recorder::default());
        let registration = store.listen(&spec, recorder.clone()).unwrap();
        (recorder, registration)
    }

    #[test]
    fn test_initial_snapshot_waits_for_pump() {
        let store = MemoryStore::new();
        store.set("expenses", "e1", json!({"amount": 5})).unwrap();

        let (recorder, _reg) = listen(&store, QuerySpec::new("expenses"));
        assert_eq!(recorder.snapshot_count(), 0);

        assert_eq!(store.pump(), 1);
        assert_eq!(recorder.last_ids(), vec!["e1"]);
    }

    #[test]
    fn test_batch_commit_is_one_change() {
        let store = MemoryStore::new();
        let (recorder, _reg) = listen(&store, QuerySpec::new("expenses"));

        let mut batch = store.batch();
        batch
            .set("expenses", "a", json!({"amount": 1}))
            .set("expenses", "b", json!({"amount": 2}))
            .set("expenses", "c", json!({"amount": 3}));
        assert_eq!(batch.commit().unwrap(), 3);

        store.pump();
        assert_eq!(recorder.snapshot_count(), 1);
        assert_eq!(recorder.last_ids(), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_invalid_batch_applies_nothing() {
        let store = MemoryStore::new();
        let mut batch = store.batch();
        batch
            .set("expenses", "a", json!({"amount": 1}))
            .set("expenses", "b", json!("not an object"));

        assert!(matches!(batch.commit(), Err(StoreError::InvalidDocument(_))));
        assert!(store.records("expenses").is_empty());
    }

    #[test]
    fn test_unchanged_results_are_not_redelivered() {
        let store = MemoryStore::new();
        let spec = QuerySpec::new("expenses").filter("category", FilterOp::Eq, "fuel");
        let (recorder, _reg) = listen(&store, spec);
        store.pump();
        assert_eq!(recorder.snapshot_count(), 1);

        // Write outside the result set
        store
            .set("expenses", "x", json!({"category": "misc"}))
            .unwrap();
        assert_eq!(store.pump(), 0);

        store
            .set("expenses", "y", json!({"category": "fuel"}))
            .unwrap();
        assert_eq!(store.pump(), 1);
        assert_eq!(recorder.last_ids(), vec!["y"]);
    }

    #[test]
    fn test_other_collections_do_not_notify() {
        let store = MemoryStore::new();
        let (recorder, _reg) = listen(&store, QuerySpec::new("shifts"));
        store.pump();

        store.set("expenses", "e1", json!({})).unwrap();
        assert_eq!(store.pump(), 0);
        assert_eq!(recorder.snapshot_count(), 1);
    }

    #[test]
    fn test_listen_rejects_invalid_query() {
        let store = MemoryStore::new();
        let result = store.listen(&QuerySpec::new(""), Arc::new(Recorder::default()));
        assert!(matches!(result, Err(StoreError::InvalidQuery(_))));
        assert_eq!(store.listener_count(), 0);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let store = MemoryStore::new();
        let (recorder, reg) = listen(&store, QuerySpec::new("expenses"));
        assert_eq!(store.listener_count(), 1);

        reg.remove();
        reg.remove();
        assert_eq!(store.listener_count(), 0);

        store.set("expenses", "e1", json!({})).unwrap();
        store.pump();
        assert_eq!(recorder.snapshot_count(), 0);
    }

    #[test]
    fn test_injected_fault_reaches_listener() {
        let store = MemoryStore::new();
        let (recorder, _reg) = listen(&store, QuerySpec::new("expenses"));
        store.pump();

        store.inject_fault("expenses", "permission denied");
        store.pump();

        let errors = recorder.errors.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("permission denied"));
        assert!(errors[0].contains("expenses"));
    }

    #[test]
    fn test_offline_without_cache_reports_unavailable() {
        let store = MemoryStore::new();
        let (recorder, _reg) = listen(&store, QuerySpec::new("expenses"));
        store.pump();

        store.set_online(false);
        store.pump();
        assert!(recorder.errors.lock().unwrap()[0].contains("unavailable"));

        let write = store.set("expenses", "e1", json!({}));
        assert!(matches!(write, Err(StoreError::Unavailable(_))));
    }

    #[test]
    fn test_offline_reads_served_from_cache() {
        let store = MemoryStore::new();
        store
            .enable_offline_persistence(&PersistenceSettings::default())
            .unwrap();
        store.set("expenses", "e1", json!({"amount": 10})).unwrap();
        store.set("expenses", "e2", json!({"amount": 20})).unwrap();

        let spec = QuerySpec::new("expenses").order_by("amount", Direction::Desc);
        let (online, _reg) = listen(&store, spec.clone());
        store.pump();
        assert!(!online.snapshots.lock().unwrap()[0].from_cache);

        store.set_online(false);
        let (offline, _reg2) = listen(&store, spec);
        store.pump();

        let snapshots = offline.snapshots.lock().unwrap();
        assert_eq!(snapshots.len(), 1);
        assert!(snapshots[0].from_cache);
        let ids: Vec<_> = snapshots[0].records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
    }

    #[test]
    fn test_persistence_enable_twice_fails() {
        let store = MemoryStore::new();
        store
            .enable_offline_persistence(&PersistenceSettings::default())
            .unwrap();
        assert!(store.persistence_enabled());

        let second = store.enable_offline_persistence(&PersistenceSettings::default());
        assert!(matches!(second, Err(StoreError::PersistenceAlreadyEnabled)));
    }

    #[test]
    fn test_import_json() {
        let store = MemoryStore::new();
        let seed = json!({
            "expenses": [
                {"id": "e1", "amount": 10},
                {"amount": 20}
            ],
            "shifts": [
                {"id": 7, "attendant": "Ana"}
            ]
        });

        assert_eq!(store.import_json(&seed).unwrap(), 3);
        let ids: Vec<_> = store.records("expenses").into_iter().map(|r| r.id).collect();
        assert_eq!(ids, vec!["1", "e1"]);
        let shifts = store.records("shifts");
        assert_eq!(shifts[0].id, "7");
        assert!(shifts[0].field("id").is_none());

        assert!(matches!(
            store.import_json(&json!({"expenses": {"id": "x"}})),
            Err(StoreError::InvalidSeed(_))
        ));
        assert!(matches!(
            store.import_json(&json!([1, 2])),
            Err(StoreError::InvalidSeed(_))
        ));
    }

    #[test]
    fn test_replace_json_drops_missing_documents() {
        let store = MemoryStore::new();
        store
            .import_json(&json!({"expenses": [{"id": "a"}, {"id": "b"}], "shifts": [{"id": "s"}]}))
            .unwrap();
        let (recorder, _reg) = listen(&store, QuerySpec::new("expenses"));
        store.pump();

        let applied = store
            .replace_json(&json!({"expenses": [{"id": "b", "amount": 2}, {"id": "c"}]}))
            .unwrap();
        assert_eq!(applied, 3);
        store.pump();

        assert_eq!(recorder.snapshot_count(), 2);
        assert_eq!(recorder.last_ids(), vec!["b", "c"]);
        // Collections absent from the seed are left alone
        assert_eq!(store.records("shifts").len(), 1);
    }

    #[test]
    fn test_replace_json_keeps_positional_ids() {
        let store = MemoryStore::new();
        let seed = json!({"fuel_sales": [{"litres": 40}, {"litres": 25}]});
        store.import_json(&seed).unwrap();
        let (recorder, _reg) = listen(&store, QuerySpec::new("fuel_sales"));
        store.pump();

        // Reloading the same seed changes nothing
        store.replace_json(&seed).unwrap();
        assert_eq!(store.pump(), 0);
        assert_eq!(recorder.last_ids(), vec!["0", "1"]);

        store
            .replace_json(&json!({"fuel_sales": [{"litres": 40}]}))
            .unwrap();
        store.pump();
        assert_eq!(recorder.last_ids(), vec!["0"]);
    }

    #[test]
    fn test_delete_notifies_listeners() {
        let store = MemoryStore::new();
        store.set("shifts", "s1", json!({"open": true})).unwrap();
        let (recorder, _reg) = listen(&store, QuerySpec::new("shifts"));
        store.pump();

        store.delete("shifts", "s1").unwrap();
        store.pump();
        assert_eq!(recorder.snapshot_count(), 2);
        assert!(recorder.last_ids().is_empty());
    }

    #[test]
    fn test_add_generates_id() {
        let store = MemoryStore::new();
        let id = store.add("expenses", json!({"amount": 1})).unwrap();
        assert!(!id.is_empty());
        assert_eq!(store.records("expenses")[0].id, id);
    }
}
