//! Subscription registry
//!
//! The registry maps subscription ids to their cancel handles and delivery
//! gates. It is the only shared mutable state of the coordinator.
//!
//! ## Delivery gate
//!
//! Every delivery to a caller runs through the subscription's gate: under
//! the gate's dispatch lock, and only while the gate is open. Stopping a
//! subscription shuts the gate and then waits for an in-flight delivery on
//! another thread to finish, so no `on_update` runs after the stop
//! returns.
//!
//! A stop issued from inside any delivery callback (of this subscription
//! or another one) only shuts the gate and does not wait. Two callbacks on
//! different threads may therefore stop each other.

use std::cell::Cell;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::lock;
use crate::query::QuerySpec;
use crate::store::ListenerRegistration;

/// Opaque identifier of a live subscription
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub(crate) fn generate(collection: &str, created_at_millis: i64, seq: u64) -> Self {
        Self(format!("{}-{}-{}", collection, created_at_millis, seq))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SubscriptionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SubscriptionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

thread_local! {
    /// Number of deliveries running on this thread
    static DELIVERING: Cell<usize> = const { Cell::new(0) };
}

/// Marks the current thread as delivering until dropped, even on panic
struct DeliveryScope;

impl DeliveryScope {
    fn enter() -> Self {
        DELIVERING.with(|depth| depth.set(depth.get() + 1));
        DeliveryScope
    }

    fn active() -> bool {
        DELIVERING.with(|depth| depth.get() > 0)
    }
}

impl Drop for DeliveryScope {
    fn drop(&mut self) {
        DELIVERING.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Per-subscription delivery gate and syncing flag
#[derive(Debug, Default)]
pub(crate) struct Gate {
    closed: AtomicBool,
    syncing: AtomicBool,
    dispatch: Mutex<()>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Run `f` unless the gate is shut; returns whether it ran
    pub(crate) fn deliver(&self, f: impl FnOnce()) -> bool {
        let _dispatch = lock(&self.dispatch);
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }

        let _scope = DeliveryScope::enter();
        f();
        true
    }

    /// Refuse all further deliveries
    pub(crate) fn shut(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.syncing.store(false, Ordering::SeqCst);
    }

    /// Wait for a delivery running on another thread to finish
    ///
    /// Returns immediately when called from inside any delivery, since
    /// the delivery being waited on may itself be waiting on this one.
    pub(crate) fn wait_idle(&self) {
        if !DeliveryScope::active() {
            drop(lock(&self.dispatch));
        }
    }

    pub(crate) fn set_syncing(&self, syncing: bool) {
        self.syncing.store(syncing, Ordering::SeqCst);
    }

    pub(crate) fn is_syncing(&self) -> bool {
        self.syncing.load(Ordering::SeqCst)
    }
}

/// A registered live query
pub(crate) struct ActiveSync {
    pub(crate) query: QuerySpec,
    pub(crate) gate: Arc<Gate>,
    pub(crate) registration: Box<dyn ListenerRegistration>,
}

impl ActiveSync {
    /// Wait out any in-flight delivery, then detach from the store
    fn finish(self, id: &SubscriptionId) {
        self.gate.wait_idle();
        self.registration.remove();
        info!("Stopped sync {} ({})", id, self.query);
    }
}

/// Registry of live subscriptions
#[derive(Default)]
pub(crate) struct Registry {
    entries: Mutex<HashMap<SubscriptionId, ActiveSync>>,
}

impl Registry {
    pub(crate) fn insert(&self, id: SubscriptionId, sync: ActiveSync) {
        lock(&self.entries).insert(id, sync);
    }

    pub(crate) fn is_syncing(&self, id: &SubscriptionId) -> bool {
        lock(&self.entries)
            .get(id)
            .map(|sync| sync.gate.is_syncing())
            .unwrap_or(false)
    }

    pub(crate) fn contains(&self, id: &SubscriptionId) -> bool {
        lock(&self.entries).contains_key(id)
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.entries).len()
    }

    /// Stop one subscription; unknown ids are a no-op
    ///
    /// The entry leaves the map and its gate shuts under the registry lock.
    /// Waiting for in-flight deliveries happens after the lock is released
    /// so callbacks may still query the registry.
    pub(crate) fn stop(&self, id: &SubscriptionId) -> bool {
        let removed = {
            let mut entries = lock(&self.entries);
            let removed = entries.remove(id);
            if let Some(sync) = &removed {
                sync.gate.shut();
            }
            removed
        };

        match removed {
            Some(sync) => {
                sync.finish(id);
                true
            }
            None => {
                debug!("Stop requested for unknown sync {}", id);
                false
            }
        }
    }

    /// Stop every subscription; returns how many were active
    pub(crate) fn stop_all(&self) -> usize {
        let drained: Vec<(SubscriptionId, ActiveSync)> = {
            let mut entries = lock(&self.entries);
            let drained: Vec<_> = entries.drain().collect();
            for (_, sync) in &drained {
                sync.gate.shut();
            }
            drained
        };

        let count = drained.len();
        for (id, sync) in drained {
            sync.finish(&id);
        }
        count
    }
}

/// Handle to one live subscription
///
/// `cancel` is idempotent, and dropping the handle cancels the
/// subscription.
pub struct Subscription {
    id: SubscriptionId,
    registry: Weak<Registry>,
}

impl Subscription {
    pub(crate) fn new(id: SubscriptionId, registry: &Arc<Registry>) -> Self {
        Self {
            id,
            registry: Arc::downgrade(registry),
        }
    }

    pub fn id(&self) -> &SubscriptionId {
        &self.id
    }

    /// Whether at least one snapshot has been delivered since the last fault
    pub fn is_syncing(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.is_syncing(&self.id))
            .unwrap_or(false)
    }

    /// Whether the subscription is still registered
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .map(|registry| registry.contains(&self.id))
            .unwrap_or(false)
    }

    /// Stop the subscription
    pub fn cancel(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.stop(&self.id);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
