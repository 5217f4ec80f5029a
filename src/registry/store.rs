//! Consumer registry implementation
//!
//! Writers (register/unregister) serialize on a mutex and republish an
//! immutable snapshot. The relay loads that snapshot without taking a lock,
//! so broadcast throughput does not depend on connection churn.

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use super::consumer::{Consumer, ConsumerId, ConsumerState};

/// Point-in-time view of the live consumers, ordered by id
pub type Snapshot = Arc<Vec<Arc<Consumer>>>;

/// Live set of downstream consumers
#[derive(Debug)]
pub struct ConsumerRegistry {
    /// Authoritative membership, touched only on register/unregister
    consumers: Mutex<BTreeMap<ConsumerId, Arc<Consumer>>>,

    /// Snapshot read by the relay hot path
    snapshot: ArcSwap<Vec<Arc<Consumer>>>,
}

impl ConsumerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            consumers: Mutex::new(BTreeMap::new()),
            snapshot: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Add a consumer and open it
    ///
    /// The consumer must still be `Connecting`; a consumer that was already
    /// closed is not inserted. Re-registering a live id is a no-op.
    pub fn register(&self, consumer: Arc<Consumer>) -> ConsumerId {
        let id = consumer.id();
        let mut consumers = self.consumers.lock();

        if consumers.contains_key(&id) {
            tracing::warn!(consumer_id = %id, "Consumer already registered");
            return id;
        }

        if !consumer.open() {
            tracing::debug!(
                consumer_id = %id,
                state = ?consumer.state(),
                "Consumer not registered (not connecting)"
            );
            return id;
        }

        consumers.insert(id, consumer);
        self.rebuild_snapshot(&consumers);

        tracing::debug!(consumer_id = %id, consumers = consumers.len(), "Consumer added");
        id
    }

    /// Remove a consumer and close it
    ///
    /// Idempotent. Returns `true` only for the call that actually removed it.
    pub fn unregister(&self, id: ConsumerId) -> bool {
        let mut consumers = self.consumers.lock();

        let Some(consumer) = consumers.remove(&id) else {
            return false;
        };

        let previous = consumer.close();
        self.rebuild_snapshot(&consumers);

        tracing::debug!(
            consumer_id = %id,
            previous_state = ?previous,
            consumers = consumers.len(),
            "Consumer removed"
        );
        true
    }

    /// Current set of live consumers
    ///
    /// Consumers removed after the snapshot was taken stay in it but report a
    /// non-open state, so iterating an old snapshot is always safe.
    #[inline]
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.load_full()
    }

    /// Look up a live consumer
    pub fn get(&self, id: ConsumerId) -> Option<Arc<Consumer>> {
        self.consumers.lock().get(&id).cloned()
    }

    /// Number of live consumers
    pub fn len(&self) -> usize {
        self.snapshot.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Close and remove every consumer
    ///
    /// Used on shutdown. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut consumers = self.consumers.lock();
        let count = consumers.len();

        for consumer in consumers.values() {
            consumer.close();
        }
        consumers.clear();
        self.rebuild_snapshot(&consumers);

        count
    }

    fn rebuild_snapshot(&self, consumers: &BTreeMap<ConsumerId, Arc<Consumer>>) {
        let snapshot: Vec<Arc<Consumer>> = consumers
            .values()
            .filter(|c| c.state() != ConsumerState::Closed)
            .cloned()
            .collect();
        self.snapshot.store(Arc::new(snapshot));
    }
}

impl Default for ConsumerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
