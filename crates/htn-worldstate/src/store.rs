use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::value::{WorldKey, WorldValue};

/// The live store is owned by one agent's executor and shared with the
/// views it hands out; execution is single-threaded per agent.
pub type SharedLiveStore = Rc<RefCell<LiveStore>>;

pub fn share(store: LiveStore) -> SharedLiveStore {
    Rc::new(RefCell::new(store))
}

/// Subscription to changes of one live key. Issued by the store,
/// ownership tracked by the subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverHandle(u64);

/// A change notification queued by a live write to an observed key.
/// Drained and routed by the executor on the agent's update cadence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChange {
    pub handle: ObserverHandle,
    pub key: WorldKey,
}

/// The agent's actual, mutable knowledge mapping. Writes are visible
/// immediately to every view bound to this store.
#[derive(Default)]
pub struct LiveStore {
    entries: IndexMap<WorldKey, WorldValue>,
    observers: IndexMap<ObserverHandle, WorldKey>,
    next_observer: u64,
    pending: VecDeque<KeyChange>,
}

impl LiveStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &WorldKey) -> Option<&WorldValue> {
        self.entries.get(key)
    }

    pub fn is_set(&self, key: &WorldKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn set(&mut self, key: WorldKey, value: WorldValue) {
        self.notify(&key);
        self.entries.insert(key, value);
    }

    /// Resets the key to unset. Observers are notified like any write.
    pub fn clear(&mut self, key: &WorldKey) {
        if self.entries.shift_remove(key).is_some() {
            self.notify(key);
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&WorldKey, &WorldValue)> {
        self.entries.iter()
    }

    /// Registers an observer for one key. The caller owns the handle and
    /// must unsubscribe it when the owning occurrence finishes.
    pub fn subscribe(&mut self, key: WorldKey) -> ObserverHandle {
        self.next_observer += 1;
        let handle = ObserverHandle(self.next_observer);
        self.observers.insert(handle, key);
        handle
    }

    /// Returns false when the handle was not registered.
    pub fn unsubscribe(&mut self, handle: ObserverHandle) -> bool {
        self.observers.shift_remove(&handle).is_some()
    }

    pub fn observed_key(&self, handle: ObserverHandle) -> Option<&WorldKey> {
        self.observers.get(&handle)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Takes all queued change notifications, oldest first.
    pub fn drain_changes(&mut self) -> Vec<KeyChange> {
        self.pending.drain(..).collect()
    }

    fn notify(&mut self, key: &WorldKey) {
        for (handle, observed) in &self.observers {
            if observed == key {
                self.pending.push_back(KeyChange {
                    handle: *handle,
                    key: key.clone(),
                });
            }
        }
    }
}
