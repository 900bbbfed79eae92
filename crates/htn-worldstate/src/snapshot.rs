use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::store::LiveStore;
use crate::value::{WorldKey, WorldValue};
use crate::view::WorldStateView;

/// One node of the immutable planning chain. A read walks this node's
/// overlay, then the parent chain, until a key is found or the chain
/// ends. Sealed nodes (`Arc<Snapshot>`) are never mutated; forking is
/// O(1) and ancestor data is shared structurally.
#[derive(Debug, Default, Clone)]
pub struct Snapshot {
    parent: Option<Arc<Snapshot>>,
    // `None` is a tombstone: the key was cleared at this node and reads
    // must not fall through to an ancestor.
    overlay: IndexMap<WorldKey, Option<WorldValue>>,
}

impl Snapshot {
    /// An empty root with no ancestors.
    pub fn new() -> Self {
        Self::default()
    }

    /// A planning root copied from the agent's current live knowledge.
    pub fn capture(live: &LiveStore) -> Self {
        let mut root = Self::new();
        for (key, value) in live.entries() {
            root.overlay.insert(key.clone(), Some(value.clone()));
        }
        root
    }

    /// Forks a successor whose parent is `parent`, with an empty overlay.
    /// Any number of successors of the same node may coexist.
    pub fn make_next(parent: &Arc<Snapshot>) -> Snapshot {
        Snapshot {
            parent: Some(Arc::clone(parent)),
            overlay: IndexMap::new(),
        }
    }

    /// Finalizes this node; past this point it is immutable and shareable.
    pub fn seal(self) -> Arc<Snapshot> {
        Arc::new(self)
    }

    pub fn get(&self, key: &WorldKey) -> Option<&WorldValue> {
        let mut node = self;
        loop {
            if let Some(slot) = node.overlay.get(key) {
                return slot.as_ref();
            }
            match &node.parent {
                Some(parent) => node = parent,
                None => return None,
            }
        }
    }

    pub fn is_set(&self, key: &WorldKey) -> bool {
        self.get(key).is_some()
    }

    pub fn set(&mut self, key: WorldKey, value: WorldValue) {
        self.overlay.insert(key, Some(value));
    }

    /// Clears the key at this node, masking any ancestor value.
    pub fn clear(&mut self, key: WorldKey) {
        self.overlay.insert(key, None);
    }

    /// Number of locally changed keys, not counting ancestors.
    pub fn overlay_len(&self) -> usize {
        self.overlay.len()
    }
}

/// Builds and seals a successor of `parent`, letting `build` write the
/// predicted post-conditions through an editable draft-bound view. The
/// draft is only writable inside `build`; the returned snapshot is
/// immutable.
pub fn build_next(parent: &Arc<Snapshot>, build: impl FnOnce(&mut WorldStateView)) -> Arc<Snapshot> {
    let draft = Rc::new(RefCell::new(Snapshot::make_next(parent)));
    let mut view = WorldStateView::draft(Rc::clone(&draft));
    build(&mut view);
    drop(view);
    let snapshot = match Rc::try_unwrap(draft) {
        Ok(cell) => cell.into_inner(),
        // The builder stashed a clone of the draft handle; seal a copy.
        Err(shared) => shared.borrow().clone(),
    };
    snapshot.seal()
}
