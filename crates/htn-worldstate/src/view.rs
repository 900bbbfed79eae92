use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use crate::snapshot::Snapshot;
use crate::store::SharedLiveStore;
use crate::value::{ObjectId, Rot3, Vec3, WorldKey, WorldValue};

/// Resolves an object reference to a world location. Supplied at the
/// boundary by whoever owns the objects; this crate does not.
pub trait ObjectLocator {
    fn locate(&self, object: ObjectId) -> Option<Vec3>;
}

/// What a view reads and writes through.
#[derive(Clone)]
pub enum StoreBinding {
    /// The agent's live, mutable knowledge.
    Live(SharedLiveStore),
    /// A finalized snapshot chain; reads only.
    Sealed(Arc<Snapshot>),
    /// A successor snapshot still being built by one contribution call.
    Draft(Rc<RefCell<Snapshot>>),
}

/// The single entry point planning and execution code use to read and
/// write agent knowledge: a store binding plus an editable flag checked
/// on every write. Planning hooks run against a non-editable snapshot
/// binding; execution hooks against an editable live binding.
pub struct WorldStateView {
    binding: StoreBinding,
    editable: bool,
}

impl WorldStateView {
    /// Editable view over the live store, as handed to executing tasks.
    pub fn live(store: SharedLiveStore) -> Self {
        Self {
            binding: StoreBinding::Live(store),
            editable: true,
        }
    }

    /// Read-only view over a sealed snapshot, as handed to planning and
    /// plan-recheck hooks.
    pub fn sealed(snapshot: Arc<Snapshot>) -> Self {
        Self {
            binding: StoreBinding::Sealed(snapshot),
            editable: false,
        }
    }

    /// Editable view over a successor snapshot under construction.
    pub fn draft(draft: Rc<RefCell<Snapshot>>) -> Self {
        Self {
            binding: StoreBinding::Draft(draft),
            editable: true,
        }
    }

    pub fn is_live(&self) -> bool {
        matches!(self.binding, StoreBinding::Live(_))
    }

    pub fn is_snapshot(&self) -> bool {
        !self.is_live()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// The sealed snapshot this view is bound to, if any. Planning code
    /// forks the successor from this.
    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        match &self.binding {
            StoreBinding::Sealed(snapshot) => Some(Arc::clone(snapshot)),
            _ => None,
        }
    }

    /// Temporarily rebinds the view for the duration of `f`, restoring
    /// the previous binding and editability on every exit path.
    pub fn scoped<R>(
        &mut self,
        binding: StoreBinding,
        editable: bool,
        f: impl FnOnce(&mut WorldStateView) -> R,
    ) -> R {
        struct Restore<'a> {
            view: &'a mut WorldStateView,
            prev: Option<(StoreBinding, bool)>,
        }
        impl Drop for Restore<'_> {
            fn drop(&mut self) {
                if let Some((binding, editable)) = self.prev.take() {
                    self.view.binding = binding;
                    self.view.editable = editable;
                }
            }
        }

        let prev_binding = std::mem::replace(&mut self.binding, binding);
        let prev_editable = std::mem::replace(&mut self.editable, editable);
        let guard = Restore {
            view: self,
            prev: Some((prev_binding, prev_editable)),
        };
        f(&mut *guard.view)
    }

    pub(crate) fn binding_mut(&mut self) -> &mut StoreBinding {
        &mut self.binding
    }

    pub(crate) fn lookup(&self, key: &WorldKey) -> Option<WorldValue> {
        match &self.binding {
            StoreBinding::Live(store) => store.borrow().get(key).cloned(),
            StoreBinding::Sealed(snapshot) => snapshot.get(key).cloned(),
            StoreBinding::Draft(draft) => draft.borrow().get(key).cloned(),
        }
    }

    /// Writes one value. Returns false and logs when the view is not
    /// editable; snapshot views are read-only during plan recheck.
    pub fn set_value(&mut self, key: WorldKey, value: WorldValue) -> bool {
        if !self.editable {
            log::error!("refusing write to '{key}' through a read-only world state view");
            return false;
        }
        match &self.binding {
            StoreBinding::Live(store) => {
                store.borrow_mut().set(key, value);
                true
            }
            StoreBinding::Draft(draft) => {
                draft.borrow_mut().set(key, value);
                true
            }
            StoreBinding::Sealed(_) => {
                log::error!("refusing write to '{key}': snapshot is already sealed");
                false
            }
        }
    }

    pub fn get_object(&self, key: &WorldKey) -> ObjectId {
        match self.lookup(key) {
            Some(WorldValue::Object(id)) => id,
            _ => ObjectId::NONE,
        }
    }

    pub fn get_vector(&self, key: &WorldKey) -> Vec3 {
        match self.lookup(key) {
            Some(WorldValue::Vector(v)) => v,
            _ => Vec3::INVALID,
        }
    }

    pub fn get_bool(&self, key: &WorldKey) -> bool {
        matches!(self.lookup(key), Some(WorldValue::Bool(true)))
    }

    pub fn get_int(&self, key: &WorldKey) -> i64 {
        match self.lookup(key) {
            Some(WorldValue::Int(i)) => i,
            _ => 0,
        }
    }

    pub fn get_float(&self, key: &WorldKey) -> f64 {
        match self.lookup(key) {
            Some(WorldValue::Float(f)) => f,
            _ => 0.0,
        }
    }

    pub fn get_text(&self, key: &WorldKey) -> String {
        match self.lookup(key) {
            Some(WorldValue::Text(s)) => s,
            _ => String::new(),
        }
    }

    pub fn get_name(&self, key: &WorldKey) -> String {
        match self.lookup(key) {
            Some(WorldValue::Name(s)) => s,
            _ => String::new(),
        }
    }

    pub fn get_enum(&self, key: &WorldKey) -> u8 {
        match self.lookup(key) {
            Some(WorldValue::Enum(e)) => e,
            _ => 0,
        }
    }

    pub fn get_rotator(&self, key: &WorldKey) -> Rot3 {
        match self.lookup(key) {
            Some(WorldValue::Rotator(r)) => r,
            _ => Rot3::INVALID,
        }
    }

    pub fn set_object(&mut self, key: WorldKey, value: ObjectId) -> bool {
        self.set_value(key, WorldValue::Object(value))
    }

    pub fn set_vector(&mut self, key: WorldKey, value: Vec3) -> bool {
        self.set_value(key, WorldValue::Vector(value))
    }

    pub fn set_bool(&mut self, key: WorldKey, value: bool) -> bool {
        self.set_value(key, WorldValue::Bool(value))
    }

    pub fn set_int(&mut self, key: WorldKey, value: i64) -> bool {
        self.set_value(key, WorldValue::Int(value))
    }

    pub fn set_float(&mut self, key: WorldKey, value: f64) -> bool {
        self.set_value(key, WorldValue::Float(value))
    }

    pub fn set_text(&mut self, key: WorldKey, value: impl Into<String>) -> bool {
        self.set_value(key, WorldValue::Text(value.into()))
    }

    pub fn set_name(&mut self, key: WorldKey, value: impl Into<String>) -> bool {
        self.set_value(key, WorldValue::Name(value.into()))
    }

    pub fn set_enum(&mut self, key: WorldKey, value: u8) -> bool {
        self.set_value(key, WorldValue::Enum(value))
    }

    pub fn set_rotator(&mut self, key: WorldKey, value: Rot3) -> bool {
        self.set_value(key, WorldValue::Rotator(value))
    }

    /// The agent's own location.
    pub fn self_location(&self) -> Vec3 {
        self.get_vector(&WorldKey::self_location())
    }

    /// Location read from either a vector key or an object key. Object
    /// references are resolved through the caller's locator; without one
    /// an object key yields the invalid location.
    pub fn location_of(&self, key: &WorldKey, locator: Option<&dyn ObjectLocator>) -> Vec3 {
        match self.lookup(key) {
            Some(WorldValue::Vector(v)) => v,
            Some(WorldValue::Object(id)) if id.is_valid() => locator
                .and_then(|l| l.locate(id))
                .unwrap_or(Vec3::INVALID),
            _ => Vec3::INVALID,
        }
    }
}
