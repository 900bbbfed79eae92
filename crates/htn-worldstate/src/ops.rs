//! Key test and maintenance operations layered on the view, usable
//! against either store binding.

use crate::snapshot::Snapshot;
use crate::value::{WorldKey, WorldValue};
use crate::view::{StoreBinding, WorldStateView};

/// Presence test on a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasicOp {
    Set,
    NotSet,
}

/// Comparison against a numeric key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Equal,
    NotEqual,
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
}

/// Comparison against a text key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextOp {
    Equal,
    NotEqual,
    Contain,
    NotContain,
}

impl ArithmeticOp {
    fn eval(self, lhs: f64, rhs: f64) -> bool {
        match self {
            ArithmeticOp::Equal => lhs == rhs,
            ArithmeticOp::NotEqual => lhs != rhs,
            ArithmeticOp::Less => lhs < rhs,
            ArithmeticOp::LessOrEqual => lhs <= rhs,
            ArithmeticOp::Greater => lhs > rhs,
            ArithmeticOp::GreaterOrEqual => lhs >= rhs,
        }
    }
}

impl WorldStateView {
    pub fn is_set(&self, key: &WorldKey) -> bool {
        self.lookup(key).is_some()
    }

    pub fn test_basic(&self, key: &WorldKey, op: BasicOp) -> bool {
        match op {
            BasicOp::Set => self.is_set(key),
            BasicOp::NotSet => !self.is_set(key),
        }
    }

    /// Int keys compare against `int_value`, float keys against
    /// `float_value`; any other type fails the test.
    pub fn test_arithmetic(
        &self,
        key: &WorldKey,
        op: ArithmeticOp,
        int_value: i64,
        float_value: f64,
    ) -> bool {
        match self.lookup(key) {
            Some(WorldValue::Int(i)) => op.eval(i as f64, int_value as f64),
            Some(WorldValue::Float(f)) => op.eval(f, float_value),
            _ => false,
        }
    }

    pub fn test_text(&self, key: &WorldKey, op: TextOp, value: &str) -> bool {
        let text = match self.lookup(key) {
            Some(WorldValue::Text(s)) | Some(WorldValue::Name(s)) => s,
            _ => return false,
        };
        match op {
            TextOp::Equal => text == value,
            TextOp::NotEqual => text != value,
            TextOp::Contain => text.contains(value),
            TextOp::NotContain => !text.contains(value),
        }
    }

    /// Resets the key to unset. Subject to the same editability gate as
    /// any write.
    pub fn clear_value(&mut self, key: &WorldKey) -> bool {
        if !self.is_editable() {
            log::error!("refusing clear of '{key}' through a read-only world state view");
            return false;
        }
        match self.binding_mut() {
            StoreBinding::Live(store) => {
                store.borrow_mut().clear(key);
                true
            }
            StoreBinding::Draft(draft) => {
                draft.borrow_mut().clear(key.clone());
                true
            }
            StoreBinding::Sealed(_) => {
                log::error!("refusing clear of '{key}': snapshot is already sealed");
                false
            }
        }
    }

    /// Copies one key's value out of `source` into this view. A key
    /// unset in the source clears it here.
    pub fn copy_value_from(&mut self, source: &Snapshot, key: &WorldKey) -> bool {
        match source.get(key) {
            Some(value) => self.set_value(key.clone(), value.clone()),
            None => self.clear_value(key),
        }
    }

    /// Human-readable `key: value` line for diagnostics output.
    pub fn describe_key_value(&self, key: &WorldKey) -> String {
        match self.lookup(key) {
            Some(value) => format!("{key}: {value}"),
            None => format!("{key}: (unset)"),
        }
    }
}
