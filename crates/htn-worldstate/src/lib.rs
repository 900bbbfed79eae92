//! Agent world state: key-typed values, the live store, the immutable
//! snapshot chain and the dual-binding view shared by planning and
//! execution code.

pub mod ops;
pub mod snapshot;
pub mod store;
pub mod value;
pub mod view;

pub use ops::{ArithmeticOp, BasicOp, TextOp};
pub use snapshot::{Snapshot, build_next};
pub use store::{KeyChange, LiveStore, ObserverHandle, SharedLiveStore, share};
pub use value::{ObjectId, Rot3, Vec3, WorldKey, WorldType, WorldValue};
pub use view::{ObjectLocator, StoreBinding, WorldStateView};
