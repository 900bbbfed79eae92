use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of a world-state entry. Cheap to clone, used as the map key in
/// both store kinds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldKey(String);

impl WorldKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The agent's own location, written by movement tasks during
    /// planning and read as the start of the next leg.
    pub fn self_location() -> Self {
        Self::new("self_location")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for WorldKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Reference to an externally owned object. Zero is the unset sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(pub u64);

impl ObjectId {
    pub const NONE: ObjectId = ObjectId(0);

    pub fn is_valid(&self) -> bool {
        self.0 != 0
    }
}

/// World-space location. `INVALID` marks an unset or unusable location;
/// every consumer must check `is_valid` before acting on one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);
    pub const INVALID: Vec3 = Vec3::new(f32::MAX, f32::MAX, f32::MAX);

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn is_valid(&self) -> bool {
        self.x != f32::MAX && self.y != f32::MAX && self.z != f32::MAX
    }

    pub fn distance(&self, other: Vec3) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn distance_squared(&self, other: Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    /// Raised copy, used for half-height adjustment of path endpoints.
    pub fn with_z_offset(&self, dz: f32) -> Vec3 {
        Vec3::new(self.x, self.y, self.z + dz)
    }
}

/// World-space rotation in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rot3 {
    pub pitch: f32,
    pub yaw: f32,
    pub roll: f32,
}

impl Rot3 {
    pub const INVALID: Rot3 = Rot3 {
        pitch: f32::MAX,
        yaw: f32::MAX,
        roll: f32::MAX,
    };

    pub fn is_valid(&self) -> bool {
        self.pitch != f32::MAX && self.yaw != f32::MAX && self.roll != f32::MAX
    }
}

/// Tagged value stored under a `WorldKey`. Value semantics: store
/// operations copy these, never share them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WorldValue {
    Object(ObjectId),
    Vector(Vec3),
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Name(String),
    Enum(u8),
    Rotator(Rot3),
}

impl WorldValue {
    pub fn world_type(&self) -> WorldType {
        match self {
            WorldValue::Object(_) => WorldType::Object,
            WorldValue::Vector(_) => WorldType::Vector,
            WorldValue::Bool(_) => WorldType::Bool,
            WorldValue::Int(_) => WorldType::Int,
            WorldValue::Float(_) => WorldType::Float,
            WorldValue::Text(_) => WorldType::Text,
            WorldValue::Name(_) => WorldType::Name,
            WorldValue::Enum(_) => WorldType::Enum,
            WorldValue::Rotator(_) => WorldType::Rotator,
        }
    }

    /// True when the payload equals its type's unset sentinel.
    pub fn is_sentinel(&self) -> bool {
        match self {
            WorldValue::Object(id) => !id.is_valid(),
            WorldValue::Vector(v) => !v.is_valid(),
            WorldValue::Bool(b) => !b,
            WorldValue::Int(i) => *i == 0,
            WorldValue::Float(f) => *f == 0.0,
            WorldValue::Text(s) | WorldValue::Name(s) => s.is_empty(),
            WorldValue::Enum(e) => *e == 0,
            WorldValue::Rotator(r) => !r.is_valid(),
        }
    }
}

impl fmt::Display for WorldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorldValue::Object(id) => write!(f, "object:{}", id.0),
            WorldValue::Vector(v) if v.is_valid() => {
                write!(f, "({:.2}, {:.2}, {:.2})", v.x, v.y, v.z)
            }
            WorldValue::Vector(_) => f.write_str("(invalid)"),
            WorldValue::Bool(b) => write!(f, "{b}"),
            WorldValue::Int(i) => write!(f, "{i}"),
            WorldValue::Float(v) => write!(f, "{v}"),
            WorldValue::Text(s) => f.write_str(s),
            WorldValue::Name(s) => f.write_str(s),
            WorldValue::Enum(e) => write!(f, "enum:{e}"),
            WorldValue::Rotator(r) if r.is_valid() => {
                write!(f, "(p{:.1} y{:.1} r{:.1})", r.pitch, r.yaw, r.roll)
            }
            WorldValue::Rotator(_) => f.write_str("(invalid)"),
        }
    }
}

/// Type tag of a `WorldValue`, used to pick the sentinel for unset reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorldType {
    Object,
    Vector,
    Bool,
    Int,
    Float,
    Text,
    Name,
    Enum,
    Rotator,
}

impl WorldType {
    /// The invalid/unset value reads of an absent key resolve to.
    pub fn sentinel(&self) -> WorldValue {
        match self {
            WorldType::Object => WorldValue::Object(ObjectId::NONE),
            WorldType::Vector => WorldValue::Vector(Vec3::INVALID),
            WorldType::Bool => WorldValue::Bool(false),
            WorldType::Int => WorldValue::Int(0),
            WorldType::Float => WorldValue::Float(0.0),
            WorldType::Text => WorldValue::Text(String::new()),
            WorldType::Name => WorldValue::Name(String::new()),
            WorldType::Enum => WorldValue::Enum(0),
            WorldType::Rotator => WorldValue::Rotator(Rot3::INVALID),
        }
    }
}
