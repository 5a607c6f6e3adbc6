// Core types shared across the spatial core.
//
// Defines world positions (`WorldPos`), the compact integer handles used to
// index every arena in the crate (rooms, boxes, items, slots, objects,
// static infos), the world-unit constants the grid is built on, and the
// local-space `BoundingBox` carried by animated bodies and static meshes.
//
// Coordinates follow the engine convention: X east, Z north, Y *down*
// (a larger y is lower in the world). One sector is `WALL_L` units wide,
// one "click" of height is `STEP_L`.
//
// **Critical constraint: determinism.** All spatial math is integer math.
// Handles are plain indices assigned in load order.

use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// World units
// ---------------------------------------------------------------------------

/// log2 of the sector width.
pub const WALL_SHIFT: i32 = 10;
/// Width of one grid sector in world units.
pub const WALL_L: i32 = 1 << WALL_SHIFT;
/// One quarter of a sector: the standard step height.
pub const STEP_L: i32 = WALL_L / 4;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position (or displacement) in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl WorldPos {
    pub const ZERO: WorldPos = WorldPos::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// Component-wise sum.
    pub fn offset(self, other: Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    /// Component-wise difference `self - other`.
    pub fn delta(self, other: Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    /// Squared 3D distance with every component right-shifted by `shift`
    /// before squaring, so far-apart positions cannot overflow.
    pub fn shifted_distance_sq(self, other: Self, shift: u32) -> i64 {
        let dx = ((self.x - other.x) >> shift) as i64;
        let dy = ((self.y - other.y) >> shift) as i64;
        let dz = ((self.z - other.z) >> shift) as i64;
        dx * dx + dy * dy + dz * dz
    }

    /// Squared horizontal (XZ) distance, unshifted.
    pub fn horizontal_distance_sq(self, other: Self) -> i64 {
        let dx = (self.x - other.x) as i64;
        let dz = (self.z - other.z) as i64;
        dx * dx + dz * dz
    }
}

impl fmt::Display for WorldPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// Axis-aligned box in an object's local frame (or world frame, once
/// rotated and offset). `min_y` is the top because Y points down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl BoundingBox {
    pub const fn new(min_x: i32, max_x: i32, min_y: i32, max_y: i32, min_z: i32, max_z: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            min_z,
            max_z,
        }
    }

    /// A box with no extent on any axis. Static meshes use this to opt out
    /// of collision.
    pub fn is_empty(&self) -> bool {
        self.min_x == self.max_x && self.min_y == self.max_y && self.min_z == self.max_z
    }

    pub fn height(&self) -> i32 {
        self.max_y - self.min_y
    }
}

// ---------------------------------------------------------------------------
// Arena handles: small integers, not UUIDs.
// ---------------------------------------------------------------------------

macro_rules! handle {
    ($(#[$meta:meta])* $name:ident($inner:ty)) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl $name {
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

handle!(/// Index of a room in `Level::rooms`.
RoomId(u16));
handle!(/// Index of a navigation box in `Level::boxes`.
BoxId(u16));
handle!(/// Index of an item in the `ItemTable`.
ItemId(u16));
handle!(/// Index of a slot in the `SlotPool`.
SlotId(u8));
handle!(/// Object kind identifier (which species / mechanism an item is).
ObjectId(u16));
handle!(/// Index of a static collision description in `Level::static_infos`.
StaticId(u16));

/// Reachability class id. Only meaningful within one zone table (one
/// locomotion class and one flip state).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ZoneId(pub u16);
