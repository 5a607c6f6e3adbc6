// Static geometry collider.
//
// Static meshes are level decoration (pillars, statues, furniture) placed at
// a world position with a yaw that is always a multiple of 90°. Each refers
// to a `StaticInfo` carrying a local-space collision box. The collider tests
// a body's cylinder, approximated by its bounding square and height, against
// the static meshes of every room `nearby_rooms` returns, and reports the
// first overlap as a `StaticHit`: a collision type in the probe's own
// front/left/right space plus a corrective (x, z) shift.
//
// The left/right decision uses the body's `Quadrant` and the same
// right-hand axis helpers the probe uses, so the two passes cannot disagree
// on which side is which.
//
// Only the first overlapping mesh is resolved per call. A body wedged
// between two statics is pushed out of one this tick and the other next tick.
//
// See also: `collision.rs` (folds the hit into `CollisionInfo`),
// `neighbors.rs` (room enumeration), `angle.rs` (`Quadrant`).

use crate::angle::{Axis, Quadrant};
use crate::collision::CollType;
use crate::level::{SectorGrid, StaticGeometry};
use crate::neighbors::nearby_rooms;
use crate::types::{BoundingBox, RoomId, StaticId, WorldPos};
use serde::{Deserialize, Serialize};

/// Collision description shared by every mesh of one static kind.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticInfo {
    /// Local-space box. An all-zero box means "never collides".
    pub collision: BoundingBox,
    /// Decorative: skip even if the box is non-empty.
    pub non_collidable: bool,
}

impl StaticInfo {
    pub fn solid(collision: BoundingBox) -> StaticInfo {
        StaticInfo {
            collision,
            non_collidable: false,
        }
    }

    fn collides(&self) -> bool {
        !self.non_collidable && !self.collision.is_empty()
    }
}

/// A placed static mesh.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticMesh {
    pub pos: WorldPos,
    /// Snapped to the nearest quarter turn when colliding.
    pub yaw: i16,
    pub static_id: StaticId,
}

impl StaticMesh {
    /// The collision box in world space.
    pub fn world_box(&self, local: &BoundingBox) -> BoundingBox {
        let (x, y, z) = (self.pos.x, self.pos.y, self.pos.z);
        let (min_x, max_x, min_z, max_z) = match Quadrant::from_facing(self.yaw) {
            Quadrant::North => (x + local.min_x, x + local.max_x, z + local.min_z, z + local.max_z),
            Quadrant::East => (x + local.min_z, x + local.max_z, z - local.max_x, z - local.min_x),
            Quadrant::South => (x - local.max_x, x - local.min_x, z - local.max_z, z - local.min_z),
            Quadrant::West => (x - local.max_z, x - local.min_z, z + local.min_x, z + local.max_x),
        };
        BoundingBox::new(min_x, max_x, y + local.min_y, y + local.max_y, min_z, max_z)
    }
}

/// The body being tested.
#[derive(Clone, Copy, Debug)]
pub struct BodyCylinder {
    /// Feet position (Y is the bottom of the cylinder).
    pub pos: WorldPos,
    /// Last known-good position, used to undo lateral motion on a front hit.
    pub old: WorldPos,
    pub radius: i32,
    pub height: i32,
    pub quadrant: Quadrant,
}

/// First static overlap found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StaticHit {
    pub coll_type: CollType,
    pub shift_x: i32,
    pub shift_z: i32,
    pub room: RoomId,
    pub mesh_index: usize,
}

/// Minimal signed push that moves `[in_min, in_max]` out of `[min, max]`.
fn shifter(in_min: i32, in_max: i32, min: i32, max: i32) -> i32 {
    let shl = in_max - min;
    let shr = max - in_min;
    if shl < shr { -shl } else { shr }
}

/// Test `body` against statics in the rooms around `room`. `margin` widens
/// the room search (not the overlap test) so meshes whose origin is in a
/// neighboring room are still found.
pub fn collide_statics<G>(grid: &G, body: &BodyCylinder, room: RoomId, margin: i32) -> Option<StaticHit>
where
    G: SectorGrid + StaticGeometry + ?Sized,
{
    let BodyCylinder {
        pos, old, radius, ..
    } = *body;
    let body_box = BoundingBox::new(
        pos.x - radius,
        pos.x + radius,
        pos.y - body.height,
        pos.y,
        pos.z - radius,
        pos.z + radius,
    );

    for search_room in nearby_rooms(grid, pos, radius + margin, body.height + margin, room) {
        for (mesh_index, mesh) in grid.statics_in(search_room).iter().enumerate() {
            let Some(info) = grid.static_info(mesh.static_id) else {
                continue;
            };
            if !info.collides() {
                continue;
            }
            let b = mesh.world_box(&info.collision);
            if b.max_x <= body_box.min_x
                || b.min_x >= body_box.max_x
                || b.max_y <= body_box.min_y
                || b.min_y >= body_box.max_y
                || b.max_z <= body_box.min_z
                || b.min_z >= body_box.max_z
            {
                continue;
            }

            let x_shift = shifter(body_box.min_x, body_box.max_x, b.min_x, b.max_x);
            let z_shift = shifter(body_box.min_z, body_box.max_z, b.min_z, b.max_z);
            let q = body.quadrant;
            let lateral = q.lateral_axis();
            let lat_shift = lateral.of(x_shift, z_shift);

            let (coll_type, shift_x, shift_z) = if lat_shift > radius || lat_shift < -radius {
                // Overlap mostly ahead: push back along the direction of
                // travel and undo the sideways component.
                match lateral {
                    Axis::X => (CollType::Front, old.x - pos.x, z_shift),
                    Axis::Z => (CollType::Front, x_shift, old.z - pos.z),
                }
            } else {
                let side = if lat_shift * q.right_sign() > 0 {
                    // Pushed to the right: the obstacle is on the left.
                    CollType::Left
                } else {
                    CollType::Right
                };
                match lateral {
                    Axis::X => (side, lat_shift, 0),
                    Axis::Z => (side, 0, lat_shift),
                }
            };

            return Some(StaticHit {
                coll_type,
                shift_x,
                shift_z,
                room: search_room,
                mesh_index,
            });
        }
    }
    None
}
