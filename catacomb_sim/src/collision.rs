// Collision probe: height-pass classification plus static folding.
//
// `probe` answers "can this body stand here" for a proposed position. It
// samples floor and ceiling at four points around the body (mid, front,
// left, right), converts them to clearances relative to the body, and
// classifies the result into a `CollType` with a corrective `shift` the
// caller adds to the proposed position. Then the static collider runs
// and any penetration of a static mesh is folded into the same shift.
//
// Clearances:
// - floor: `floor_y - feet_y`. Positive is a drop below the feet, negative
//   is a step up.
// - ceiling: `ceiling_y - head_y` where `head_y = feet_y - height`.
//   Negative is headroom, positive is how far the ceiling intrudes into the
//   body.
// A point in solid rock has no floor (`None`) and always counts as out of
// bounds.
//
// Decision order (first match wins except TOP, which falls through):
// 1. no mid floor: FRONT, shift back to `old`.
// 2. `mid_floor - mid_ceiling <= 0` (gap shorter than the body): CLAMP,
//    shift back to `old`.
// 3. `mid_ceiling >= 0`: TOP, shift down by `mid_ceiling`.
// 4. front floor out of `[bad_neg, bad_pos]`: FRONT, grid snap along the
//    direction of travel, undo the sideways motion.
// 5. front ceiling above `bad_ceiling`: TOPFRONT, shift back to `old`.
// 6. left, then right, floor out of bounds: LEFT/RIGHT, grid snap sideways.
//
// The facing is bucketed once into a `Quadrant` at the top of `probe`; the
// probe offsets, the grid-snap axes and the static collider's left/right
// tie-break all read that one value.
//
// See also: `statics.rs`, `push.rs` (re-validates through `probe`),
// `angle.rs` (`Quadrant`), `level.rs` (`SectorGrid`).
//
// **Critical constraint: determinism.** `probe` is a pure function of its
// inputs and the level; calling it twice with the same inputs yields the
// same classification and shift.

use crate::angle::{self, Quadrant};
use crate::config::{CollisionDefaults, NO_BAD_NEG, NO_BAD_POS};
use crate::level::{HeightType, SectorGrid, StaticGeometry};
use crate::statics::{BodyCylinder, collide_statics};
use crate::types::{RoomId, WALL_L, WALL_SHIFT, WorldPos};
use serde::{Deserialize, Serialize};

/// How far above the body's head the probe resolves rooms from.
const PROBE_HEADROOM: i32 = 160;
/// Floor reading substituted for a steep upward slope treated as a wall.
const SLOPE_WALL: i32 = -32767;
/// Floor reading substituted for a steep downward slope treated as a pit.
const SLOPE_PIT: i32 = 512;

/// Classification of a probe.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollType {
    #[default]
    None,
    Front,
    Left,
    Right,
    Top,
    TopFront,
    Clamp,
}

/// Signed offset that moves `src` out of its grid cell into the adjacent
/// cell toward `dst`, by the smallest amount. Zero when both share a cell.
pub fn find_grid_shift(src: i32, dst: i32) -> i32 {
    let src_cell = src >> WALL_SHIFT;
    let dst_cell = dst >> WALL_SHIFT;
    if src_cell == dst_cell {
        return 0;
    }
    let frac = src & (WALL_L - 1);
    if dst_cell > src_cell {
        WALL_L - frac
    } else {
        -(frac + 1)
    }
}

/// Horizontal offsets of the front/left/right sample points.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProbeOffsets {
    pub quadrant: Quadrant,
    pub front: (i32, i32),
    pub left: (i32, i32),
    pub right: (i32, i32),
}

impl ProbeOffsets {
    /// Front sits `radius` ahead along the quadrant axis and follows the
    /// exact facing sideways; left and right are the forward corners.
    pub fn for_facing(facing: i16, quadrant: Quadrant, radius: i32) -> ProbeOffsets {
        let (fx, fz) = quadrant.forward();
        let (rx, rz) = quadrant.right();
        let lat_x = (angle::sin(facing) * radius) >> angle::TRIG_SHIFT;
        let lat_z = (angle::cos(facing) * radius) >> angle::TRIG_SHIFT;
        let front = match quadrant.lateral_axis() {
            angle::Axis::X => (lat_x, fz * radius),
            angle::Axis::Z => (fx * radius, lat_z),
        };
        ProbeOffsets {
            quadrant,
            front,
            left: (fx * radius - rx * radius, fz * radius - rz * radius),
            right: (fx * radius + rx * radius, fz * radius + rz * radius),
        }
    }
}

/// Per-call collision scratch. Callers fill the thresholds and flags, set
/// `old` and `facing`, call `probe`, then read the classification.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CollisionInfo {
    pub mid_floor: Option<i32>,
    pub mid_ceiling: Option<i32>,
    pub mid_type: HeightType,
    pub front_floor: Option<i32>,
    pub front_ceiling: Option<i32>,
    pub front_type: HeightType,
    pub left_floor: Option<i32>,
    pub left_ceiling: Option<i32>,
    pub left_type: HeightType,
    pub right_floor: Option<i32>,
    pub right_ceiling: Option<i32>,
    pub right_type: HeightType,

    pub radius: i32,
    pub bad_pos: i32,
    pub bad_neg: i32,
    pub bad_ceiling: i32,

    pub shift: WorldPos,
    pub old: WorldPos,
    pub facing: i16,
    pub quadrant: Quadrant,
    pub coll_type: CollType,

    /// Floor script under the mid point.
    pub trigger: Option<u16>,
    pub tilt_x: i8,
    pub tilt_z: i8,
    pub hit_static: bool,

    pub slopes_are_walls: bool,
    pub slopes_are_pits: bool,
    /// Run the static collider after the height pass.
    pub collide_statics: bool,
    /// Room-search widening for the static collider.
    pub static_margin: i32,
    /// Let dynamic bodies push this one.
    pub enable_push: bool,
    /// Let tall pushes start a hit reaction.
    pub enable_spaz: bool,
}

impl CollisionInfo {
    pub fn new(radius: i32, bad_pos: i32, bad_neg: i32, bad_ceiling: i32) -> CollisionInfo {
        CollisionInfo {
            mid_floor: None,
            mid_ceiling: None,
            mid_type: HeightType::Flat,
            front_floor: None,
            front_ceiling: None,
            front_type: HeightType::Flat,
            left_floor: None,
            left_ceiling: None,
            left_type: HeightType::Flat,
            right_floor: None,
            right_ceiling: None,
            right_type: HeightType::Flat,
            radius,
            bad_pos,
            bad_neg,
            bad_ceiling,
            shift: WorldPos::ZERO,
            old: WorldPos::ZERO,
            facing: 0,
            quadrant: Quadrant::North,
            coll_type: CollType::None,
            trigger: None,
            tilt_x: 0,
            tilt_z: 0,
            hit_static: false,
            slopes_are_walls: false,
            slopes_are_pits: false,
            collide_statics: true,
            static_margin: 50,
            enable_push: true,
            enable_spaz: true,
        }
    }

    /// Player thresholds from config.
    pub fn from_defaults(defaults: &CollisionDefaults) -> CollisionInfo {
        let mut coll = CollisionInfo::new(
            defaults.player_radius,
            defaults.bad_pos,
            defaults.bad_neg,
            defaults.bad_ceiling,
        );
        coll.static_margin = defaults.static_margin;
        coll
    }

    /// Thresholds that accept any floor, used by flyers and re-validation.
    pub fn unbounded(radius: i32) -> CollisionInfo {
        CollisionInfo::new(radius, NO_BAD_POS, NO_BAD_NEG, 0)
    }

    /// `pos` with the proposed correction applied.
    pub fn shifted(&self, pos: WorldPos) -> WorldPos {
        pos.offset(self.shift)
    }

    fn floor_in_bounds(&self, floor: Option<i32>) -> bool {
        match floor {
            Some(f) => f <= self.bad_pos && f >= self.bad_neg,
            None => false,
        }
    }

    fn ceiling_blocks(&self, ceiling: Option<i32>) -> bool {
        ceiling.is_some_and(|c| c > self.bad_ceiling)
    }

    fn restore_old(&mut self, pos: WorldPos) {
        self.shift.x = self.old.x - pos.x;
        self.shift.y = self.old.y - pos.y;
        self.shift.z = self.old.z - pos.z;
    }

    fn adjust_for_slopes(&self, floor: Option<i32>, kind: HeightType) -> Option<i32> {
        match floor {
            Some(f) if self.slopes_are_walls && kind == HeightType::BigSlope && f < 0 => {
                Some(SLOPE_WALL)
            }
            Some(f) if self.slopes_are_pits && kind == HeightType::BigSlope && f > 0 => {
                Some(SLOPE_PIT)
            }
            other => other,
        }
    }
}

struct Sample {
    floor: Option<i32>,
    ceiling: Option<i32>,
    kind: HeightType,
    tilt_x: i8,
    tilt_z: i8,
    trigger: Option<u16>,
}

/// Floor and ceiling clearances at `(x, z)` for a body with feet at `feet_y`
/// and head at `head_y`.
fn sample<G: SectorGrid + ?Sized>(
    grid: &G,
    x: i32,
    z: i32,
    feet_y: i32,
    head_y: i32,
    room: RoomId,
) -> Sample {
    let at = WorldPos::new(x, head_y - PROBE_HEADROOM, z);
    let floor = grid.height(at, room);
    let ceiling = grid.ceiling(at, room);
    Sample {
        floor: floor.height.map(|h| h - feet_y),
        ceiling: ceiling.map(|c| c - head_y),
        kind: floor.kind,
        tilt_x: floor.tilt.x,
        tilt_z: floor.tilt.z,
        trigger: floor.trigger,
    }
}

/// Classify a body of `height` standing at `pos` in `room`. Reads
/// `coll.old`, `coll.facing`, thresholds and flags; writes everything else.
pub fn probe<G>(grid: &G, coll: &mut CollisionInfo, pos: WorldPos, room: RoomId, height: i32)
where
    G: SectorGrid + StaticGeometry + ?Sized,
{
    coll.coll_type = CollType::None;
    coll.shift = WorldPos::ZERO;
    coll.hit_static = false;
    coll.quadrant = Quadrant::from_facing(coll.facing);

    let offsets = ProbeOffsets::for_facing(coll.facing, coll.quadrant, coll.radius);
    let head_y = pos.y - height;

    let mid = sample(grid, pos.x, pos.z, pos.y, head_y, room);
    coll.mid_floor = mid.floor;
    coll.mid_ceiling = mid.ceiling;
    coll.mid_type = mid.kind;
    coll.trigger = mid.trigger;
    coll.tilt_x = mid.tilt_x;
    coll.tilt_z = mid.tilt_z;

    let front = sample(grid, pos.x + offsets.front.0, pos.z + offsets.front.1, pos.y, head_y, room);
    coll.front_floor = coll.adjust_for_slopes(front.floor, front.kind);
    coll.front_ceiling = front.ceiling;
    coll.front_type = front.kind;

    let left = sample(grid, pos.x + offsets.left.0, pos.z + offsets.left.1, pos.y, head_y, room);
    coll.left_floor = coll.adjust_for_slopes(left.floor, left.kind);
    coll.left_ceiling = left.ceiling;
    coll.left_type = left.kind;

    let right = sample(grid, pos.x + offsets.right.0, pos.z + offsets.right.1, pos.y, head_y, room);
    coll.right_floor = coll.adjust_for_slopes(right.floor, right.kind);
    coll.right_ceiling = right.ceiling;
    coll.right_type = right.kind;

    if !classify_heights(coll, pos, &offsets) {
        return;
    }

    if coll.collide_statics {
        fold_statics(grid, coll, pos, room, height);
    }
}

/// Height pass. Returns false when the body was sent straight back to
/// `old`, in which case nothing further runs this call.
fn classify_heights(coll: &mut CollisionInfo, pos: WorldPos, offsets: &ProbeOffsets) -> bool {
    let Some(mid_floor) = coll.mid_floor else {
        coll.restore_old(pos);
        coll.coll_type = CollType::Front;
        return false;
    };

    if let Some(mid_ceiling) = coll.mid_ceiling {
        if mid_floor - mid_ceiling <= 0 {
            coll.restore_old(pos);
            coll.coll_type = CollType::Clamp;
            return false;
        }
        if mid_ceiling >= 0 {
            coll.shift.y = mid_ceiling;
            coll.coll_type = CollType::Top;
        }
    }

    let q = offsets.quadrant;
    let forward = q.forward_axis();
    let lateral = q.lateral_axis();
    let (px, pz) = (pos.x, pos.z);
    let at = |off: (i32, i32)| (px + off.0, pz + off.1);

    if !coll.floor_in_bounds(coll.front_floor) {
        let front = at(offsets.front);
        let snap = find_grid_shift(forward.of(front.0, front.1), forward.of(px, pz));
        let undo = lateral.of(coll.old.x, coll.old.z) - lateral.of(px, pz);
        set_horizontal(coll, forward, snap, undo);
        coll.coll_type = CollType::Front;
        return true;
    }

    if coll.ceiling_blocks(coll.front_ceiling) {
        coll.restore_old(pos);
        coll.coll_type = CollType::TopFront;
        return false;
    }

    let front = at(offsets.front);
    let front_lat = lateral.of(front.0, front.1);
    for (floor, offset, kind) in [
        (coll.left_floor, offsets.left, CollType::Left),
        (coll.right_floor, offsets.right, CollType::Right),
    ] {
        if !coll.floor_in_bounds(floor) {
            let side = at(offset);
            let snap = find_grid_shift(lateral.of(side.0, side.1), front_lat);
            match lateral {
                angle::Axis::X => coll.shift.x = snap,
                angle::Axis::Z => coll.shift.z = snap,
            }
            coll.coll_type = kind;
            return true;
        }
    }
    true
}

/// Write `along` on `forward` and `across` on the other horizontal axis.
fn set_horizontal(coll: &mut CollisionInfo, forward: angle::Axis, along: i32, across: i32) {
    match forward {
        angle::Axis::X => {
            coll.shift.x = along;
            coll.shift.z = across;
        }
        angle::Axis::Z => {
            coll.shift.z = along;
            coll.shift.x = across;
        }
    }
}

fn fold_statics<G>(grid: &G, coll: &mut CollisionInfo, pos: WorldPos, room: RoomId, height: i32)
where
    G: SectorGrid + StaticGeometry + ?Sized,
{
    let body = BodyCylinder {
        pos,
        old: coll.old,
        radius: coll.radius,
        height,
        quadrant: coll.quadrant,
    };
    let Some(hit) = collide_statics(grid, &body, room, coll.static_margin) else {
        return;
    };
    coll.hit_static = true;
    coll.coll_type = hit.coll_type;

    let base = coll.shift;
    coll.shift.x = base.x + hit.shift_x;
    coll.shift.z = base.z + hit.shift_z;

    // Pushed somewhere the body cannot stand: push the other way instead.
    let moved = coll.shifted(pos);
    let check = sample(grid, moved.x, moved.z, moved.y, moved.y - height, room);
    if !coll.floor_in_bounds(check.floor) || coll.ceiling_blocks(check.ceiling) {
        coll.shift.x = base.x - hit.shift_x;
        coll.shift.z = base.z - hit.shift_z;
    }
}
