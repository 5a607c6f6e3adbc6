// Navigation boxes and reachability zones.
//
// The navigation graph is coarse: one `NavBox` per axis-aligned patch of
// walkable floor (several sectors sharing one height), connected to the
// boxes it overlaps at its edges. Creatures never path over sectors, only
// over boxes; the per-creature search state over this graph is the LOT in
// `lot.rs`.
//
// `ZoneTables` partitions the boxes into zones per locomotion class and per
// flip state. Two boxes are mutually reachable for a class iff their zone
// ids in that class's table match. Transient blocking (a box temporarily
// occupied by a pushable block) is deliberately not reflected in zones; the
// LOT search and the targeting layer check `NavBox::blocked` themselves.
//
// Levels may ship precomputed zone tables (`ZoneTables::from_tables`) or
// have them derived here by flood fill over the overlap graph, limited by
// each class's step and drop.
//
// All storage is `Vec` indexed by `BoxId`; no `HashMap`.
//
// See also: `lot.rs` (frontier search and steering), `level.rs` (which owns
// the boxes and tables), `targeting.rs` (zone-based reachability per tick).
//
// **Critical constraint: determinism.** Flood fill visits boxes in index
// order and neighbors in overlap-list order, so zone ids are a pure function
// of the box list.

use crate::error::LevelError;
use crate::types::{BoxId, STEP_L, WALL_L, WorldPos, ZoneId};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::VecDeque;

/// How a creature gets around, which bounds the height changes it can make
/// between neighboring boxes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LocomotionClass {
    /// Ground creatures that can step up one click and drop two.
    Walk,
    /// Ground creatures that scramble up two clicks and drop a full sector.
    Climb,
    /// Flyers and swimmers: any height change.
    Fly,
}

impl LocomotionClass {
    pub const ALL: [LocomotionClass; 3] = [
        LocomotionClass::Walk,
        LocomotionClass::Climb,
        LocomotionClass::Fly,
    ];

    pub fn index(self) -> usize {
        match self {
            LocomotionClass::Walk => 0,
            LocomotionClass::Climb => 1,
            LocomotionClass::Fly => 2,
        }
    }

    /// Largest rise (positive) between neighboring boxes.
    pub fn step(self) -> i32 {
        match self {
            LocomotionClass::Walk => STEP_L,
            LocomotionClass::Climb => STEP_L * 2,
            LocomotionClass::Fly => WALL_L * 20,
        }
    }

    /// Deepest drop (negative) between neighboring boxes.
    pub fn drop(self) -> i32 {
        match self {
            LocomotionClass::Walk => -STEP_L * 2,
            LocomotionClass::Climb => -WALL_L,
            LocomotionClass::Fly => -WALL_L * 20,
        }
    }

    pub fn flies(self) -> bool {
        self == LocomotionClass::Fly
    }

    /// Whether a body of this class may move from a box with floor `from`
    /// to one with floor `to`. Y is down, so a rise is `from - to`.
    pub fn can_traverse(self, from: i32, to: i32) -> bool {
        let rise = from - to;
        rise <= self.step() && rise >= self.drop()
    }
}

/// A navigation node: a rectangle of floor at one height.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavBox {
    pub x_min: i32,
    pub x_max: i32,
    pub z_min: i32,
    pub z_max: i32,
    /// Floor height of the box.
    pub height: i32,
    /// Boxes sharing an edge with this one.
    pub overlaps: SmallVec<[BoxId; 6]>,
    /// Can be blocked by a movable object.
    pub blockable: bool,
    /// Currently blocked (set and cleared by the trigger interpreter).
    pub blocked: bool,
}

impl NavBox {
    pub fn new(x_min: i32, x_max: i32, z_min: i32, z_max: i32, height: i32) -> NavBox {
        NavBox {
            x_min,
            x_max,
            z_min,
            z_max,
            height,
            overlaps: SmallVec::new(),
            blockable: false,
            blocked: false,
        }
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.x_min && x <= self.x_max && z >= self.z_min && z <= self.z_max
    }

    pub fn center(&self) -> WorldPos {
        WorldPos::new(
            (self.x_min + self.x_max) / 2,
            self.height,
            (self.z_min + self.z_max) / 2,
        )
    }
}

/// Link two boxes as mutual neighbors.
pub fn link_boxes(boxes: &mut [NavBox], a: BoxId, b: BoxId) {
    if let Some(nav_box) = boxes.get_mut(a.index()) {
        if !nav_box.overlaps.contains(&b) {
            nav_box.overlaps.push(b);
        }
    }
    if let Some(nav_box) = boxes.get_mut(b.index()) {
        if !nav_box.overlaps.contains(&a) {
            nav_box.overlaps.push(a);
        }
    }
}

const TABLE_NAMES: [[&str; 2]; 3] = [
    ["walk", "walk_flipped"],
    ["climb", "climb_flipped"],
    ["fly", "fly_flipped"],
];

/// Box-to-zone maps, indexed `[locomotion class][flip state]`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneTables {
    tables: [[Vec<ZoneId>; 2]; 3],
}

impl ZoneTables {
    /// Tables for a level with no boxes.
    pub fn empty() -> ZoneTables {
        ZoneTables::default()
    }

    /// Precomputed tables, each `[normal, flipped]`.
    pub fn from_tables(
        walk: [Vec<ZoneId>; 2],
        climb: [Vec<ZoneId>; 2],
        fly: [Vec<ZoneId>; 2],
    ) -> ZoneTables {
        ZoneTables {
            tables: [walk, climb, fly],
        }
    }

    pub fn get(&self, class: LocomotionClass, flipped: bool) -> &[ZoneId] {
        &self.tables[class.index()][flipped as usize]
    }

    pub fn zone_of(&self, class: LocomotionClass, flipped: bool, box_id: BoxId) -> Option<ZoneId> {
        self.get(class, flipped).get(box_id.index()).copied()
    }

    /// Whether `a` and `b` are in one zone for `class`. Unknown boxes are
    /// never reachable.
    pub fn same_zone(&self, class: LocomotionClass, flipped: bool, a: BoxId, b: BoxId) -> bool {
        match (
            self.zone_of(class, flipped, a),
            self.zone_of(class, flipped, b),
        ) {
            (Some(za), Some(zb)) => za == zb,
            _ => false,
        }
    }

    pub(crate) fn check_len(&self, box_count: usize) -> Result<(), LevelError> {
        for class in LocomotionClass::ALL {
            for flip in [false, true] {
                let len = self.get(class, flip).len();
                if len != box_count {
                    return Err(LevelError::ZoneTableLength {
                        table: TABLE_NAMES[class.index()][flip as usize],
                        expected: box_count,
                        actual: len,
                    });
                }
            }
        }
        Ok(())
    }

    /// Derive every table by flood fill. Boxes in `flip_closed` are sealed
    /// off (a zone of their own) in the flipped variants.
    pub fn flood_fill(boxes: &[NavBox], flip_closed: &[BoxId]) -> ZoneTables {
        let mut tables = ZoneTables::default();
        for class in LocomotionClass::ALL {
            tables.tables[class.index()][0] = flood_fill_class(boxes, class, &[]);
            tables.tables[class.index()][1] = flood_fill_class(boxes, class, flip_closed);
        }
        tables
    }
}

/// Zone ids for one class: connected components of the graph whose edges
/// are overlaps passable in both directions.
fn flood_fill_class(boxes: &[NavBox], class: LocomotionClass, closed: &[BoxId]) -> Vec<ZoneId> {
    let mut zones: Vec<Option<ZoneId>> = vec![None; boxes.len()];
    let mut queue = VecDeque::new();
    let mut next_zone = 0u16;

    for start in 0..boxes.len() {
        if zones[start].is_some() {
            continue;
        }
        let zone = ZoneId(next_zone);
        next_zone = next_zone.wrapping_add(1);
        zones[start] = Some(zone);
        if closed.contains(&BoxId(start as u16)) {
            continue;
        }
        queue.push_back(start);

        while let Some(current) = queue.pop_front() {
            let here = &boxes[current];
            for &neighbor in &here.overlaps {
                let n = neighbor.index();
                if n >= boxes.len() || zones[n].is_some() || closed.contains(&neighbor) {
                    continue;
                }
                let there = &boxes[n];
                if class.can_traverse(here.height, there.height)
                    && class.can_traverse(there.height, here.height)
                {
                    zones[n] = Some(zone);
                    queue.push_back(n);
                }
            }
        }
    }

    zones.into_iter().map(|z| z.unwrap_or(ZoneId(0))).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Three boxes in a row: 0 and 1 level, 2 a sector-high ledge above 1.
    fn ledge() -> Vec<NavBox> {
        let mut boxes = vec![
            NavBox::new(0, 1023, 0, 1023, 0),
            NavBox::new(1024, 2047, 0, 1023, 0),
            NavBox::new(2048, 3071, 0, 1023, -WALL_L),
        ];
        link_boxes(&mut boxes, BoxId(0), BoxId(1));
        link_boxes(&mut boxes, BoxId(1), BoxId(2));
        boxes
    }

    #[test]
    fn step_and_drop_limits() {
        let walk = LocomotionClass::Walk;
        assert!(walk.can_traverse(0, -STEP_L));
        assert!(!walk.can_traverse(0, -STEP_L - 1));
        assert!(walk.can_traverse(0, STEP_L * 2));
        assert!(!walk.can_traverse(0, STEP_L * 2 + 1));
        assert!(LocomotionClass::Fly.can_traverse(0, -WALL_L * 10));
    }

    #[test]
    fn flood_fill_splits_ledge_for_walkers_only() {
        let boxes = ledge();
        let zones = ZoneTables::flood_fill(&boxes, &[]);
        let walk = LocomotionClass::Walk;
        assert!(zones.same_zone(walk, false, BoxId(0), BoxId(1)));
        assert!(!zones.same_zone(walk, false, BoxId(1), BoxId(2)));
        assert!(!zones.same_zone(LocomotionClass::Climb, false, BoxId(1), BoxId(2)));
        assert!(zones.same_zone(LocomotionClass::Fly, false, BoxId(0), BoxId(2)));
    }

    #[test]
    fn flip_closed_box_is_isolated_in_flipped_tables() {
        let boxes = ledge();
        let zones = ZoneTables::flood_fill(&boxes, &[BoxId(1)]);
        let fly = LocomotionClass::Fly;
        assert!(zones.same_zone(fly, false, BoxId(0), BoxId(2)));
        assert!(!zones.same_zone(fly, true, BoxId(0), BoxId(2)));
        assert!(!zones.same_zone(fly, true, BoxId(0), BoxId(1)));
    }

    #[test]
    fn blocked_flag_does_not_change_zones() {
        let mut boxes = ledge();
        let before = ZoneTables::flood_fill(&boxes, &[]);
        boxes[1].blocked = true;
        let after = ZoneTables::flood_fill(&boxes, &[]);
        assert_eq!(before, after);
    }

    #[test]
    fn unknown_box_is_never_same_zone() {
        let zones = ZoneTables::flood_fill(&ledge(), &[]);
        assert!(!zones.same_zone(LocomotionClass::Walk, false, BoxId(0), BoxId(40)));
    }

    #[test]
    fn check_len_names_table() {
        let zones = ZoneTables::flood_fill(&ledge(), &[]);
        zones.check_len(3).unwrap();
        let err = zones.check_len(4).unwrap_err();
        assert!(matches!(err, LevelError::ZoneTableLength { table: "walk", .. }));
    }

    #[test]
    fn link_is_symmetric_and_idempotent() {
        let mut boxes = ledge();
        link_boxes(&mut boxes, BoxId(0), BoxId(1));
        assert_eq!(boxes[0].overlaps.as_slice(), &[BoxId(1)]);
        assert_eq!(boxes[1].overlaps.as_slice(), &[BoxId(0), BoxId(2)]);
    }

    #[test]
    fn zone_ids_are_deterministic() {
        let a = ZoneTables::flood_fill(&ledge(), &[]);
        let b = ZoneTables::flood_fill(&ledge(), &[]);
        assert_eq!(a, b);
        assert_eq!(a.get(LocomotionClass::Walk, false), &[ZoneId(0), ZoneId(0), ZoneId(1)]);
    }
}
