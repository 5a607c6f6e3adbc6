// Object kinds: data-driven per-kind configuration and collision routines.
//
// Every item is an instance of an object kind (`ObjectId`). What a kind
// does differently is data in `ObjectInfo`, kept in the `objects` table of
// `CoreConfig`: body radius and height, how it gets around, how bold it is,
// and which collision routine applies when the player touches it. The core
// has one `Item` type and one creature layer and reads per-kind values from
// the table rather than branching on the kind.
//
// The collision routine is the one behavioural seam that is code, not data.
// `BodyCollision` has one implementation per `CollisionKind`; the
// `ObjectTable` resolves each kind's routine once, when it is built, so the
// per-tick path is a table lookup.
//
// See also: `config.rs` (where the table lives), `push.rs` (what the
// routines call), `sim.rs` (`Core::player_collision`).
//
// **Critical constraint: determinism.** Object data is part of the config;
// identical configs mean identical per-kind behaviour.

use crate::collision::CollisionInfo;
use crate::config::CollisionDefaults;
use crate::item::Item;
use crate::level::Level;
use crate::nav::LocomotionClass;
use crate::push::{HitReaction, PushOptions, PushOutcome, push_body, test_bounds_collide};
use crate::types::ObjectId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Which collision routine an object kind uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CollisionKind {
    /// Never pushes the player (the player itself, pickups, effects).
    None,
    /// Shoves the player and can make it flinch.
    Creature,
    /// Solid block: shoves the player with its box grown by the player's
    /// radius, never causes a flinch.
    Object,
}

/// Data-driven parameters of one object kind.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub name: String,
    /// Gets a creature slot and runs AI when active.
    pub intelligent: bool,
    pub collision: CollisionKind,
    pub locomotion: LocomotionClass,
    pub radius: i32,
    /// Body height used when a creature's motion is probed.
    pub height: i32,
    /// Distance from the item origin to the jaw, for bite range.
    pub pivot_length: i32,
    pub hit_points: i16,
    /// Chance per tick (in control units) that an attacking creature re-aims
    /// at the enemy's current position and box; otherwise it keeps its
    /// previous goal.
    pub smartness: i32,
    /// Attacks when it can; timid kinds flee when hurt.
    pub violent: bool,
    /// Default turn limit per tick.
    pub turn_rate: i16,
}

/// A collision routine: what happens when the player touches an item.
pub trait BodyCollision: fmt::Debug + Sync {
    fn collide(
        &self,
        level: &Level,
        item: &Item,
        player: &mut Item,
        coll: &mut CollisionInfo,
        hit: &mut HitReaction,
        defaults: &CollisionDefaults,
    ) -> PushOutcome;
}

#[derive(Debug)]
pub struct NoCollision;

impl BodyCollision for NoCollision {
    fn collide(
        &self,
        _level: &Level,
        _item: &Item,
        _player: &mut Item,
        _coll: &mut CollisionInfo,
        _hit: &mut HitReaction,
        _defaults: &CollisionDefaults,
    ) -> PushOutcome {
        PushOutcome::Clear
    }
}

#[derive(Debug)]
pub struct CreatureCollision;

impl BodyCollision for CreatureCollision {
    fn collide(
        &self,
        level: &Level,
        item: &Item,
        player: &mut Item,
        coll: &mut CollisionInfo,
        hit: &mut HitReaction,
        defaults: &CollisionDefaults,
    ) -> PushOutcome {
        if !test_bounds_collide(item, player, coll.radius) || !coll.enable_push {
            return PushOutcome::Clear;
        }
        let opts = PushOptions {
            spaz: coll.enable_spaz,
            big_push: false,
            height: defaults.player_height,
            bad_neg: defaults.bad_neg,
            max_hit_frames: defaults.hit_frames,
        };
        push_body(level, item, player, coll, hit, opts)
    }
}

#[derive(Debug)]
pub struct ObjectCollision;

impl BodyCollision for ObjectCollision {
    fn collide(
        &self,
        level: &Level,
        item: &Item,
        player: &mut Item,
        coll: &mut CollisionInfo,
        hit: &mut HitReaction,
        defaults: &CollisionDefaults,
    ) -> PushOutcome {
        if !test_bounds_collide(item, player, coll.radius) || !coll.enable_push {
            return PushOutcome::Clear;
        }
        let opts = PushOptions {
            spaz: false,
            big_push: true,
            height: defaults.player_height,
            bad_neg: defaults.bad_neg,
            max_hit_frames: defaults.hit_frames,
        };
        push_body(level, item, player, coll, hit, opts)
    }
}

static NO_COLLISION: NoCollision = NoCollision;
static CREATURE_COLLISION: CreatureCollision = CreatureCollision;
static OBJECT_COLLISION: ObjectCollision = ObjectCollision;

impl CollisionKind {
    pub fn routine(self) -> &'static dyn BodyCollision {
        match self {
            CollisionKind::None => &NO_COLLISION,
            CollisionKind::Creature => &CREATURE_COLLISION,
            CollisionKind::Object => &OBJECT_COLLISION,
        }
    }
}

/// Object kinds by id, with each kind's collision routine resolved.
#[derive(Debug, Default)]
pub struct ObjectTable {
    infos: BTreeMap<ObjectId, ObjectInfo>,
    routines: BTreeMap<ObjectId, &'static dyn BodyCollision>,
}

impl ObjectTable {
    pub fn new(objects: &[ObjectInfo]) -> ObjectTable {
        let mut table = ObjectTable::default();
        for info in objects {
            table.routines.insert(info.id, info.collision.routine());
            table.infos.insert(info.id, info.clone());
        }
        table
    }

    pub fn info(&self, id: ObjectId) -> Option<&ObjectInfo> {
        self.infos.get(&id)
    }

    /// Collision routine for a kind. Unknown kinds never collide.
    pub fn collision(&self, id: ObjectId) -> &'static dyn BodyCollision {
        self.routines.get(&id).copied().unwrap_or(&NO_COLLISION)
    }

    pub fn is_intelligent(&self, id: ObjectId) -> bool {
        self.info(id).is_some_and(|info| info.intelligent)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::nav::ZoneTables;
    use crate::level::Room;
    use crate::types::{BoundingBox, ItemId, RoomId, WorldPos};

    fn item(id: u16, pos: WorldPos, bounds: BoundingBox) -> Item {
        Item {
            id: ItemId(id),
            object: ObjectId(id),
            pos,
            yaw: 0,
            room: RoomId(0),
            box_id: None,
            speed: 0,
            fall_speed: 0,
            hit_points: 1,
            status: Default::default(),
            hit_status: false,
            collidable: true,
            creature: None,
            bounds,
        }
    }

    fn level() -> Level {
        Level::new(vec![Room::open(0, 0, 8, 8, 0, -4096)], Vec::new(), ZoneTables::empty(), Vec::new()).unwrap()
    }

    #[test]
    fn table_resolves_routines_from_config() {
        let table = ObjectTable::new(&CoreConfig::default().objects);
        assert_eq!(format!("{:?}", table.collision(ObjectId(0))), "NoCollision");
        assert_eq!(format!("{:?}", table.collision(ObjectId(1))), "CreatureCollision");
        assert_eq!(format!("{:?}", table.collision(ObjectId(4))), "ObjectCollision");
        assert_eq!(format!("{:?}", table.collision(ObjectId(999))), "NoCollision");
        assert!(table.is_intelligent(ObjectId(1)));
        assert!(!table.is_intelligent(ObjectId(4)));
    }

    #[test]
    fn creature_routine_pushes_and_flinches() {
        let level = level();
        let defaults = CollisionDefaults::default();
        let wolf = item(1, WorldPos::new(3000, 0, 3000), BoundingBox::new(-200, 200, -400, 0, -300, 300));
        let mut player = item(0, WorldPos::new(3150, 0, 3000), BoundingBox::new(-100, 100, -762, 0, -100, 100));
        let mut coll = CollisionInfo::from_defaults(&defaults);
        coll.old = WorldPos::new(3300, 0, 3000);
        let mut hit = HitReaction::default();
        let out = CollisionKind::Creature
            .routine()
            .collide(&level, &wolf, &mut player, &mut coll, &mut hit, &defaults);
        assert_eq!(out, PushOutcome::Pushed);
        assert_eq!(hit.frame, 1);
    }

    #[test]
    fn push_disabled_leaves_player_alone() {
        let level = level();
        let defaults = CollisionDefaults::default();
        let wolf = item(1, WorldPos::new(3000, 0, 3000), BoundingBox::new(-200, 200, -400, 0, -300, 300));
        let mut player = item(0, WorldPos::new(3150, 0, 3000), BoundingBox::new(-100, 100, -762, 0, -100, 100));
        let mut coll = CollisionInfo::from_defaults(&defaults);
        coll.enable_push = false;
        let mut hit = HitReaction::default();
        let out = CreatureCollision.collide(&level, &wolf, &mut player, &mut coll, &mut hit, &defaults);
        assert_eq!(out, PushOutcome::Clear);
        assert_eq!(player.pos.x, 3150);
    }

    #[test]
    fn object_routine_never_flinches() {
        let level = level();
        let defaults = CollisionDefaults::default();
        let block = item(4, WorldPos::new(3584, 0, 3584), BoundingBox::new(-512, 512, -1024, 0, -512, 512));
        let mut player = item(0, WorldPos::new(4150, 0, 3584), BoundingBox::new(-100, 100, -762, 0, -100, 100));
        let mut coll = CollisionInfo::from_defaults(&defaults);
        coll.old = WorldPos::new(4250, 0, 3584);
        let mut hit = HitReaction::default();
        let out = ObjectCollision.collide(&level, &block, &mut player, &mut coll, &mut hit, &defaults);
        assert_eq!(out, PushOutcome::Pushed);
        assert_eq!(player.pos.x, 3584 + 512 + 100);
        assert_eq!(hit.frame, 0);
    }
}
