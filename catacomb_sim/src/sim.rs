// The spatial core: level, items, creature slots and the tick loop.
//
// `Core` owns everything the spatial layer reads or mutates: the config,
// the level geometry and nav graph, the object-kind table, every item, the
// creature slot pool, the camera position (for slot eviction) and the
// control PRNG. It is single-threaded: each operation runs to completion on
// one item before the next begins.
//
// ## Tick loop
//
// `TickClock` turns elapsed wall time into whole logic ticks; leftover
// milliseconds carry into the next `advance`. Each tick runs the control
// function of every active item, non-intelligent items (blocks, traps)
// first and then creatures, each group in the order the items were
// activated. Control functions are supplied by the caller; the core ships
// `run_creature`, a plain chase-and-wander script built from the targeting
// primitives.
//
// ## Creature entry points
//
// Every `creature_*` method looks the item's slot up first and returns
// early (`None`, 0 or no-op) when the item holds none, e.g. because it was
// evicted earlier in the same tick.
//
// ## Saves
//
// `snapshot_slots` writes the durable part of each slot; `restore_slots`
// re-activates each creature (rebuilding its LOT from scratch) and applies
// the saved fields.
//
// See also: `slots.rs`, `targeting.rs`, `collision.rs`, `object.rs`.
//
// **Critical constraint: determinism.** All iteration is in index or
// insertion order and all randomness comes from `Core::rng`.

use crate::angle;
use crate::collision::{CollType, CollisionInfo, probe};
use crate::config::CoreConfig;
use crate::error::ConfigError;
use crate::item::{ItemStatus, ItemTable};
use crate::level::{Level, SectorGrid};
use crate::lot::TargetType;
use crate::neighbors::nearby_rooms;
use crate::object::ObjectTable;
use crate::push::{HitReaction, PushOutcome};
use crate::slots::{SlotContext, SlotPool, SlotSnapshot};
use crate::targeting::{self, AiInfo, MoodContext};
use crate::types::{BoundingBox, ItemId, ObjectId, RoomId, SlotId, WALL_L, WorldPos};
use catacomb_prng::ControlRng;

/// Hit points given to dead creatures so nothing targets them again.
pub const DONT_TARGET: i16 = -16384;

/// Items farther than this on either horizontal axis are not tested
/// against the player.
const COLLISION_RANGE: i32 = WALL_L * 4;

/// Accumulates elapsed time into fixed logic ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TickClock {
    tick_ms: u32,
    pending_ms: u64,
}

impl TickClock {
    pub fn new(tick_ms: u32) -> TickClock {
        TickClock {
            tick_ms: tick_ms.max(1),
            pending_ms: 0,
        }
    }

    /// Add `elapsed_ms` and return how many whole ticks are now due.
    pub fn advance(&mut self, elapsed_ms: u64) -> u64 {
        self.pending_ms += elapsed_ms;
        let ticks = self.pending_ms / self.tick_ms as u64;
        self.pending_ms %= self.tick_ms as u64;
        ticks
    }

    pub fn pending_ms(&self) -> u64 {
        self.pending_ms
    }
}

pub struct Core {
    pub config: CoreConfig,
    pub level: Level,
    pub objects: ObjectTable,
    pub items: ItemTable,
    pub slots: SlotPool,
    pub camera: WorldPos,
    pub rng: ControlRng,
    /// The player's flinch state.
    pub hit: HitReaction,
    active: Vec<ItemId>,
    clock: TickClock,
    tick: u64,
}

impl Core {
    pub fn new(config: CoreConfig, level: Level, seed: u32) -> Result<Core, ConfigError> {
        config.validate()?;
        tracing::debug!(
            rooms = level.rooms.len(),
            boxes = level.boxes.len(),
            slots = config.max_creatures,
            "spatial core created"
        );
        Ok(Core {
            objects: ObjectTable::new(&config.objects),
            slots: SlotPool::new(config.max_creatures),
            clock: TickClock::new(config.tick_duration_ms),
            config,
            level,
            items: ItemTable::new(),
            camera: WorldPos::ZERO,
            rng: ControlRng::new(seed),
            hit: HitReaction::default(),
            active: Vec::new(),
            tick: 0,
        })
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Active items in activation order.
    pub fn active(&self) -> &[ItemId] {
        &self.active
    }

    /// Place an item of kind `object`, taking hit points and body size from
    /// the object table.
    /// Place a new item. An unknown `room` falls back to the first room
    /// whose footprint contains `pos`.
    pub fn add_item(&mut self, object: ObjectId, pos: WorldPos, room: RoomId, yaw: i16) -> ItemId {
        let room = match self.level.room(room) {
            Some(_) => room,
            None => self.level.room_containing(pos.x, pos.z).unwrap_or(room),
        };
        let id = self.items.add(object, pos, room, yaw);
        let info = self.objects.info(object);
        if let Some(item) = self.items.get_mut(id) {
            if let Some(info) = info {
                item.hit_points = info.hit_points;
                let r = info.radius;
                item.bounds = BoundingBox::new(-r, r, -info.height, 0, -r, r);
            }
            item.box_id = self.level.box_at(pos, room);
        }
        id
    }

    /// Mark `item` active and append it to the tick order.
    pub fn activate_item(&mut self, item: ItemId) {
        let Some(body) = self.items.get_mut(item) else {
            return;
        };
        if body.status == ItemStatus::Deactivated {
            return;
        }
        body.status = ItemStatus::Active;
        if !self.active.contains(&item) {
            self.active.push(item);
        }
    }

    pub fn deactivate_item(&mut self, item: ItemId) {
        self.active.retain(|&i| i != item);
    }

    /// Give `item` a creature slot, evicting a far-away creature if the
    /// pool is full. `always` evicts even when everyone is closer.
    pub fn enable_creature_ai(&mut self, item: ItemId, always: bool) -> bool {
        let ctx = SlotContext {
            level: &self.level,
            objects: &self.objects,
            camera: self.camera,
            distance_shift: self.config.camera_distance_shift,
        };
        self.slots.enable(&mut self.items, item, always, &ctx)
    }

    pub fn disable_creature_ai(&mut self, item: ItemId) -> bool {
        self.slots.disable(&mut self.items, item)
    }

    /// Kill a creature: release its slot, stop it colliding and drop it
    /// from the tick order.
    pub fn creature_die(&mut self, item: ItemId) {
        self.disable_creature_ai(item);
        self.deactivate_item(item);
        if let Some(body) = self.items.get_mut(item) {
            body.hit_points = DONT_TARGET;
            body.collidable = false;
            body.status = ItemStatus::Deactivated;
            tracing::debug!(item = item.0, "creature died");
        }
    }

    /// Switch between the normal and flipped geometry state. Reachability
    /// reads the matching zone tables from the next query on.
    pub fn toggle_flipmap(&mut self) -> bool {
        self.level.flipped = !self.level.flipped;
        tracing::debug!(flipped = self.level.flipped, "flip map toggled");
        self.level.flipped
    }

    /// Whether `item` holds a creature slot this tick. An item evicted to
    /// `Invisible` asks for a slot again and turns `Active` once it has one.
    pub fn creature_active(&mut self, item: ItemId) -> bool {
        let Some(status) = self.items.get(item).map(|i| i.status) else {
            return false;
        };
        match status {
            ItemStatus::Deactivated => return false,
            ItemStatus::Invisible => {
                if !self.enable_creature_ai(item, false) {
                    return false;
                }
                if let Some(body) = self.items.get_mut(item) {
                    body.status = ItemStatus::Active;
                }
                tracing::debug!(item = item.0, "evicted creature regained a slot");
            }
            ItemStatus::Inactive | ItemStatus::Active => {}
        }
        self.slot_of(item).is_some()
    }

    fn slot_of(&self, item: ItemId) -> Option<SlotId> {
        self.slots.slot_of(&self.items, item)
    }

    /// Probe the player at its current position, apply the correction, then
    /// let every nearby collidable item push it. `coll.old` must hold the
    /// player's position before this tick's movement and `coll.facing` its
    /// direction of travel.
    pub fn player_collision(&mut self, coll: &mut CollisionInfo) -> CollType {
        let Some(player_id) = self.items.player_id() else {
            return CollType::None;
        };
        let height = self.config.collision.player_height;
        let Some(player) = self.items.get_mut(player_id) else {
            return CollType::None;
        };

        probe(&self.level, coll, player.pos, player.room, height);
        player.pos = coll.shifted(player.pos);
        let mut room = player.room;
        self.level
            .resolve_sector(WorldPos::new(player.pos.x, player.pos.y - 10, player.pos.z), &mut room);
        player.room = room;
        let coll_type = coll.coll_type;

        if !coll.enable_push {
            return coll_type;
        }
        let center = player.pos;
        let rooms = nearby_rooms(&self.level, center, coll.radius, height, room);
        let nearby: Vec<ItemId> = self
            .items
            .iter()
            .filter(|i| {
                i.id != player_id
                    && i.collidable
                    && i.status != ItemStatus::Invisible
                    && rooms.contains(&i.room)
                    && (i.pos.x - center.x).abs() < COLLISION_RANGE
                    && (i.pos.z - center.z).abs() < COLLISION_RANGE
                    && (i.pos.y - center.y).abs() < COLLISION_RANGE
            })
            .map(|i| i.id)
            .collect();

        for other_id in nearby {
            let Some(other_object) = self.items.get(other_id).map(|i| i.object) else {
                continue;
            };
            let routine = self.objects.collision(other_object);
            let Some((player, other)) = self.items.pair_mut(player_id, other_id) else {
                continue;
            };
            let outcome = routine.collide(&self.level, other, player, coll, &mut self.hit, &self.config.collision);
            if outcome != PushOutcome::Clear {
                tracing::trace!(item = other_id.0, ?outcome, "player pushed");
            }
        }
        coll_type
    }

    /// Pick an enemy for `item` among the player and active items of the
    /// same kind, and store it on the creature.
    pub fn select_creature_target(&mut self, item: ItemId) -> Option<ItemId> {
        let slot = self.slot_of(item)?;
        let body = self.items.get(item)?;
        let current = self.slots.get(slot)?.enemy;
        let kin = self
            .active
            .iter()
            .filter_map(|&id| self.items.get(id))
            .filter(|o| o.object == body.object && o.status == ItemStatus::Active && !self.items.is_player(o.id));
        let chosen = targeting::select_target(
            body,
            current,
            self.items.player().into_iter().chain(kin),
            self.config.target_distance_shift,
            self.config.target_hysteresis,
        );
        if let Some(state) = self.slots.get_mut(slot) {
            state.enemy = chosen;
        }
        chosen
    }

    /// Measure the creature's enemy (the player when it has none) and
    /// refresh both items' boxes.
    pub fn creature_info(&mut self, item: ItemId) -> Option<AiInfo> {
        let slot = self.slot_of(item)?;
        let state = self.slots.get(slot)?;
        let enemy_id = state.enemy.or(self.items.player_id())?;
        let body = self.items.get(item)?;
        let enemy = self.items.get(enemy_id)?;
        let pivot = self.objects.info(body.object).map_or(0, |i| i.pivot_length);
        let ai = targeting::creature_ai_info(&self.level, &state.lot, body, enemy, pivot);

        if let Some(body) = self.items.get_mut(item) {
            body.box_id = ai.creature_box;
        }
        if let Some(enemy) = self.items.get_mut(enemy_id) {
            enemy.box_id = ai.enemy_box;
        }
        Some(ai)
    }

    /// Run the mood state machine for `item` and update its steering point.
    pub fn creature_mood(&mut self, item: ItemId, ai: &AiInfo) -> Option<TargetType> {
        let slot = self.slot_of(item)?;
        let body = self.items.get(item)?;
        let info = self.objects.info(body.object)?;
        let state = self.slots.get_mut(slot)?;
        let enemy = state
            .enemy
            .or(self.items.player_id())
            .and_then(|id| self.items.get(id));
        let ctx = MoodContext {
            level: &self.level,
            config: &self.config,
            info,
        };
        Some(targeting::creature_mood(&ctx, &mut self.rng, body, enemy, state, ai))
    }

    /// Turn `item` toward its steering point. Returns the turn applied.
    pub fn creature_turn(&mut self, item: ItemId, maximum_turn: i16) -> i16 {
        let Some(slot) = self.slot_of(item) else {
            return 0;
        };
        let Some(target) = self.slots.get(slot).map(|s| s.target) else {
            return 0;
        };
        match self.items.get_mut(item) {
            Some(body) => targeting::creature_turn(body, target, maximum_turn),
            None => 0,
        }
    }

    pub fn creature_head(&mut self, item: ItemId, required: i16) {
        let Some(slot) = self.slot_of(item) else {
            return;
        };
        if let Some(state) = self.slots.get_mut(slot) {
            targeting::creature_head(state, required, self.config.max_head_change, self.config.head_arc);
        }
    }

    /// Move `item` to `proposed` through the probe under its LOT's limits.
    pub fn creature_step(&mut self, item: ItemId, proposed: WorldPos) -> Option<CollType> {
        let slot = self.slot_of(item)?;
        let state = self.slots.get(slot)?;
        let body = self.items.get_mut(item)?;
        let (radius, height) = self
            .objects
            .info(body.object)
            .map_or((0, 0), |i| (i.radius, i.height));
        Some(targeting::creature_step(&self.level, body, &state.lot, proposed, radius, height))
    }

    /// A minimal behaviour script: pick an enemy, update mood and steering,
    /// turn, track with the head and walk forward at the item's speed.
    pub fn run_creature(&mut self, item: ItemId) {
        if !self.creature_active(item) {
            return;
        }
        self.select_creature_target(item);
        let Some(ai) = self.creature_info(item) else {
            return;
        };
        self.creature_mood(item, &ai);

        let turn = self
            .slot_of(item)
            .and_then(|s| self.slots.get(s))
            .map_or(0, |s| s.maximum_turn);
        self.creature_turn(item, turn);
        self.creature_head(item, if ai.ahead { ai.angle } else { 0 });

        let Some(body) = self.items.get(item) else {
            return;
        };
        let dx = (angle::sin(body.yaw) * body.speed) >> angle::TRIG_SHIFT;
        let dz = (angle::cos(body.yaw) * body.speed) >> angle::TRIG_SHIFT;
        let proposed = WorldPos::new(body.pos.x + dx, body.pos.y, body.pos.z + dz);
        self.creature_step(item, proposed);
    }

    /// Durable state of every occupied slot, in slot order.
    pub fn snapshot_slots(&self) -> Vec<SlotSnapshot> {
        self.slots.iter().map(|(_, s)| s.snapshot()).collect()
    }

    /// Re-activate every saved creature and apply its saved fields. Returns
    /// how many were restored.
    pub fn restore_slots(&mut self, snapshots: &[SlotSnapshot]) -> usize {
        let mut restored = 0;
        for snapshot in snapshots {
            if !self.enable_creature_ai(snapshot.item, true) {
                continue;
            }
            let Some(slot) = self.slot_of(snapshot.item) else {
                continue;
            };
            if let Some(state) = self.slots.get_mut(slot) {
                state.apply(snapshot);
                restored += 1;
            }
        }
        tracing::debug!(restored, saved = snapshots.len(), "creature slots restored");
        restored
    }

    /// Run one logic tick: `control` is called for every active item,
    /// non-intelligent items first, each group in activation order.
    pub fn step<F>(&mut self, mut control: F)
    where
        F: FnMut(&mut Core, ItemId),
    {
        let order: Vec<ItemId> = {
            let (plain, thinking): (Vec<ItemId>, Vec<ItemId>) = self
                .active
                .iter()
                .copied()
                .filter(|&id| self.items.get(id).is_some())
                .partition(|&id| {
                    self.items
                        .get(id)
                        .is_some_and(|i| !self.objects.is_intelligent(i.object))
                });
            plain.into_iter().chain(thinking).collect()
        };
        for id in order {
            // A control function may have removed a later item.
            if !self.active.contains(&id) {
                continue;
            }
            control(self, id);
            if let Some(body) = self.items.get_mut(id) {
                body.hit_status = false;
            }
        }
        self.tick += 1;
    }

    /// Feed elapsed time to the tick clock and run every tick now due.
    /// Returns the number of ticks run.
    pub fn advance<F>(&mut self, elapsed_ms: u64, mut control: F) -> u64
    where
        F: FnMut(&mut Core, ItemId),
    {
        let due = self.clock.advance(elapsed_ms);
        for _ in 0..due {
            self.step(&mut control);
        }
        due
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::ANGLE_90;
    use crate::level::Room;
    use crate::nav::{NavBox, link_boxes};
    use crate::slots::Mood;
    use crate::types::BoxId;

    fn arena() -> Level {
        let mut room = Room::open(0, 0, 16, 16, 0, -4096);
        for ix in 1..15u16 {
            for iz in 1..15u16 {
                if let Some(s) = room.sector_mut(ix, iz) {
                    s.box_id = Some(BoxId(if ix < 8 { 0 } else { 1 }));
                }
            }
        }
        let mut boxes = vec![
            NavBox::new(1024, 8191, 1024, 15359, 0),
            NavBox::new(8192, 15359, 1024, 15359, 0),
        ];
        link_boxes(&mut boxes, BoxId(0), BoxId(1));
        Level::with_flood_zones(vec![room], boxes, Vec::new(), &[]).unwrap()
    }

    fn core() -> Core {
        let mut core = Core::new(CoreConfig::default(), arena(), 42).unwrap();
        let player = core.add_item(ObjectId(0), WorldPos::new(12000, 0, 8000), RoomId(0), 0);
        core.items.set_player(player);
        core.activate_item(player);
        core
    }

    fn wolf(core: &mut Core, pos: WorldPos) -> ItemId {
        let id = core.add_item(ObjectId(1), pos, RoomId(0), 0);
        core.activate_item(id);
        assert!(core.enable_creature_ai(id, false));
        id
    }

    #[test]
    fn tick_clock_carries_remainder() {
        let mut clock = TickClock::new(33);
        assert_eq!(clock.advance(20), 0);
        assert_eq!(clock.advance(20), 1);
        assert_eq!(clock.pending_ms(), 7);
        assert_eq!(clock.advance(100), 3);
        assert_eq!(clock.pending_ms(), 8);
    }

    #[test]
    fn new_rejects_invalid_config() {
        let config = CoreConfig {
            max_creatures: 0,
            ..CoreConfig::default()
        };
        assert!(Core::new(config, arena(), 1).is_err());
    }

    #[test]
    fn add_item_takes_object_data() {
        let mut core = core();
        let id = core.add_item(ObjectId(1), WorldPos::new(3000, 0, 3000), RoomId(0), 0);
        let item = core.items.get(id).unwrap();
        assert_eq!(item.hit_points, 6);
        assert_eq!(item.bounds, BoundingBox::new(-340, 340, -400, 0, -340, 340));
        assert_eq!(item.box_id, Some(BoxId(0)));
    }

    #[test]
    fn add_item_finds_room_when_given_unknown_one() {
        let mut core = core();
        let id = core.add_item(ObjectId(1), WorldPos::new(9000, 0, 3000), RoomId(7), 0);
        let item = core.items.get(id).unwrap();
        assert_eq!(item.room, RoomId(0));
        assert_eq!(item.box_id, Some(BoxId(1)));

        // Outside every room: the given id is kept.
        let lost = core.add_item(ObjectId(1), WorldPos::new(-5000, 0, 3000), RoomId(7), 0);
        assert_eq!(core.items.get(lost).unwrap().room, RoomId(7));
    }

    #[test]
    fn statics_run_before_creatures() {
        let mut core = core();
        let w = wolf(&mut core, WorldPos::new(3000, 0, 3000));
        let block = core.add_item(ObjectId(4), WorldPos::new(5000, 0, 5000), RoomId(0), 0);
        core.activate_item(block);

        let mut seen = Vec::new();
        core.step(|_, id| seen.push(id));
        let player = core.items.player_id().unwrap();
        assert_eq!(seen, vec![player, block, w]);
        assert_eq!(core.tick(), 1);
    }

    #[test]
    fn advance_runs_due_ticks() {
        let mut core = core();
        let mut calls = 0;
        let ran = core.advance(100, |_, _| calls += 1);
        assert_eq!(ran, 3);
        assert_eq!(calls, 3);
        assert_eq!(core.tick(), 3);
    }

    #[test]
    fn creature_die_releases_everything() {
        let mut core = core();
        let w = wolf(&mut core, WorldPos::new(3000, 0, 3000));
        assert_eq!(core.slots.used(), 1);
        core.creature_die(w);
        assert_eq!(core.slots.used(), 0);
        let item = core.items.get(w).unwrap();
        assert_eq!(item.status, ItemStatus::Deactivated);
        assert!(!item.collidable);
        assert!(item.is_dead());
        assert!(!core.active().contains(&w));
        // Dead items never come back.
        core.activate_item(w);
        assert!(!core.active().contains(&w));
    }

    #[test]
    fn entry_points_tolerate_missing_slot() {
        let mut core = core();
        let id = core.add_item(ObjectId(1), WorldPos::new(3000, 0, 3000), RoomId(0), 0);
        assert!(core.creature_info(id).is_none());
        assert_eq!(core.creature_turn(id, 100), 0);
        assert!(core.creature_step(id, WorldPos::new(3100, 0, 3000)).is_none());
        assert!(core.select_creature_target(id).is_none());
        core.creature_head(id, 1000);
        core.run_creature(id);
        assert_eq!(core.items.get(id).unwrap().pos, WorldPos::new(3000, 0, 3000));
    }

    #[test]
    fn flipmap_toggles_zone_variant() {
        let mut core = core();
        assert!(core.toggle_flipmap());
        assert!(core.level.flipped);
        assert!(!core.toggle_flipmap());
    }

    #[test]
    fn player_collision_pushes_out_of_wall_and_creature() {
        let mut core = core();
        let player = core.items.player_id().unwrap();
        let mut coll = CollisionInfo::from_defaults(&core.config.collision);

        // Walked west into the border wall.
        coll.old = WorldPos::new(1300, 0, 8000);
        coll.facing = -ANGLE_90;
        core.items.get_mut(player).unwrap().pos = WorldPos::new(1050, 0, 8000);
        assert_eq!(core.player_collision(&mut coll), CollType::Front);
        assert_eq!(core.items.get(player).unwrap().pos.x, 1024 + 100);

        // Walked into a wolf's side.
        let w = wolf(&mut core, WorldPos::new(6000, 0, 8000));
        core.items.get_mut(w).unwrap().bounds = BoundingBox::new(-200, 200, -400, 0, -300, 300);
        coll.old = WorldPos::new(6300, 0, 8000);
        coll.facing = -ANGLE_90;
        core.items.get_mut(player).unwrap().pos = WorldPos::new(6150, 0, 8000);
        core.player_collision(&mut coll);
        assert_eq!(core.items.get(player).unwrap().pos.x, 6200);
        assert_eq!(core.hit.frame, 1);
    }

    #[test]
    fn wolf_chases_player() {
        let mut core = core();
        let w = wolf(&mut core, WorldPos::new(3000, 0, 8000));
        core.items.get_mut(w).unwrap().speed = 60;
        let start = core.items.get(w).unwrap().pos;
        let player_pos = core.items.player().unwrap().pos;

        for _ in 0..120 {
            core.step(|core, id| core.run_creature(id));
        }
        let state = core.slots.get(core.items.get(w).unwrap().creature.unwrap()).unwrap();
        assert_eq!(state.enemy, core.items.player_id());
        assert_ne!(state.mood, Mood::Escape);
        let end = core.items.get(w).unwrap().pos;
        assert!(end.horizontal_distance_sq(player_pos) < start.horizontal_distance_sq(player_pos));
    }

    #[test]
    fn snapshot_restore_round_trip() {
        let mut core = core();
        let w = wolf(&mut core, WorldPos::new(3000, 0, 8000));
        let slot = core.items.get(w).unwrap().creature.unwrap();
        let state = core.slots.get_mut(slot).unwrap();
        state.mood = Mood::Stalk;
        state.flags = 7;
        state.maximum_turn = 500;
        let saved = core.snapshot_slots();

        core.disable_creature_ai(w);
        assert_eq!(core.slots.used(), 0);
        assert_eq!(core.restore_slots(&saved), 1);
        assert_eq!(core.snapshot_slots(), saved);
        let slot = core.items.get(w).unwrap().creature.unwrap();
        assert!(!core.slots.get(slot).unwrap().lot.zone_boxes.is_empty());
    }
}
