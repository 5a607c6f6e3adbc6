// Creature slot pool: the fixed-capacity set of items that run AI.
//
// Only a handful of creatures think at once (`CoreConfig::max_creatures`,
// five by default). Each thinking creature owns one `CreatureState` in a
// `SlotPool` arena, addressed by `SlotId`; the owning `Item` points back via
// `Item::creature`. Activating a creature when the pool is full evicts the
// occupant farthest from the camera, but only when that occupant is farther
// away than the newcomer (unless the activation is forced). The evicted
// item is marked `Invisible`; `Core::creature_active` asks for a slot again
// each tick it runs and sets it back to `Active` once it gets one.
//
// `CreatureState` carries the per-creature mood, turn and head limits, the
// current enemy and the LOT. The LOT is scratch state: snapshots persist the
// rest (`SlotSnapshot`) and rebuild the LOT by re-activating the creature.
//
// The pool keeps a `used` count alongside the slots. It always equals the
// number of occupied slots; `occupied()` recounts for tests and asserts.
//
// See also: `lot.rs` (the search state each slot owns), `sim.rs`
// (`Core::enable_creature_ai` / `disable_creature_ai`), `item.rs`.
//
// **Critical constraint: determinism.** Free slots are claimed lowest index
// first; eviction ties go to the lowest slot index.

use crate::angle::DEG_1;
use crate::item::{ItemStatus, ItemTable};
use crate::level::{Level, SectorGrid};
use crate::lot::Lot;
use crate::nav::LocomotionClass;
use crate::object::ObjectTable;
use crate::types::{ItemId, SlotId, WorldPos};
use serde::{Deserialize, Serialize};

/// High-level intent driving target selection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mood {
    #[default]
    Bored,
    Attack,
    Escape,
    Stalk,
}

/// AI state of one active creature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreatureState {
    pub item: ItemId,
    pub head_rotation: i16,
    pub neck_rotation: i16,
    /// Turn limit per tick, set by the behaviour script each state.
    pub maximum_turn: i16,
    /// Behaviour-script scratch bits, persisted across saves.
    pub flags: u16,
    pub mood: Mood,
    pub enemy: Option<ItemId>,
    pub lot: Lot,
    /// Steering point from the last `calculate_target`.
    pub target: WorldPos,
}

impl CreatureState {
    pub fn new(item: ItemId, class: LocomotionClass, box_count: usize) -> CreatureState {
        CreatureState {
            item,
            head_rotation: 0,
            neck_rotation: 0,
            maximum_turn: DEG_1,
            flags: 0,
            mood: Mood::Bored,
            enemy: None,
            lot: Lot::new(class, box_count),
            target: WorldPos::ZERO,
        }
    }

    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot {
            item: self.item,
            mood: self.mood,
            flags: self.flags,
            maximum_turn: self.maximum_turn,
            head_rotation: self.head_rotation,
            neck_rotation: self.neck_rotation,
            enemy: self.enemy,
        }
    }

    /// Apply the durable fields of a snapshot. The LOT is left as activation
    /// built it.
    pub fn apply(&mut self, snapshot: &SlotSnapshot) {
        self.mood = snapshot.mood;
        self.flags = snapshot.flags;
        self.maximum_turn = snapshot.maximum_turn;
        self.head_rotation = snapshot.head_rotation;
        self.neck_rotation = snapshot.neck_rotation;
        self.enemy = snapshot.enemy;
    }
}

/// The durable part of a creature slot, as written to a save.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub item: ItemId,
    pub mood: Mood,
    pub flags: u16,
    pub maximum_turn: i16,
    pub head_rotation: i16,
    pub neck_rotation: i16,
    pub enemy: Option<ItemId>,
}

/// What activation reads besides the pool and the items.
#[derive(Clone, Copy, Debug)]
pub struct SlotContext<'a> {
    pub level: &'a Level,
    pub objects: &'a ObjectTable,
    pub camera: WorldPos,
    /// Right shift applied to coordinates before squaring camera distances.
    pub distance_shift: u32,
}

#[derive(Clone, Debug, Default)]
pub struct SlotPool {
    slots: Vec<Option<CreatureState>>,
    used: usize,
}

impl SlotPool {
    pub fn new(capacity: usize) -> SlotPool {
        SlotPool {
            slots: vec![None; capacity],
            used: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used(&self) -> usize {
        self.used
    }

    /// Number of occupied slots, counted directly.
    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn get(&self, slot: SlotId) -> Option<&CreatureState> {
        self.slots.get(slot.index())?.as_ref()
    }

    pub fn get_mut(&mut self, slot: SlotId) -> Option<&mut CreatureState> {
        self.slots.get_mut(slot.index())?.as_mut()
    }

    /// Occupied slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = (SlotId, &CreatureState)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|c| (SlotId(i as u8), c)))
    }

    /// Give `item` a slot. Returns `false` only when the pool is full and
    /// nobody may be evicted.
    pub fn enable(&mut self, items: &mut ItemTable, item: ItemId, always: bool, ctx: &SlotContext) -> bool {
        let Some(candidate) = items.get(item) else {
            return false;
        };
        if candidate.creature.is_some() {
            return true;
        }
        let candidate_pos = candidate.pos;

        if self.used < self.slots.len() {
            if let Some(free) = self.slots.iter().position(|s| s.is_none()) {
                let slot = SlotId(free as u8);
                self.initialise(items, slot, item, ctx);
                tracing::debug!(item = item.0, slot = slot.0, "claimed creature slot");
                return true;
            }
        }

        // Full: find the occupant farthest from the camera. A forced
        // activation beats anyone; otherwise the occupant must be farther
        // away than the candidate.
        let mut worst_dist = if always {
            -1
        } else {
            candidate_pos.shifted_distance_sq(ctx.camera, ctx.distance_shift)
        };
        let mut worst_slot = None;
        for (slot, state) in self.iter() {
            let Some(occupant) = items.get(state.item) else {
                continue;
            };
            let dist = occupant.pos.shifted_distance_sq(ctx.camera, ctx.distance_shift);
            if dist > worst_dist {
                worst_dist = dist;
                worst_slot = Some((slot, state.item));
            }
        }

        let Some((slot, evicted)) = worst_slot else {
            tracing::debug!(item = item.0, "no creature slot free and nobody to evict");
            return false;
        };
        if let Some(evicted_item) = items.get_mut(evicted) {
            evicted_item.status = ItemStatus::Invisible;
        }
        self.disable(items, evicted);
        self.initialise(items, slot, item, ctx);
        tracing::debug!(item = item.0, evicted = evicted.0, slot = slot.0, "evicted creature slot");
        true
    }

    fn initialise(&mut self, items: &mut ItemTable, slot: SlotId, item: ItemId, ctx: &SlotContext) {
        let is_player = items.is_player(item);
        let Some(body) = items.get_mut(item) else {
            return;
        };
        let info = ctx.objects.info(body.object);
        let class = info.map_or(LocomotionClass::Walk, |i| i.locomotion);
        let mut state = CreatureState::new(item, class, ctx.level.boxes.len());
        if let Some(info) = info {
            state.maximum_turn = info.turn_rate;
        }

        body.box_id = ctx.level.box_at(body.pos, body.room);
        if !is_player {
            state.lot.create_zone(ctx.level, body.box_id);
        }
        body.creature = Some(slot);

        self.slots[slot.index()] = Some(state);
        self.used += 1;
    }

    /// Release `item`'s slot. Returns `false` if it had none.
    pub fn disable(&mut self, items: &mut ItemTable, item: ItemId) -> bool {
        let is_player = items.is_player(item);
        let Some(body) = items.get_mut(item) else {
            return false;
        };
        let Some(slot) = body.creature.take() else {
            return false;
        };
        let released = self.slots.get_mut(slot.index()).and_then(Option::take);
        if released.is_none() {
            return false;
        }
        self.used -= 1;

        if is_player {
            tracing::debug!(item = item.0, slot = slot.0, "released player slot");
        } else {
            // The creature is no longer steered, so its box goes stale.
            body.box_id = None;
            tracing::debug!(item = item.0, slot = slot.0, "released creature slot");
        }
        true
    }

    /// Slot of `item`, if it holds one.
    pub fn slot_of(&self, items: &ItemTable, item: ItemId) -> Option<SlotId> {
        let slot = items.get(item)?.creature?;
        self.get(slot).filter(|s| s.item == item).map(|_| slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoreConfig;
    use crate::level::Room;
    use crate::nav::NavBox;
    use crate::types::{BoxId, ObjectId, RoomId, WALL_L};

    fn level() -> Level {
        let mut room = Room::open(0, 0, 32, 32, 0, -4096);
        for sector in room.sectors.iter_mut().filter(|s| !s.solid) {
            sector.box_id = Some(BoxId(0));
        }
        let boxes = vec![NavBox::new(WALL_L, 31 * WALL_L - 1, WALL_L, 31 * WALL_L - 1, 0)];
        Level::with_flood_zones(vec![room], boxes, Vec::new(), &[]).unwrap()
    }

    struct Fixture {
        level: Level,
        objects: ObjectTable,
        items: ItemTable,
        pool: SlotPool,
    }

    impl Fixture {
        fn new(capacity: usize) -> Fixture {
            Fixture {
                level: level(),
                objects: ObjectTable::new(&CoreConfig::default().objects),
                items: ItemTable::new(),
                pool: SlotPool::new(capacity),
            }
        }

        /// A wolf `dist` units east of the camera at (2048, 0, 2048).
        fn wolf(&mut self, dist: i32) -> ItemId {
            self.items
                .add(ObjectId(1), WorldPos::new(2048 + dist, 0, 2048), RoomId(0), 0)
        }

        fn enable(&mut self, item: ItemId, always: bool) -> bool {
            let ctx = SlotContext {
                level: &self.level,
                objects: &self.objects,
                camera: WorldPos::new(2048, 0, 2048),
                distance_shift: 8,
            };
            self.pool.enable(&mut self.items, item, always, &ctx)
        }

        fn assert_counts(&self) {
            assert_eq!(self.pool.used(), self.pool.occupied());
            let linked = self.items.iter().filter(|i| i.creature.is_some()).count();
            assert_eq!(linked, self.pool.used());
        }
    }

    #[test]
    fn enable_then_disable_round_trip() {
        let mut f = Fixture::new(3);
        let wolf = f.wolf(1000);
        assert!(f.enable(wolf, false));
        assert_eq!(f.pool.used(), 1);
        let slot = f.items.get(wolf).unwrap().creature.unwrap();
        assert_eq!(f.pool.get(slot).unwrap().item, wolf);
        f.assert_counts();

        assert!(f.pool.disable(&mut f.items, wolf));
        assert_eq!(f.pool.used(), 0);
        assert_eq!(f.items.get(wolf).unwrap().creature, None);
        f.assert_counts();
        assert!(!f.pool.disable(&mut f.items, wolf));
    }

    #[test]
    fn enable_is_idempotent() {
        let mut f = Fixture::new(2);
        let wolf = f.wolf(1000);
        assert!(f.enable(wolf, false));
        assert!(f.enable(wolf, false));
        assert_eq!(f.pool.used(), 1);
        f.assert_counts();
    }

    #[test]
    fn initial_state_is_bored_with_zone() {
        let mut f = Fixture::new(2);
        let wolf = f.wolf(1000);
        f.enable(wolf, false);
        let slot = f.pool.slot_of(&f.items, wolf).unwrap();
        let state = f.pool.get(slot).unwrap();
        assert_eq!(state.mood, Mood::Bored);
        assert_eq!(state.enemy, None);
        assert_eq!(state.lot.zone_boxes, vec![BoxId(0)]);
        assert_eq!(f.items.get(wolf).unwrap().box_id, Some(BoxId(0)));
    }

    #[test]
    fn player_slot_skips_zone_creation() {
        let mut f = Fixture::new(2);
        let player = f.items.add(ObjectId(0), WorldPos::new(3000, 0, 3000), RoomId(0), 0);
        f.items.set_player(player);
        assert!(f.enable(player, false));
        let slot = f.pool.slot_of(&f.items, player).unwrap();
        assert!(f.pool.get(slot).unwrap().lot.zone_boxes.is_empty());
        assert!(f.pool.disable(&mut f.items, player));
        f.assert_counts();
    }

    #[test]
    fn free_slots_fill_lowest_first() {
        let mut f = Fixture::new(3);
        let a = f.wolf(100);
        let b = f.wolf(200);
        f.enable(a, false);
        f.enable(b, false);
        f.pool.disable(&mut f.items, a);
        let c = f.wolf(300);
        f.enable(c, false);
        assert_eq!(f.items.get(c).unwrap().creature, Some(SlotId(0)));
        f.assert_counts();
    }

    #[test]
    fn full_pool_evicts_farthest_when_farther_than_candidate() {
        let mut f = Fixture::new(2);
        let near = f.wolf(2000);
        let far = f.wolf(8000);
        f.enable(near, false);
        f.enable(far, false);

        let mid = f.wolf(4000);
        assert!(f.enable(mid, false));
        assert_eq!(f.items.get(far).unwrap().creature, None);
        assert_eq!(f.items.get(far).unwrap().status, ItemStatus::Invisible);
        assert!(f.items.get(mid).unwrap().creature.is_some());
        assert!(f.items.get(near).unwrap().creature.is_some());
        assert_eq!(f.pool.used(), 2);
        f.assert_counts();
    }

    #[test]
    fn full_pool_refuses_candidate_farther_than_everyone() {
        let mut f = Fixture::new(2);
        let a = f.wolf(2000);
        let b = f.wolf(3000);
        f.enable(a, false);
        f.enable(b, false);

        let distant = f.wolf(9000);
        assert!(!f.enable(distant, false));
        assert_eq!(f.items.get(distant).unwrap().creature, None);
        assert!(f.items.get(a).unwrap().creature.is_some());
        assert!(f.items.get(b).unwrap().creature.is_some());
        f.assert_counts();
    }

    #[test]
    fn forced_activation_always_evicts_farthest() {
        let mut f = Fixture::new(2);
        let a = f.wolf(2000);
        let b = f.wolf(3000);
        f.enable(a, false);
        f.enable(b, false);

        let distant = f.wolf(9000);
        assert!(f.enable(distant, true));
        assert_eq!(f.items.get(b).unwrap().creature, None);
        assert_eq!(f.items.get(b).unwrap().status, ItemStatus::Invisible);
        assert!(f.items.get(distant).unwrap().creature.is_some());
        f.assert_counts();
    }

    #[test]
    fn snapshot_apply_restores_durable_fields() {
        let mut f = Fixture::new(1);
        let wolf = f.wolf(500);
        f.enable(wolf, false);
        let slot = f.pool.slot_of(&f.items, wolf).unwrap();
        let state = f.pool.get_mut(slot).unwrap();
        state.mood = Mood::Stalk;
        state.flags = 0x21;
        state.head_rotation = 300;
        let snap = state.snapshot();

        f.pool.disable(&mut f.items, wolf);
        f.enable(wolf, false);
        let slot = f.pool.slot_of(&f.items, wolf).unwrap();
        let state = f.pool.get_mut(slot).unwrap();
        assert_eq!(state.mood, Mood::Bored);
        state.apply(&snap);
        assert_eq!(state.snapshot(), snap);
    }
}
