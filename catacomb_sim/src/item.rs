// Items: every dynamic body in the level.
//
// The player, creatures, pushable blocks and projectiles are all `Item`s in
// one `ItemTable`, indexed by `ItemId` in load order. An item that is an
// active creature points at its slot through `creature`; the slot points
// back through its occupant. Those two links are kept in step by the slot
// pool and nothing else writes them.
//
// `bounds` is the item's current animation-frame box in its local frame.
// The pusher and the bounds test read it; whatever drives animation (out of
// scope here) writes it.
//
// See also: `slots.rs` (the item <-> slot link), `sim.rs` (owns the table),
// `push.rs` (bounds consumers).

use crate::types::{BoundingBox, BoxId, ItemId, ObjectId, RoomId, SlotId, WorldPos};
use serde::{Deserialize, Serialize};

/// Lifecycle flag of an item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemStatus {
    /// Placed but not yet triggered.
    #[default]
    Inactive,
    Active,
    /// Finished (dead creature, spent trap). Never reactivated.
    Deactivated,
    /// Evicted from its slot while off camera.
    Invisible,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub object: ObjectId,
    pub pos: WorldPos,
    pub yaw: i16,
    pub room: RoomId,
    /// Navigation box under the item, refreshed by the creature layer.
    pub box_id: Option<BoxId>,
    pub speed: i32,
    pub fall_speed: i32,
    pub hit_points: i16,
    pub status: ItemStatus,
    /// Took damage this tick.
    pub hit_status: bool,
    pub collidable: bool,
    /// Slot holding this item's creature state, if any.
    pub creature: Option<SlotId>,
    pub bounds: BoundingBox,
}

impl Item {
    pub fn is_dead(&self) -> bool {
        self.hit_points <= 0
    }
}

/// All items of a level.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ItemTable {
    items: Vec<Item>,
    player: Option<ItemId>,
}

impl ItemTable {
    pub fn new() -> ItemTable {
        ItemTable::default()
    }

    /// Place a new item and return its id.
    pub fn add(&mut self, object: ObjectId, pos: WorldPos, room: RoomId, yaw: i16) -> ItemId {
        let id = ItemId(self.items.len() as u16);
        self.items.push(Item {
            id,
            object,
            pos,
            yaw,
            room,
            box_id: None,
            speed: 0,
            fall_speed: 0,
            hit_points: 1,
            status: ItemStatus::Inactive,
            hit_status: false,
            collidable: true,
            creature: None,
            bounds: BoundingBox::default(),
        });
        id
    }

    pub fn set_player(&mut self, id: ItemId) {
        self.player = Some(id);
    }

    pub fn player_id(&self) -> Option<ItemId> {
        self.player
    }

    pub fn player(&self) -> Option<&Item> {
        self.player.and_then(|id| self.get(id))
    }

    pub fn is_player(&self, id: ItemId) -> bool {
        self.player == Some(id)
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(id.index())
    }

    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut Item> {
        self.items.get_mut(id.index())
    }

    /// Two distinct items, one mutably. `None` if either is missing or they
    /// are the same item.
    pub fn pair_mut(&mut self, a: ItemId, b: ItemId) -> Option<(&mut Item, &Item)> {
        let (ai, bi) = (a.index(), b.index());
        if ai == bi || ai >= self.items.len() || bi >= self.items.len() {
            return None;
        }
        if ai < bi {
            let (lo, hi) = self.items.split_at_mut(bi);
            Some((&mut lo[ai], &hi[0]))
        } else {
            let (lo, hi) = self.items.split_at_mut(ai);
            Some((&mut hi[0], &lo[bi]))
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.iter()
    }
}
