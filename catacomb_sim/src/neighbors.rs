// Room neighbor enumeration.
//
// Bounds the static collider's search: given a body's cylinder (center on
// the floor, radius, height) and the room it is in, returns every room the
// eight corners of its bounding box resolve into, starting with the body's
// own room and without duplicates. Corners are resolved through the sector
// grid, so door portals and pit/sky links are followed exactly as a height
// query would follow them.
//
// See also: `statics.rs` (the only consumer), `level.rs` (`resolve_sector`).

use crate::level::SectorGrid;
use crate::types::{RoomId, WorldPos};
use smallvec::SmallVec;

/// The current room plus at most one new room per corner.
pub type RoomSet = SmallVec<[RoomId; 9]>;

/// Rooms touched by the box `[x-r, x+r] x [y-height, y] x [z-r, z+r]`.
pub fn nearby_rooms<G: SectorGrid + ?Sized>(
    grid: &G,
    pos: WorldPos,
    radius: i32,
    height: i32,
    room: RoomId,
) -> RoomSet {
    let mut rooms = RoomSet::new();
    rooms.push(room);

    for y in [pos.y, pos.y - height] {
        for (dx, dz) in [(radius, radius), (-radius, radius), (radius, -radius), (-radius, -radius)] {
            let mut corner_room = room;
            grid.resolve_sector(WorldPos::new(pos.x + dx, y, pos.z + dz), &mut corner_room);
            if !rooms.contains(&corner_room) {
                rooms.push(corner_room);
            }
        }
    }
    rooms
}
