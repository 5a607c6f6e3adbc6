// Dynamic body pusher and the bounds test that gates it.
//
// When the player overlaps another dynamic body (a creature, a pushable
// block) the player is moved out along the axis of least penetration of
// the other body's current frame box, measured in that body's own rotated
// frame. The new position is then re-validated through the collision
// probe: if it is blocked the player goes back to the last known-good
// position, otherwise it becomes the new known-good position.
//
// The pusher runs after the player's per-state movement has been proposed
// and probed, once per overlapping body.
//
// See also: `collision.rs` (`probe`), `object.rs` (the collision routines
// that call in here), `sim.rs` (`Core::player_collision`).

use crate::angle::{self, ANGLE_180, Quadrant};
use crate::collision::{CollType, CollisionInfo, probe};
use crate::config::NO_BAD_POS;
use crate::item::Item;
use crate::level::{SectorGrid, StaticGeometry};
use crate::types::{BoundingBox, STEP_L, WorldPos};
use serde::{Deserialize, Serialize};

/// The player's flinch state from being shoved by something tall.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitReaction {
    /// Frames into the flinch animation; 0 when not flinching.
    pub frame: u8,
    /// Which side the shove came from, relative to the player's facing.
    pub direction: Option<Quadrant>,
}

/// Knobs for one push.
#[derive(Clone, Copy, Debug)]
pub struct PushOptions {
    /// Start a hit reaction for tall bodies.
    pub spaz: bool,
    /// Grow the other body's box by the player's radius (pushable blocks).
    pub big_push: bool,
    /// Player body height for re-validation.
    pub height: i32,
    /// Highest step the re-validation accepts (negative).
    pub bad_neg: i32,
    /// Frame count the flinch saturates at.
    pub max_hit_frames: u8,
}

/// What a push did to the player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushOutcome {
    /// No overlap; nothing moved.
    Clear,
    /// Pushed out and the new position accepted.
    Pushed,
    /// Pushed out into something solid; reverted to the known-good position.
    Reverted,
}

/// Cheap overlap test between `item`'s frame box (grown by `radius`) and
/// the player's frame box.
pub fn test_bounds_collide(item: &Item, player: &Item, radius: i32) -> bool {
    let b = &item.bounds;
    let pb = &player.bounds;
    if item.pos.y + b.max_y <= player.pos.y + pb.min_y
        || item.pos.y + b.min_y >= player.pos.y + pb.max_y
    {
        return false;
    }
    let (rx, rz) = angle::to_local(player.pos.x - item.pos.x, player.pos.z - item.pos.z, item.yaw);
    rx >= b.min_x - radius && rx <= b.max_x + radius && rz >= b.min_z - radius && rz <= b.max_z + radius
}

/// Push `player` out of `item`. `coll` is the player's collision scratch;
/// its `old` is the known-good position and is advanced on success.
pub fn push_body<G>(
    grid: &G,
    item: &Item,
    player: &mut Item,
    coll: &mut CollisionInfo,
    hit: &mut HitReaction,
    opts: PushOptions,
) -> PushOutcome
where
    G: SectorGrid + StaticGeometry + ?Sized,
{
    let dx = player.pos.x - item.pos.x;
    let dz = player.pos.z - item.pos.z;
    let (mut rx, mut rz) = angle::to_local(dx, dz, item.yaw);

    let b = item.bounds;
    let grow = if opts.big_push { coll.radius } else { 0 };
    let (min_x, max_x) = (b.min_x - grow, b.max_x + grow);
    let (min_z, max_z) = (b.min_z - grow, b.max_z + grow);
    if rx < min_x || rx > max_x || rz < min_z || rz > max_z {
        return PushOutcome::Clear;
    }

    let left = rx - min_x;
    let right = max_x - rx;
    let top = max_z - rz;
    let bottom = rz - min_z;
    if left <= right && left <= top && left <= bottom {
        rx -= left;
    } else if right <= left && right <= top && right <= bottom {
        rx += right;
    } else if top <= left && top <= right && top <= bottom {
        rz += top;
    } else {
        rz -= bottom;
    }

    let (wx, wz) = angle::to_world(rx, rz, item.yaw);
    player.pos.x = item.pos.x + wx;
    player.pos.z = item.pos.z + wz;

    if opts.spaz && b.height() > STEP_L {
        hit.direction = Some(shove_direction(item, player.yaw, dx, dz));
        hit.frame = hit.frame.saturating_add(1).min(opts.max_hit_frames);
    }

    let saved = (coll.bad_pos, coll.bad_neg, coll.bad_ceiling, coll.facing);
    coll.bad_pos = NO_BAD_POS;
    coll.bad_neg = opts.bad_neg;
    coll.bad_ceiling = 0;
    coll.facing = angle::atan(player.pos.z - coll.old.z, player.pos.x - coll.old.x);
    probe(grid, coll, player.pos, player.room, opts.height);
    (coll.bad_pos, coll.bad_neg, coll.bad_ceiling, coll.facing) = saved;

    if coll.coll_type != CollType::None {
        player.pos.x = coll.old.x;
        player.pos.z = coll.old.z;
        PushOutcome::Reverted
    } else {
        coll.old = player.pos;
        let mut room = player.room;
        grid.resolve_sector(WorldPos::new(player.pos.x, player.pos.y - 10, player.pos.z), &mut room);
        player.room = room;
        PushOutcome::Pushed
    }
}

/// Quadrant, relative to the player's facing, the shove came from.
/// `(dx, dz)` is the player's offset from the item's origin before the push.
fn shove_direction(item: &Item, player_yaw: i16, dx: i32, dz: i32) -> Quadrant {
    let b: &BoundingBox = &item.bounds;
    let (cx, cz) = angle::to_world((b.min_x + b.max_x) / 2, (b.min_z + b.max_z) / 2, item.yaw);
    let (x, z) = (dx - cx, dz - cz);
    let toward_item = angle::atan(z, x).wrapping_add(ANGLE_180);
    Quadrant::from_facing(toward_item.wrapping_sub(player_yaw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::angle::ANGLE_90;
    use crate::level::{Level, Room};
    use crate::nav::ZoneTables;
    use crate::types::{ItemId, ObjectId, RoomId};

    fn level() -> Level {
        Level::new(
            vec![Room::open(0, 0, 8, 8, 0, -4096)],
            Vec::new(),
            ZoneTables::empty(),
            Vec::new(),
        )
        .unwrap()
    }

    fn body(id: u16, pos: WorldPos, yaw: i16, bounds: BoundingBox) -> Item {
        Item {
            id: ItemId(id),
            object: ObjectId(id),
            pos,
            yaw,
            room: RoomId(0),
            box_id: None,
            speed: 0,
            fall_speed: 0,
            hit_points: 10,
            status: Default::default(),
            hit_status: false,
            collidable: true,
            creature: None,
            bounds,
        }
    }

    const PLAYER_BOX: BoundingBox = BoundingBox::new(-100, 100, -762, 0, -100, 100);
    const WOLF_BOX: BoundingBox = BoundingBox::new(-200, 200, -400, 0, -300, 300);

    fn opts() -> PushOptions {
        PushOptions {
            spaz: true,
            big_push: false,
            height: 762,
            bad_neg: -384,
            max_hit_frames: 34,
        }
    }

    #[test]
    fn bounds_test_respects_height_and_radius() {
        let wolf = body(1, WorldPos::new(3000, 0, 3000), 0, WOLF_BOX);
        let near = body(0, WorldPos::new(3250, 0, 3000), 0, PLAYER_BOX);
        assert!(!test_bounds_collide(&wolf, &near, 0));
        assert!(test_bounds_collide(&wolf, &near, 100));

        // Standing on a ledge well above the wolf's back.
        let above = body(0, WorldPos::new(3000, -500, 3000), 0, PLAYER_BOX);
        assert!(!test_bounds_collide(&wolf, &above, 100));
    }

    #[test]
    fn bounds_test_uses_item_rotation() {
        // A long box turned 90°: its length now runs along X.
        let long = BoundingBox::new(-100, 100, -400, 0, -600, 600);
        let turned = body(1, WorldPos::new(3000, 0, 3000), ANGLE_90, long);
        let east = body(0, WorldPos::new(3500, 0, 3000), 0, PLAYER_BOX);
        let north = body(0, WorldPos::new(3000, 0, 3500), 0, PLAYER_BOX);
        assert!(test_bounds_collide(&turned, &east, 0));
        assert!(!test_bounds_collide(&turned, &north, 0));
    }

    #[test]
    fn no_overlap_is_clear() {
        let level = level();
        let wolf = body(1, WorldPos::new(3000, 0, 3000), 0, WOLF_BOX);
        let mut player = body(0, WorldPos::new(4000, 0, 3000), 0, PLAYER_BOX);
        let mut coll = CollisionInfo::new(100, NO_BAD_POS, -384, 0);
        coll.old = player.pos;
        let mut hit = HitReaction::default();
        let out = push_body(&level, &wolf, &mut player, &mut coll, &mut hit, opts());
        assert_eq!(out, PushOutcome::Clear);
        assert_eq!(player.pos, WorldPos::new(4000, 0, 3000));
    }

    #[test]
    fn pushed_out_along_least_penetration() {
        let level = level();
        let wolf = body(1, WorldPos::new(3000, 0, 3000), 0, WOLF_BOX);
        // 150 east of center: 50 from the east face, 350 from the west.
        let mut player = body(0, WorldPos::new(3150, 0, 3020), 0, PLAYER_BOX);
        let mut coll = CollisionInfo::new(100, NO_BAD_POS, -384, 0);
        coll.old = WorldPos::new(3300, 0, 3020);
        let mut hit = HitReaction::default();
        let out = push_body(&level, &wolf, &mut player, &mut coll, &mut hit, opts());
        assert_eq!(out, PushOutcome::Pushed);
        assert_eq!(player.pos, WorldPos::new(3200, 0, 3020));
        assert_eq!(coll.old, player.pos);
        // Tall enough to flinch.
        assert_eq!(hit.frame, 1);
        assert!(hit.direction.is_some());
    }

    #[test]
    fn big_push_grows_the_box() {
        let level = level();
        let crate_box = BoundingBox::new(-512, 512, -1024, 0, -512, 512);
        let block = body(1, WorldPos::new(3584, 0, 3584), 0, crate_box);
        let mut player = body(0, WorldPos::new(4150, 0, 3584), 0, PLAYER_BOX);
        let mut coll = CollisionInfo::new(100, NO_BAD_POS, -384, 0);
        coll.old = WorldPos::new(4200, 0, 3584);
        let mut hit = HitReaction::default();

        let out = push_body(&level, &block, &mut player, &mut coll, &mut hit, opts());
        assert_eq!(out, PushOutcome::Clear);

        let big = PushOptions {
            big_push: true,
            spaz: false,
            ..opts()
        };
        let out = push_body(&level, &block, &mut player, &mut coll, &mut hit, big);
        assert_eq!(out, PushOutcome::Pushed);
        assert_eq!(player.pos.x, 3584 + 512 + 100);
        assert_eq!(hit, HitReaction::default());
    }

    #[test]
    fn push_into_wall_reverts() {
        let level = level();
        // Wolf right against the west wall; the player squeezed between.
        let wolf = body(1, WorldPos::new(1250, 0, 3000), 0, WOLF_BOX);
        let mut player = body(0, WorldPos::new(1080, 0, 3000), 0, PLAYER_BOX);
        let mut coll = CollisionInfo::new(100, NO_BAD_POS, -384, 0);
        coll.old = WorldPos::new(1150, 0, 2800);
        let mut hit = HitReaction::default();
        let out = push_body(&level, &wolf, &mut player, &mut coll, &mut hit, opts());
        assert_eq!(out, PushOutcome::Reverted);
        assert_eq!((player.pos.x, player.pos.z), (1150, 2800));
    }

    #[test]
    fn flinch_saturates() {
        let level = level();
        let wolf = body(1, WorldPos::new(3000, 0, 3000), 0, WOLF_BOX);
        let mut hit = HitReaction {
            frame: 34,
            direction: None,
        };
        let mut player = body(0, WorldPos::new(3150, 0, 3000), 0, PLAYER_BOX);
        let mut coll = CollisionInfo::new(100, NO_BAD_POS, -384, 0);
        coll.old = player.pos;
        push_body(&level, &wolf, &mut player, &mut coll, &mut hit, opts());
        assert_eq!(hit.frame, 34);
    }

    #[test]
    fn shove_from_ahead_is_north() {
        // Player faces north, wolf directly north of the player.
        let wolf = body(1, WorldPos::new(3000, 0, 3200), 0, WOLF_BOX);
        assert_eq!(shove_direction(&wolf, 0, 0, -200), Quadrant::North);
        // Wolf to the player's east: shoved from the right.
        assert_eq!(shove_direction(&wolf, 0, -200, 0), Quadrant::East);
    }
}
