// Creature targeting: what a creature knows about its enemy, what it wants,
// and how far it may turn and step toward it.
//
// Each AI tick a behaviour script runs roughly this sequence:
//
//   1. `creature_ai_info` resolves the creature's and the enemy's boxes and
//      zones and measures distance, bearing and bite reach. The enemy counts
//      as unreachable when its box is blocked for this creature or the
//      creature's LOT last reached it only through a blocked box.
//   2. `creature_mood` moves the mood between Bored, Attack, Escape and
//      Stalk, picks a goal box for the LOT to search toward, and computes
//      the steering point (`CreatureState::target`).
//   3. The script sets a speed, then `creature_turn` turns toward the
//      steering point within the turn limit and `creature_head` tracks the
//      enemy with the head.
//   4. `creature_step` validates the proposed motion against floor and
//      ceiling and applies it.
//
// `select_target` chooses the enemy for creatures that fight their own kind
// as well as the player.
//
// See also: `lot.rs` (box search and steering point), `slots.rs` (the
// state these functions mutate), `sim.rs` (the `Core` wrappers that fetch
// everything and call in here).
//
// **Critical constraint: determinism.** Every random choice draws from the
// core's `ControlRng` in a fixed order; the mood code draws only on the
// branches listed in its comments, so the stream advances identically for
// identical inputs.

use crate::angle::{self, ANGLE_90, ANGLE_180, Quadrant};
use crate::collision::{CollType, CollisionInfo, probe};
use crate::config::CoreConfig;
use crate::item::Item;
use crate::level::{Level, SectorGrid};
use crate::lot::{Lot, TargetType};
use crate::nav::NavBox;
use crate::object::ObjectInfo;
use crate::slots::{CreatureState, Mood};
use crate::types::{BoxId, ItemId, STEP_L, WorldPos, ZoneId};
use catacomb_prng::ControlRng;

/// Half-width of the arc a creature counts as "in front".
pub const FRONT_ARC: i16 = ANGLE_90;

/// Per-tick facts about a creature and its enemy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AiInfo {
    pub zone: Option<ZoneId>,
    pub enemy_zone: Option<ZoneId>,
    /// Same zone, and the route is not blocked.
    pub enemy_reachable: bool,
    pub creature_box: Option<BoxId>,
    pub enemy_box: Option<BoxId>,
    /// Squared horizontal distance from the jaw to the enemy.
    pub distance: i64,
    /// Bearing of the enemy relative to the creature's facing.
    pub angle: i16,
    /// Bearing of the creature relative to the enemy's facing, offset so
    /// that 0 means the enemy is looking straight at it.
    pub enemy_facing: i16,
    pub ahead: bool,
    pub bite: bool,
}

/// Measure `enemy` from `item`'s point of view. `pivot_length` moves the
/// measuring point forward from the item origin to the jaw.
pub fn creature_ai_info(level: &Level, lot: &Lot, item: &Item, enemy: &Item, pivot_length: i32) -> AiInfo {
    let creature_box = level.box_at(item.pos, item.room);
    let enemy_box = level.box_at(enemy.pos, enemy.room);
    let zone_of = |b: Option<BoxId>| b.and_then(|b| level.zones.zone_of(lot.class, level.flipped, b));
    let zone = zone_of(creature_box);
    let enemy_zone = zone_of(enemy_box);

    let blocked = enemy_box
        .and_then(|b| level.nav_box(b))
        .is_some_and(|b| lot.is_blocking(b))
        || creature_box.is_some_and(|b| lot.blocked_route(b));
    let same_zone = match (creature_box, enemy_box) {
        (Some(a), Some(b)) => level.zones.same_zone(lot.class, level.flipped, a, b),
        _ => false,
    };
    let enemy_reachable = !blocked && same_zone;

    let z = enemy.pos.z - ((angle::cos(item.yaw) * pivot_length) >> angle::TRIG_SHIFT) - item.pos.z;
    let x = enemy.pos.x - ((angle::sin(item.yaw) * pivot_length) >> angle::TRIG_SHIFT) - item.pos.x;
    let bearing = angle::atan(z, x);
    let relative = bearing.wrapping_sub(item.yaw);
    let ahead = relative > -FRONT_ARC && relative < FRONT_ARC;

    AiInfo {
        zone,
        enemy_zone,
        enemy_reachable,
        creature_box,
        enemy_box,
        distance: x as i64 * x as i64 + z as i64 * z as i64,
        angle: relative,
        enemy_facing: bearing.wrapping_sub(enemy.yaw).wrapping_add(ANGLE_180),
        ahead,
        bite: ahead && enemy.pos.y > item.pos.y - STEP_L && enemy.pos.y < item.pos.y + STEP_L,
    }
}

/// Pick the nearest living candidate (by squared distance with
/// coordinates shifted right by `shift`). The `current` enemy is kept while
/// its distance is within `hysteresis` of the best.
pub fn select_target<'a>(
    item: &Item,
    current: Option<ItemId>,
    candidates: impl IntoIterator<Item = &'a Item>,
    shift: u32,
    hysteresis: i64,
) -> Option<ItemId> {
    let mut best: Option<(ItemId, i64)> = None;
    let mut current_distance = None;
    for candidate in candidates {
        if candidate.id == item.id || candidate.is_dead() {
            continue;
        }
        let distance = candidate.pos.shifted_distance_sq(item.pos, shift);
        if Some(candidate.id) == current {
            current_distance = Some(distance);
        }
        if best.is_none_or(|(_, d)| distance < d) {
            best = Some((candidate.id, distance));
        }
    }

    let (best_id, best_distance) = best?;
    match (current, current_distance) {
        (Some(id), Some(d)) if d <= best_distance + hysteresis => Some(id),
        _ => Some(best_id),
    }
}

/// Whether `box_id` is a fair wander goal: same zone, not blocked, and not
/// the box the creature is standing well inside.
pub fn valid_box(level: &Level, lot: &Lot, item: &Item, zone: Option<ZoneId>, box_id: BoxId) -> bool {
    let Some(zone) = zone else {
        return false;
    };
    if level.zones.zone_of(lot.class, level.flipped, box_id) != Some(zone) {
        return false;
    }
    let Some(nav_box) = level.nav_box(box_id) else {
        return false;
    };
    if lot.is_blocking(nav_box) {
        return false;
    }
    let p = item.pos;
    !(p.z > nav_box.z_min && p.z < nav_box.z_max && p.x > nav_box.x_min && p.x < nav_box.x_max)
}

/// Whether fleeing to `nav_box` gets the creature away from `enemy`: the
/// box is outside the escape distance and not on the far side of the enemy.
pub fn escape_box(nav_box: &NavBox, item: &Item, enemy: &Item, escape_distance: i32) -> bool {
    let center = nav_box.center();
    let x = center.x - enemy.pos.x;
    let z = center.z - enemy.pos.z;
    if x > -escape_distance && x < escape_distance && z > -escape_distance && z < escape_distance {
        return false;
    }
    let crosses_z = (z > 0) != (item.pos.z > enemy.pos.z);
    let crosses_x = (x > 0) != (item.pos.x > enemy.pos.x);
    !(crosses_z && crosses_x)
}

/// Whether `nav_box` is a good place to shadow `enemy` from: close, out of
/// the enemy's line of sight, and not reached by crossing in front of it.
pub fn stalk_box(nav_box: &NavBox, item: &Item, enemy: &Item, stalk_distance: i32) -> bool {
    let center = nav_box.center();
    let x = center.x - enemy.pos.x;
    let z = center.z - enemy.pos.z;
    if x > stalk_distance || x < -stalk_distance || z > stalk_distance || z < -stalk_distance {
        return false;
    }

    let looking = Quadrant::from_facing(enemy.yaw);
    let box_side = Quadrant::from_facing(angle::atan(z, x));
    if box_side == looking {
        return false;
    }
    let creature_side = Quadrant::from_facing(angle::atan(item.pos.z - enemy.pos.z, item.pos.x - enemy.pos.x));
    let opposite = (looking.index() + 2) % 4 == box_side.index();
    !(creature_side == looking && opposite)
}

fn random_zone_box(lot: &Lot, rng: &mut ControlRng) -> Option<BoxId> {
    let i = rng.scaled(lot.zone_boxes.len() as i32);
    lot.zone_boxes.get(i as usize).copied()
}

/// Everything `creature_mood` reads besides the creature itself.
#[derive(Clone, Copy, Debug)]
pub struct MoodContext<'a> {
    pub level: &'a Level,
    pub config: &'a CoreConfig,
    pub info: &'a ObjectInfo,
}

/// Update the creature's mood and goal, then compute its steering point.
pub fn creature_mood(
    ctx: &MoodContext,
    rng: &mut ControlRng,
    item: &Item,
    enemy: Option<&Item>,
    creature: &mut CreatureState,
    ai: &AiInfo,
) -> TargetType {
    let level = ctx.level;
    let cfg = ctx.config;
    let lot = &mut creature.lot;

    if ai.creature_box.is_some_and(|b| lot.blocked_route(b)) {
        lot.required_box = None;
    }
    if creature.mood != Mood::Attack && lot.required_box.is_some() {
        let still_valid = lot
            .target_box
            .is_some_and(|b| valid_box(level, lot, item, ai.zone, b));
        if !still_valid {
            if ai.enemy_reachable {
                creature.mood = Mood::Bored;
            }
            lot.required_box = None;
        }
    }

    let previous = creature.mood;
    let reachable = ai.enemy_reachable;
    match enemy {
        None => creature.mood = Mood::Bored,
        Some(e) if e.is_dead() => creature.mood = Mood::Bored,
        Some(_) if ctx.info.violent => {
            creature.mood = match creature.mood {
                Mood::Bored | Mood::Stalk if reachable => Mood::Attack,
                Mood::Bored | Mood::Stalk if item.hit_status => Mood::Escape,
                Mood::Attack if !reachable => Mood::Bored,
                Mood::Escape if reachable => Mood::Attack,
                mood => mood,
            };
        }
        // Timid: draws only when hit, or when escaping within reach.
        Some(_) => match creature.mood {
            Mood::Bored | Mood::Stalk => {
                if item.hit_status && (rng.chance(cfg.escape_chance) || !reachable) {
                    creature.mood = Mood::Escape;
                } else if reachable {
                    let close = ai.distance < cfg.attack_range;
                    let cornered = creature.mood == Mood::Stalk && lot.required_box.is_none();
                    creature.mood = if close || cornered { Mood::Attack } else { Mood::Stalk };
                }
            }
            Mood::Attack => {
                if item.hit_status && (rng.chance(cfg.escape_chance) || !reachable) {
                    creature.mood = Mood::Escape;
                } else if !reachable {
                    creature.mood = Mood::Bored;
                }
            }
            Mood::Escape => {
                if reachable && rng.chance(cfg.recover_chance) {
                    creature.mood = Mood::Stalk;
                }
            }
        },
    }

    if previous != creature.mood {
        if previous == Mood::Attack {
            if let Some(b) = lot.target_box {
                lot.target_box(level, b, rng);
            }
        }
        lot.required_box = None;
        tracing::trace!(item = item.id.0, from = ?previous, to = ?creature.mood, "mood change");
    }

    let living_enemy = enemy.filter(|e| !e.is_dead());
    let stalks = |b: BoxId, enemy: Option<&Item>| -> bool {
        match (level.nav_box(b), enemy) {
            (Some(nav_box), Some(e)) => stalk_box(nav_box, item, e, cfg.stalk_distance),
            _ => false,
        }
    };

    match creature.mood {
        Mood::Attack => {
            if let Some(e) = enemy {
                if rng.chance(ctx.info.smartness) {
                    lot.target = e.pos;
                    lot.required_box = ai.enemy_box;
                    if lot.class.flies() {
                        lot.target.y += e.bounds.min_y;
                    }
                }
            }
        }
        Mood::Bored => {
            if let Some(b) = random_zone_box(lot, rng) {
                if valid_box(level, lot, item, ai.zone, b) {
                    if stalks(b, living_enemy) {
                        lot.target_box(level, b, rng);
                        creature.mood = Mood::Stalk;
                    } else if lot.required_box.is_none() {
                        lot.target_box(level, b, rng);
                    }
                }
            }
        }
        Mood::Stalk => {
            let keep = lot.required_box.is_some_and(|b| stalks(b, enemy));
            if !keep {
                if let Some(b) = random_zone_box(lot, rng) {
                    if valid_box(level, lot, item, ai.zone, b) {
                        if stalks(b, enemy) {
                            lot.target_box(level, b, rng);
                        } else if lot.required_box.is_none() {
                            lot.target_box(level, b, rng);
                            if !reachable {
                                creature.mood = Mood::Bored;
                            }
                        }
                    }
                }
            }
        }
        Mood::Escape => {
            if let Some(b) = random_zone_box(lot, rng) {
                if valid_box(level, lot, item, ai.zone, b) && lot.required_box.is_none() {
                    let escapes = match (level.nav_box(b), enemy) {
                        (Some(nav_box), Some(e)) => escape_box(nav_box, item, e, cfg.escape_distance),
                        _ => false,
                    };
                    if escapes {
                        lot.target_box(level, b, rng);
                    } else if reachable && stalks(b, enemy) {
                        lot.target_box(level, b, rng);
                        creature.mood = Mood::Stalk;
                    }
                }
            }
        }
    }

    if lot.target_box.is_none() && lot.required_box.is_none() {
        if let Some(b) = ai.creature_box {
            lot.target_box(level, b, rng);
        }
    }

    let (kind, target) = lot.calculate_target(level, item.pos, ai.creature_box, cfg.expansion_budget, rng);
    creature.target = target;
    kind
}

/// Turn `item` toward `target` by at most `maximum_turn`, halving the limit
/// when the target is behind and inside the turning circle. Returns the
/// turn applied.
pub fn creature_turn(item: &mut Item, target: WorldPos, maximum_turn: i16) -> i16 {
    if item.speed == 0 || maximum_turn <= 0 {
        return 0;
    }
    let x = target.x - item.pos.x;
    let z = target.z - item.pos.z;
    let mut angle = angle::atan(z, x).wrapping_sub(item.yaw);

    let mut limit = maximum_turn;
    let range = ((item.speed as i64) << 14) / maximum_turn as i64;
    let distance = x as i64 * x as i64 + z as i64 * z as i64;
    if (angle > FRONT_ARC || angle < -FRONT_ARC) && distance < range * range {
        limit >>= 1;
    }
    angle = angle.clamp(-limit, limit);
    item.yaw = item.yaw.wrapping_add(angle);
    angle
}

/// Move the head toward `required` by at most `max_change`, within `arc`
/// either side of straight ahead.
pub fn creature_head(creature: &mut CreatureState, required: i16, max_change: i16, arc: i16) {
    let (max_change, arc) = (max_change.max(0), arc.max(0));
    let change = required
        .wrapping_sub(creature.head_rotation)
        .clamp(-max_change, max_change);
    creature.head_rotation = creature.head_rotation.wrapping_add(change).clamp(-arc, arc);
}

/// Move `item` to `proposed` if its body fits there under the LOT's step
/// and drop limits, sliding or stopping it otherwise. Updates room and box.
pub fn creature_step(level: &Level, item: &mut Item, lot: &Lot, proposed: WorldPos, radius: i32, height: i32) -> CollType {
    let mut coll = if lot.class.flies() {
        CollisionInfo::unbounded(radius)
    } else {
        CollisionInfo::new(radius, -lot.drop, -lot.step, 0)
    };
    coll.old = item.pos;
    coll.facing = if proposed.x == item.pos.x && proposed.z == item.pos.z {
        item.yaw
    } else {
        angle::atan(proposed.z - item.pos.z, proposed.x - item.pos.x)
    };
    probe(level, &mut coll, proposed, item.room, height);

    let mut pos = coll.shifted(proposed);
    let mut room = item.room;
    level.resolve_sector(WorldPos::new(pos.x, pos.y - 10, pos.z), &mut room);
    if !lot.class.flies() {
        if let Some(floor) = level.height(pos, room).height {
            pos.y = floor;
        }
    }
    item.pos = pos;
    item.room = room;
    item.box_id = level.box_at(pos, room);
    coll.coll_type
}
