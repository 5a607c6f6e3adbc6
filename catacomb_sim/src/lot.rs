// LOT: per-creature box search and steering.
//
// A `Lot` ("line of travel") is one creature's scratch state over the box
// graph. The search runs *backwards*: it starts at the box the creature
// wants to reach (`required_box`) and expands outward through overlaps,
// recording in every box it reaches an `exit_box` that leads one step
// closer to the target. Once the creature's own box has been reached, the
// chain of exit boxes is its route. Expansion is bounded per call
// (`expansion` boxes), so a long search is spread over several ticks; the
// frontier survives between calls in the `head`/`tail` queue threaded
// through the nodes.
//
// Visited-marking uses a per-node generation stamp compared against the
// LOT's `search_number` rather than clearing every node between searches,
// so starting a new search is O(1). A box reached only through a blocked
// box carries the current stamp with `blocked` set; a later path that
// avoids the blockage overwrites it with an unblocked entry.
//
// `calculate_target` turns the route into a steering point: it walks exit
// boxes from the creature's box, clipping the point against each box edge
// the creature would have to cross, and reports whether it found a clear
// line to the goal (`Prime`), a corner to head for first (`Secondary`) or
// nothing usable (`NoTarget`).
//
// See also: `nav.rs` (boxes and zones), `targeting.rs` (mood logic that
// picks the goal boxes), `slots.rs` (which owns each creature's `Lot`).
//
// **Critical constraint: determinism.** Expansion order is queue order and
// overlap-list order; random points come from the core's `ControlRng`.

use crate::level::Level;
use crate::nav::{LocomotionClass, NavBox};
use crate::types::{BoxId, STEP_L, WALL_L, WorldPos, ZoneId};
use catacomb_prng::ControlRng;
use serde::{Deserialize, Serialize};

/// Inset from a box edge the steering point is kept at.
const BIFF: i32 = WALL_L / 4;

/// Per-box search record.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoxNode {
    /// Neighbor one step closer to the search's start box.
    pub exit_box: Option<BoxId>,
    /// Search generation that last reached this box.
    pub stamp: u32,
    /// Reached in generation `stamp` only through a blocked box.
    pub blocked: bool,
    /// Next box in the frontier queue.
    pub next_expansion: Option<BoxId>,
}

/// Result of one bounded search call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchProgress {
    /// The `stop_at` box has an unblocked route.
    Reached,
    /// Budget spent with frontier left.
    Pending,
    /// Frontier empty: everything reachable has been searched.
    Exhausted,
}

/// Kind of steering point `calculate_target` produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetType {
    /// Straight line to the goal point.
    Prime,
    /// An intermediate corner.
    Secondary,
    /// No route; a random point in the last reachable box.
    NoTarget,
}

const CLIP_LEFT: u8 = 1;
const CLIP_RIGHT: u8 = 2;
const CLIP_TOP: u8 = 4;
const CLIP_BOTTOM: u8 = 8;
const ALL_CLIP: u8 = CLIP_LEFT | CLIP_RIGHT | CLIP_TOP | CLIP_BOTTOM;
const SECONDARY_CLIP: u8 = 16;

/// One creature's search and steering state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    nodes: Vec<BoxNode>,
    /// Boxes sharing the creature's zone, filled by `create_zone`.
    pub zone_boxes: Vec<BoxId>,
    head: Option<BoxId>,
    tail: Option<BoxId>,
    search_number: u32,
    pub class: LocomotionClass,
    /// Largest rise between boxes (positive).
    pub step: i32,
    /// Deepest drop between boxes (negative).
    pub drop: i32,
    /// Vertical speed for flyers, 0 for ground creatures.
    pub fly: i32,
    /// Treat blockable boxes as blocked even when open.
    pub avoid_blockable: bool,
    pub target_box: Option<BoxId>,
    pub required_box: Option<BoxId>,
    /// Goal point inside `required_box`.
    pub target: WorldPos,
}

impl Lot {
    pub fn new(class: LocomotionClass, box_count: usize) -> Lot {
        let mut lot = Lot {
            nodes: vec![BoxNode::default(); box_count],
            zone_boxes: Vec::new(),
            head: None,
            tail: None,
            search_number: 0,
            class,
            step: class.step(),
            drop: class.drop(),
            fly: if class.flies() { STEP_L / 16 } else { 0 },
            avoid_blockable: false,
            target_box: None,
            required_box: None,
            target: WorldPos::ZERO,
        };
        lot.clear();
        lot
    }

    /// Forget every search and goal. Sink triggers call this before
    /// pointing the LOT somewhere new.
    pub fn clear(&mut self) {
        self.search_number = 0;
        self.head = None;
        self.tail = None;
        self.target_box = None;
        self.required_box = None;
        for node in &mut self.nodes {
            *node = BoxNode::default();
        }
    }

    pub fn node(&self, box_id: BoxId) -> Option<&BoxNode> {
        self.nodes.get(box_id.index())
    }

    pub fn search_number(&self) -> u32 {
        self.search_number
    }

    pub fn head(&self) -> Option<BoxId> {
        self.head
    }

    pub fn tail(&self) -> Option<BoxId> {
        self.tail
    }

    fn zones<'a>(&self, level: &'a Level) -> &'a [ZoneId] {
        level.zones.get(self.class, level.flipped)
    }

    /// Whether this LOT must route around `nav_box`.
    pub fn is_blocking(&self, nav_box: &NavBox) -> bool {
        nav_box.blocked || (self.avoid_blockable && nav_box.blockable)
    }

    /// Next box on the route from `box_id`, if the current search has one.
    pub fn route_exit(&self, box_id: BoxId) -> Option<BoxId> {
        let node = self.node(box_id)?;
        if node.stamp == self.search_number && !node.blocked {
            node.exit_box
        } else {
            None
        }
    }

    /// Whether `box_id` was reached by the current search only through a
    /// blocked box.
    pub fn blocked_route(&self, box_id: BoxId) -> bool {
        self.node(box_id)
            .is_some_and(|n| n.stamp == self.search_number && n.blocked)
    }

    /// Whether the current search has an unblocked route from `box_id`.
    pub fn has_route(&self, box_id: BoxId) -> bool {
        self.node(box_id)
            .is_some_and(|n| n.stamp == self.search_number && !n.blocked)
    }

    /// Record every box in the same zone as `box_id` (in either flip state)
    /// as this creature's reachable set.
    pub fn create_zone(&mut self, level: &Level, box_id: Option<BoxId>) {
        self.zone_boxes.clear();
        let Some(box_id) = box_id else { return };
        let zone = level.zones.get(self.class, false);
        let flip = level.zones.get(self.class, true);
        let (Some(&zone_id), Some(&flip_id)) = (zone.get(box_id.index()), flip.get(box_id.index()))
        else {
            return;
        };
        for (i, (&z, &f)) in zone.iter().zip(flip.iter()).enumerate() {
            if z == zone_id || f == flip_id {
                self.zone_boxes.push(BoxId(i as u16));
            }
        }
    }

    /// Aim at a random point inside `box_id` and make it the required box.
    pub fn target_box(&mut self, level: &Level, box_id: BoxId, rng: &mut ControlRng) {
        let Some(nav_box) = level.nav_box(box_id) else {
            return;
        };
        let z = nav_box.z_min + WALL_L / 2 + rng.scaled(nav_box.z_max - nav_box.z_min - WALL_L);
        let x = nav_box.x_min + WALL_L / 2 + rng.scaled(nav_box.x_max - nav_box.x_min - WALL_L);
        let y = if self.class.flies() {
            nav_box.height - STEP_L * 3 / 2
        } else {
            nav_box.height
        };
        self.target = WorldPos::new(x, y, z);
        self.required_box = Some(box_id);
    }

    /// Sink trigger: head for an exact point in `box_id`.
    pub fn sink_to(&mut self, box_id: BoxId, point: WorldPos) {
        self.clear();
        self.target = point;
        self.required_box = Some(box_id);
    }

    /// Start a new search if the required box changed, then expand.
    pub fn update(&mut self, level: &Level, expansion: u32, stop_at: Option<BoxId>) -> SearchProgress {
        if let Some(required) = self.required_box {
            if Some(required) != self.target_box && required.index() < self.nodes.len() {
                self.target_box = Some(required);
                self.begin_search(required);
            }
        }
        self.search(level, expansion, stop_at)
    }

    fn begin_search(&mut self, start: BoxId) {
        if self.search_number == u32::MAX {
            for node in &mut self.nodes {
                node.stamp = 0;
                node.blocked = false;
            }
            self.search_number = 0;
        }
        self.search_number += 1;

        let queued = self.nodes[start.index()].next_expansion.is_some() || self.tail == Some(start);
        if !queued {
            self.nodes[start.index()].next_expansion = self.head;
            if self.head.is_none() {
                self.tail = Some(start);
            }
            self.head = Some(start);
        }
        let node = &mut self.nodes[start.index()];
        node.stamp = self.search_number;
        node.blocked = false;
        node.exit_box = None;
    }

    /// Expand up to `expansion` frontier boxes. Stops early once `stop_at`
    /// has an unblocked route.
    pub fn search(&mut self, level: &Level, expansion: u32, stop_at: Option<BoxId>) -> SearchProgress {
        let zones = self.zones(level);
        let Some(first) = self.head else {
            self.tail = None;
            return SearchProgress::Exhausted;
        };
        let search_zone = zones.get(first.index()).copied();

        for _ in 0..expansion {
            if stop_at.is_some_and(|b| self.has_route(b)) {
                return SearchProgress::Reached;
            }
            let Some(head) = self.head else {
                self.tail = None;
                tracing::trace!(search = self.search_number, "box search exhausted");
                return SearchProgress::Exhausted;
            };
            let Some(head_box) = level.nav_box(head) else {
                self.head = None;
                continue;
            };
            let node = self.nodes[head.index()];

            for &neighbor in &head_box.overlaps {
                let n = neighbor.index();
                let Some(neighbor_box) = level.nav_box(neighbor) else {
                    continue;
                };
                if n >= self.nodes.len() || zones.get(n).copied() != search_zone {
                    continue;
                }
                let change = neighbor_box.height - head_box.height;
                if change > self.step || change < self.drop {
                    continue;
                }

                let expand = self.nodes[n];
                if node.stamp < expand.stamp {
                    continue;
                }
                if node.blocked {
                    if node.stamp == expand.stamp {
                        continue;
                    }
                    let e = &mut self.nodes[n];
                    e.stamp = node.stamp;
                    e.blocked = true;
                } else {
                    if node.stamp == expand.stamp && !expand.blocked {
                        continue;
                    }
                    let blocking = self.is_blocking(neighbor_box);
                    let e = &mut self.nodes[n];
                    e.stamp = node.stamp;
                    e.blocked = blocking;
                    if !blocking {
                        e.exit_box = Some(head);
                    }
                }

                if self.nodes[n].next_expansion.is_none() && self.tail != Some(neighbor) {
                    if let Some(tail) = self.tail {
                        self.nodes[tail.index()].next_expansion = Some(neighbor);
                    }
                    self.tail = Some(neighbor);
                }
            }

            self.head = self.nodes[head.index()].next_expansion;
            self.nodes[head.index()].next_expansion = None;
            if self.head.is_none() {
                self.tail = None;
            }
        }

        if stop_at.is_some_and(|b| self.has_route(b)) {
            SearchProgress::Reached
        } else if self.head.is_none() {
            SearchProgress::Exhausted
        } else {
            SearchProgress::Pending
        }
    }

    /// Advance the search, then compute where a creature at `pos` in
    /// `item_box` should steer.
    pub fn calculate_target(
        &mut self,
        level: &Level,
        pos: WorldPos,
        item_box: Option<BoxId>,
        expansion: u32,
        rng: &mut ControlRng,
    ) -> (TargetType, WorldPos) {
        self.update(level, expansion, item_box);

        let mut target = pos;
        let Some(mut box_id) = item_box else {
            return (TargetType::NoTarget, target);
        };
        let Some(start) = level.nav_box(box_id) else {
            return (TargetType::NoTarget, target);
        };

        let (mut left, mut right, mut top, mut bottom) = (start.z_min, start.z_max, start.x_min, start.x_max);
        let mut prime_free = ALL_CLIP;
        let mut last = start;

        for _ in 0..=level.boxes.len() {
            let Some(nav_box) = level.nav_box(box_id) else {
                break;
            };
            last = nav_box;

            let ceiling = if self.class.flies() {
                nav_box.height - WALL_L
            } else {
                nav_box.height
            };
            if target.y > ceiling {
                target.y = ceiling;
            }

            let (box_left, box_right, box_top, box_bottom) =
                (nav_box.z_min, nav_box.z_max, nav_box.x_min, nav_box.x_max);
            let inside_z = pos.z >= box_left && pos.z <= box_right;
            let inside_x = pos.x >= box_top && pos.x <= box_bottom;

            if inside_z && inside_x {
                (left, right, top, bottom) = (box_left, box_right, box_top, box_bottom);
            } else {
                if pos.z < box_left {
                    if prime_free & CLIP_LEFT != 0 && inside_x {
                        target.z = target.z.max(box_left + BIFF);
                        if prime_free & SECONDARY_CLIP != 0 {
                            return (TargetType::Secondary, target);
                        }
                        top = top.max(box_top);
                        bottom = bottom.min(box_bottom);
                        prime_free = CLIP_LEFT;
                    } else if prime_free != CLIP_LEFT {
                        target.z = right - BIFF;
                        if prime_free != ALL_CLIP {
                            return (TargetType::Secondary, target);
                        }
                        prime_free |= SECONDARY_CLIP;
                    }
                } else if pos.z > box_right {
                    if prime_free & CLIP_RIGHT != 0 && inside_x {
                        target.z = target.z.min(box_right - BIFF);
                        if prime_free & SECONDARY_CLIP != 0 {
                            return (TargetType::Secondary, target);
                        }
                        top = top.max(box_top);
                        bottom = bottom.min(box_bottom);
                        prime_free = CLIP_RIGHT;
                    } else if prime_free != CLIP_RIGHT {
                        target.z = left + BIFF;
                        if prime_free != ALL_CLIP {
                            return (TargetType::Secondary, target);
                        }
                        prime_free |= SECONDARY_CLIP;
                    }
                }

                if pos.x < box_top {
                    if prime_free & CLIP_TOP != 0 && inside_z {
                        target.x = target.x.max(box_top + BIFF);
                        if prime_free & SECONDARY_CLIP != 0 {
                            return (TargetType::Secondary, target);
                        }
                        left = left.max(box_left);
                        right = right.min(box_right);
                        prime_free = CLIP_TOP;
                    } else if prime_free != CLIP_TOP {
                        target.x = bottom - BIFF;
                        if prime_free != ALL_CLIP {
                            return (TargetType::Secondary, target);
                        }
                        prime_free |= SECONDARY_CLIP;
                    }
                } else if pos.x > box_bottom {
                    if prime_free & CLIP_BOTTOM != 0 && inside_z {
                        target.x = target.x.min(box_bottom - BIFF);
                        if prime_free & SECONDARY_CLIP != 0 {
                            return (TargetType::Secondary, target);
                        }
                        left = left.max(box_left);
                        right = right.min(box_right);
                        prime_free = CLIP_BOTTOM;
                    } else if prime_free != CLIP_BOTTOM {
                        target.x = top + BIFF;
                        if prime_free != ALL_CLIP {
                            return (TargetType::Secondary, target);
                        }
                        prime_free |= SECONDARY_CLIP;
                    }
                }
            }

            if Some(box_id) == self.target_box {
                if prime_free & (CLIP_LEFT | CLIP_RIGHT) != 0 {
                    target.z = self.target.z;
                } else if prime_free & SECONDARY_CLIP == 0 {
                    target.z = clamp_inset(target.z, box_left, box_right);
                }
                if prime_free & (CLIP_TOP | CLIP_BOTTOM) != 0 {
                    target.x = self.target.x;
                } else if prime_free & SECONDARY_CLIP == 0 {
                    target.x = clamp_inset(target.x, box_top, box_bottom);
                }
                target.y = self.target.y;
                return (TargetType::Prime, target);
            }

            let Some(next) = self.nodes.get(box_id.index()).and_then(|n| n.exit_box) else {
                break;
            };
            if level.nav_box(next).is_some_and(|b| self.is_blocking(b)) {
                break;
            }
            box_id = next;
        }

        // No clear route: wander inside the last box that was reachable.
        if prime_free & (CLIP_LEFT | CLIP_RIGHT) != 0 {
            target.z = last.z_min + WALL_L / 2 + rng.scaled(last.z_max - last.z_min - WALL_L);
        } else if prime_free & SECONDARY_CLIP == 0 {
            target.z = clamp_inset(target.z, last.z_min, last.z_max);
        }
        if prime_free & (CLIP_TOP | CLIP_BOTTOM) != 0 {
            target.x = last.x_min + WALL_L / 2 + rng.scaled(last.x_max - last.x_min - WALL_L);
        } else if prime_free & SECONDARY_CLIP == 0 {
            target.x = clamp_inset(target.x, last.x_min, last.x_max);
        }
        target.y = if self.class.flies() {
            last.height - STEP_L * 2
        } else {
            last.height
        };
        tracing::trace!(box_id = box_id.0, "no route to target box");
        (TargetType::NoTarget, target)
    }
}

fn clamp_inset(v: i32, min: i32, max: i32) -> i32 {
    if v < min + BIFF {
        min + BIFF
    } else if v > max - BIFF {
        max - BIFF
    } else {
        v
    }
}
