// Level geometry: rooms, sectors, and the sector grid query.
//
// A level is a set of rooms. Each room is a rectangular grid of sectors
// (`WALL_L` x `WALL_L` columns) anchored at a world-space origin. A sector
// carries its floor and ceiling heights (world units, Y down), optional
// floor/ceiling tilt, the navigation box it belongs to, the floor-script
// index the trigger interpreter runs when something stands on it, and up to
// three links:
//
// - `portal`: horizontal door redirection. A query that lands on a portal
//   sector continues in the linked room at the same (x, z).
// - `pit_room`: the room below, reached when the query point is at or
//   below this sector's floor.
// - `sky_room`: the room above, reached when the query point is above this
//   sector's ceiling.
//
// The `SectorGrid` trait is the seam the collision probe, static collider
// and creature layer query through. Implementors supply only
// `room_sector`; portal/pit/sky chasing and tilt interpolation are the
// trait's provided methods, so test doubles stay tiny. `Level` is the
// concrete implementation and also owns the navigation boxes, zone tables
// and static collision descriptions loaded with the geometry.
//
// Coordinates outside a room clamp to its border sectors, which a
// well-formed room fills with solid walls or portals.
//
// See also: `collision.rs` (probe), `nav.rs` (boxes and zones),
// `statics.rs` (static meshes), `error.rs` (`LevelError`).
//
// **Critical constraint: determinism.** All lookups are integer arithmetic
// over immutable-after-load data; link chasing is bounded by the room count.

use crate::error::LevelError;
use crate::nav::{NavBox, ZoneTables};
use crate::statics::{StaticInfo, StaticMesh};
use crate::types::{BoxId, RoomId, StaticId, WALL_L, WALL_SHIFT, WorldPos};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Sectors
// ---------------------------------------------------------------------------

/// Slope of a floor or ceiling across one sector, in quarter-click units per
/// sector (a tilt of 4 drops one full `STEP_L` from edge to edge).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tilt {
    pub x: i8,
    pub z: i8,
}

impl Tilt {
    pub const FLAT: Tilt = Tilt { x: 0, z: 0 };

    pub fn kind(self) -> HeightType {
        let (ax, az) = (self.x.unsigned_abs(), self.z.unsigned_abs());
        if ax > 2 || az > 2 {
            HeightType::BigSlope
        } else if ax > 0 || az > 0 {
            HeightType::SmallSlope
        } else {
            HeightType::Flat
        }
    }

    /// Height offset of a floor with this tilt at the in-sector fractions
    /// `(fx, fz)`, each in `0..WALL_L`.
    fn floor_offset(self, fx: i32, fz: i32) -> i32 {
        axis_offset(self.x as i32, fx) + axis_offset(self.z as i32, fz)
    }

    /// Ceilings slope the opposite way round.
    fn ceiling_offset(self, fx: i32, fz: i32) -> i32 {
        -self.floor_offset(fx, fz)
    }
}

fn axis_offset(tilt: i32, frac: i32) -> i32 {
    if tilt < 0 {
        -((tilt * frac) >> 2)
    } else {
        (tilt * (WALL_L - 1 - frac)) >> 2
    }
}

/// How steep the floor under a probe point is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeightType {
    #[default]
    Flat,
    SmallSlope,
    BigSlope,
}

/// One grid cell of a room.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sector {
    pub floor: i32,
    pub ceiling: i32,
    pub floor_tilt: Tilt,
    pub ceiling_tilt: Tilt,
    pub box_id: Option<BoxId>,
    pub floor_script: Option<u16>,
    pub portal: Option<RoomId>,
    pub pit_room: Option<RoomId>,
    pub sky_room: Option<RoomId>,
    /// Solid rock. Height queries on a solid sector miss.
    pub solid: bool,
}

impl Sector {
    pub const WALL: Sector = Sector {
        floor: 0,
        ceiling: 0,
        floor_tilt: Tilt::FLAT,
        ceiling_tilt: Tilt::FLAT,
        box_id: None,
        floor_script: None,
        portal: None,
        pit_room: None,
        sky_room: None,
        solid: true,
    };

    /// An open sector with a flat floor and ceiling.
    pub fn open(floor: i32, ceiling: i32) -> Sector {
        Sector {
            floor,
            ceiling,
            solid: false,
            ..Sector::WALL
        }
    }

    pub fn with_box(mut self, box_id: BoxId) -> Sector {
        self.box_id = Some(box_id);
        self
    }
}

/// Floor reading at a point, as the probe consumes it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FloorSample {
    /// `None` when the point is inside solid geometry.
    pub height: Option<i32>,
    pub kind: HeightType,
    pub tilt: Tilt,
    /// Floor script of the sector the height came from.
    pub trigger: Option<u16>,
}

impl FloorSample {
    pub const MISS: FloorSample = FloorSample {
        height: None,
        kind: HeightType::Flat,
        tilt: Tilt::FLAT,
        trigger: None,
    };
}

// ---------------------------------------------------------------------------
// Rooms
// ---------------------------------------------------------------------------

/// A rectangular grid of sectors plus the static meshes placed in it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Room {
    pub origin_x: i32,
    pub origin_z: i32,
    /// Sectors along X.
    pub size_x: u16,
    /// Sectors along Z.
    pub size_z: u16,
    /// Indexed `ix * size_z + iz`.
    pub sectors: Vec<Sector>,
    pub statics: Vec<StaticMesh>,
}

impl Room {
    /// A room whose border ring is solid wall and whose interior is open
    /// floor at `floor` under a ceiling at `ceiling`.
    pub fn open(
        origin_x: i32,
        origin_z: i32,
        size_x: u16,
        size_z: u16,
        floor: i32,
        ceiling: i32,
    ) -> Room {
        let mut sectors = Vec::with_capacity(size_x as usize * size_z as usize);
        for ix in 0..size_x {
            for iz in 0..size_z {
                let border = ix == 0 || iz == 0 || ix + 1 == size_x || iz + 1 == size_z;
                sectors.push(if border {
                    Sector::WALL
                } else {
                    Sector::open(floor, ceiling)
                });
            }
        }
        Room {
            origin_x,
            origin_z,
            size_x,
            size_z,
            sectors,
            statics: Vec::new(),
        }
    }

    /// Grid indices of the sector containing world `(x, z)`, clamped to the
    /// room's extent.
    pub fn sector_index(&self, x: i32, z: i32) -> (u16, u16) {
        let ix = ((x - self.origin_x) >> WALL_SHIFT).min(self.size_x as i32 - 1).max(0);
        let iz = ((z - self.origin_z) >> WALL_SHIFT).min(self.size_z as i32 - 1).max(0);
        (ix as u16, iz as u16)
    }

    pub fn sector(&self, ix: u16, iz: u16) -> Option<&Sector> {
        if ix >= self.size_x || iz >= self.size_z {
            return None;
        }
        self.sectors
            .get(ix as usize * self.size_z as usize + iz as usize)
    }

    pub fn sector_mut(&mut self, ix: u16, iz: u16) -> Option<&mut Sector> {
        if ix >= self.size_x || iz >= self.size_z {
            return None;
        }
        self.sectors
            .get_mut(ix as usize * self.size_z as usize + iz as usize)
    }

    pub fn sector_at(&self, x: i32, z: i32) -> Option<&Sector> {
        let (ix, iz) = self.sector_index(x, z);
        self.sector(ix, iz)
    }

    /// True when world `(x, z)` lies inside the room's footprint.
    pub fn contains(&self, x: i32, z: i32) -> bool {
        x >= self.origin_x
            && z >= self.origin_z
            && x < self.origin_x + self.size_x as i32 * WALL_L
            && z < self.origin_z + self.size_z as i32 * WALL_L
    }
}

// ---------------------------------------------------------------------------
// Grid query
// ---------------------------------------------------------------------------

/// Read access to the sector grid.
pub trait SectorGrid {
    /// Sector at `(x, z)` in `room`, clamped to the room border. `None` only
    /// for an unknown room.
    fn room_sector(&self, room: RoomId, x: i32, z: i32) -> Option<Sector>;

    /// Upper bound on link hops; protects against cyclic level data.
    fn max_hops(&self) -> usize;

    /// Find the sector at `pos`, following door portals and then pit or
    /// sky links vertically. `room` is updated to the room actually
    /// containing the point.
    fn resolve_sector(&self, pos: WorldPos, room: &mut RoomId) -> Sector {
        let hops = self.max_hops();
        let Some(mut sector) = self.room_sector(*room, pos.x, pos.z) else {
            return Sector::WALL;
        };

        for _ in 0..hops {
            let Some(door) = sector.portal else { break };
            let Some(next) = self.room_sector(door, pos.x, pos.z) else {
                break;
            };
            *room = door;
            sector = next;
        }

        if pos.y >= sector.floor {
            for _ in 0..hops {
                let Some(pit) = sector.pit_room else { break };
                let Some(next) = self.room_sector(pit, pos.x, pos.z) else {
                    break;
                };
                *room = pit;
                sector = next;
                if pos.y < sector.floor {
                    break;
                }
            }
        } else if pos.y < sector.ceiling {
            for _ in 0..hops {
                let Some(sky) = sector.sky_room else { break };
                let Some(next) = self.room_sector(sky, pos.x, pos.z) else {
                    break;
                };
                *room = sky;
                sector = next;
                if pos.y >= sector.ceiling {
                    break;
                }
            }
        }
        sector
    }

    /// Floor under `pos`: the lowest floor reachable by falling through pit
    /// links from the sector containing `pos`.
    fn height(&self, pos: WorldPos, room: RoomId) -> FloorSample {
        let mut room = room;
        let mut sector = self.resolve_sector(pos, &mut room);
        for _ in 0..self.max_hops() {
            let Some(pit) = sector.pit_room else { break };
            let Some(next) = self.room_sector(pit, pos.x, pos.z) else {
                break;
            };
            sector = next;
        }
        if sector.solid {
            return FloorSample::MISS;
        }
        let (fx, fz) = (pos.x & (WALL_L - 1), pos.z & (WALL_L - 1));
        FloorSample {
            height: Some(sector.floor + sector.floor_tilt.floor_offset(fx, fz)),
            kind: sector.floor_tilt.kind(),
            tilt: sector.floor_tilt,
            trigger: sector.floor_script,
        }
    }

    /// Ceiling over `pos`: the highest ceiling reachable through sky links.
    fn ceiling(&self, pos: WorldPos, room: RoomId) -> Option<i32> {
        let mut room = room;
        let mut sector = self.resolve_sector(pos, &mut room);
        for _ in 0..self.max_hops() {
            let Some(sky) = sector.sky_room else { break };
            let Some(next) = self.room_sector(sky, pos.x, pos.z) else {
                break;
            };
            sector = next;
        }
        if sector.solid {
            return None;
        }
        let (fx, fz) = (pos.x & (WALL_L - 1), pos.z & (WALL_L - 1));
        Some(sector.ceiling + sector.ceiling_tilt.ceiling_offset(fx, fz))
    }

    /// Navigation box of the sector containing `pos`.
    fn box_at(&self, pos: WorldPos, room: RoomId) -> Option<BoxId> {
        let mut room = room;
        self.resolve_sector(pos, &mut room).box_id
    }
}

/// Static meshes by room, and their collision descriptions.
pub trait StaticGeometry {
    fn statics_in(&self, room: RoomId) -> &[StaticMesh];
    fn static_info(&self, id: StaticId) -> Option<&StaticInfo>;
}

// ---------------------------------------------------------------------------
// Level
// ---------------------------------------------------------------------------

/// Everything loaded with a level that the spatial core reads.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Level {
    pub rooms: Vec<Room>,
    pub boxes: Vec<NavBox>,
    pub zones: ZoneTables,
    pub static_infos: Vec<StaticInfo>,
    /// Whether the alternate ("flipped") geometry state is active. Selects
    /// which zone table variant reachability reads.
    pub flipped: bool,
}

impl Level {
    /// Validate and assemble a level.
    pub fn new(
        rooms: Vec<Room>,
        boxes: Vec<NavBox>,
        zones: ZoneTables,
        static_infos: Vec<StaticInfo>,
    ) -> Result<Level, LevelError> {
        let level = Level {
            rooms,
            boxes,
            zones,
            static_infos,
            flipped: false,
        };
        if let Err(err) = level.check() {
            tracing::warn!(%err, "rejected level data");
            return Err(err);
        }
        Ok(level)
    }

    /// Like `new`, but computes the zone tables from the box graph. Boxes in
    /// `flip_closed` are impassable while the level is flipped.
    pub fn with_flood_zones(
        rooms: Vec<Room>,
        boxes: Vec<NavBox>,
        static_infos: Vec<StaticInfo>,
        flip_closed: &[BoxId],
    ) -> Result<Level, LevelError> {
        let zones = ZoneTables::flood_fill(&boxes, flip_closed);
        Self::new(rooms, boxes, zones, static_infos)
    }

    fn check(&self) -> Result<(), LevelError> {
        let room_count = self.rooms.len();
        let box_count = self.boxes.len();

        for (r, room) in self.rooms.iter().enumerate() {
            let r = r as u16;
            let expected = room.size_x as usize * room.size_z as usize;
            if room.sectors.len() != expected {
                return Err(LevelError::SectorCountMismatch {
                    room: r,
                    expected,
                    actual: room.sectors.len(),
                });
            }
            for (i, sector) in room.sectors.iter().enumerate() {
                if let Some(b) = sector.box_id {
                    if b.index() >= box_count {
                        return Err(LevelError::SectorBoxOutOfRange {
                            room: r,
                            sector: i,
                            box_id: b.0,
                            box_count,
                        });
                    }
                }
                for link in [sector.portal, sector.pit_room, sector.sky_room]
                    .into_iter()
                    .flatten()
                {
                    if link.index() >= room_count {
                        return Err(LevelError::UnknownRoomLink {
                            room: r,
                            target: link.0,
                        });
                    }
                }
            }
            for (i, mesh) in room.statics.iter().enumerate() {
                if mesh.static_id.index() >= self.static_infos.len() {
                    return Err(LevelError::UnknownStaticInfo {
                        room: r,
                        index: i,
                        static_id: mesh.static_id.0,
                    });
                }
            }
        }

        for (b, nav_box) in self.boxes.iter().enumerate() {
            for overlap in &nav_box.overlaps {
                if overlap.index() >= box_count {
                    return Err(LevelError::UnknownOverlap {
                        from: b as u16,
                        to: overlap.0,
                    });
                }
            }
        }

        self.zones.check_len(box_count)
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(id.index())
    }

    pub fn room_mut(&mut self, id: RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id.index())
    }

    pub fn nav_box(&self, id: BoxId) -> Option<&NavBox> {
        self.boxes.get(id.index())
    }

    /// Scripted height change (lift, raising block): move one sector's floor.
    pub fn set_floor(&mut self, room: RoomId, ix: u16, iz: u16, floor: i32) -> bool {
        match self.room_mut(room).and_then(|r| r.sector_mut(ix, iz)) {
            Some(sector) => {
                sector.floor = floor;
                true
            }
            None => false,
        }
    }

    /// Room whose footprint contains `(x, z)`, searching in load order.
    /// Used to seed a room for bodies placed without one.
    pub fn room_containing(&self, x: i32, z: i32) -> Option<RoomId> {
        self.rooms
            .iter()
            .position(|r| r.contains(x, z))
            .map(|i| RoomId(i as u16))
    }
}

impl SectorGrid for Level {
    fn room_sector(&self, room: RoomId, x: i32, z: i32) -> Option<Sector> {
        self.room(room)?.sector_at(x, z).copied()
    }

    fn max_hops(&self) -> usize {
        self.rooms.len().max(1)
    }
}

impl StaticGeometry for Level {
    fn statics_in(&self, room: RoomId) -> &[StaticMesh] {
        self.room(room).map(|r| r.statics.as_slice()).unwrap_or(&[])
    }

    fn static_info(&self, id: StaticId) -> Option<&StaticInfo> {
        self.static_infos.get(id.index())
    }
}
