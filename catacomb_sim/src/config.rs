// Data-driven core configuration.
//
// Every tunable of the spatial core lives in `CoreConfig`, loaded from JSON
// (or taken from `Default`, which carries the engine's stock constants). The
// core reads thresholds, slot capacity, mood chances and distances from here
// rather than hard-coding them, so balance changes do not need a rebuild.
//
// Collision thresholds for the player body are grouped into
// `CollisionDefaults`. Per-object-kind data (radius, locomotion class,
// collision routine) lives in the `objects` table, one `ObjectInfo` per
// object id; see `object.rs`.
//
// See also: `sim.rs` which owns the `CoreConfig` as part of `Core`,
// `object.rs` for `ObjectInfo`, `error.rs` for `ConfigError`.
//
// **Critical constraint: determinism.** Config values feed directly into
// simulation logic. Two cores with identical configs, levels and inputs make
// identical decisions.

use crate::angle::{ANGLE_90, DEG_1};
use crate::error::ConfigError;
use crate::nav::LocomotionClass;
use crate::object::{CollisionKind, ObjectInfo};
use crate::types::{ObjectId, STEP_L, WALL_L};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;

/// "Anything goes" floor bound: a drop this deep is never treated as a wall.
pub const NO_BAD_POS: i32 = -(i16::MIN as i32) - 256;
/// "Anything goes" step bound.
pub const NO_BAD_NEG: i32 = -NO_BAD_POS;

/// Thresholds the player's probe and the pusher run with.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionDefaults {
    /// Cylinder radius of the player body.
    pub player_radius: i32,
    /// Cylinder height of the player body.
    pub player_height: i32,
    /// Deepest floor drop (positive, below the body) still considered walkable.
    pub bad_pos: i32,
    /// Highest floor rise (negative, above the body's feet) still walkable.
    pub bad_neg: i32,
    /// Ceiling clearance above which a probe point counts as blocked.
    pub bad_ceiling: i32,
    /// Extra radius/height added when enumerating rooms for statics.
    pub static_margin: i32,
    /// Frames of hit-reaction animation started by a tall push.
    pub hit_frames: u8,
}

impl Default for CollisionDefaults {
    fn default() -> Self {
        Self {
            player_radius: 100,
            player_height: 762,
            bad_pos: NO_BAD_POS,
            bad_neg: -(STEP_L + STEP_L / 2),
            bad_ceiling: 0,
            static_margin: 50,
            hit_frames: 34,
        }
    }
}

/// Top-level configuration of the spatial core.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Milliseconds of game time per logic tick.
    pub tick_duration_ms: u32,
    /// Capacity of the creature slot pool.
    pub max_creatures: usize,
    /// Right shift applied to coordinates before squaring camera distances
    /// for eviction.
    pub camera_distance_shift: u32,
    /// Boxes a LOT may expand per search call.
    pub expansion_budget: u32,
    /// Right shift applied before squaring target distances.
    pub target_distance_shift: u32,
    /// A creature keeps its current enemy while that enemy's shifted squared
    /// distance is within this many units of the best candidate's.
    pub target_hysteresis: i64,
    /// Per-tick chance (in control units) that a hurt timid creature bolts.
    pub escape_chance: i32,
    /// Per-tick chance that an escaping creature recovers its nerve.
    pub recover_chance: i32,
    /// Minimum distance an escape box must put between creature and enemy.
    pub escape_distance: i32,
    /// Distance at which a stalking creature circles its enemy.
    pub stalk_distance: i32,
    /// Squared distance inside which an unreachable enemy still provokes attack.
    pub attack_range: i64,
    /// Largest neck rotation change per tick.
    pub max_head_change: i16,
    /// Half-width of the arc the neck may look across.
    pub head_arc: i16,
    pub collision: CollisionDefaults,
    /// One entry per object kind, keyed by `ObjectInfo::id`.
    pub objects: Vec<ObjectInfo>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        let objects = vec![
            ObjectInfo {
                id: ObjectId(0),
                name: "player".into(),
                intelligent: false,
                collision: CollisionKind::None,
                locomotion: LocomotionClass::Walk,
                radius: 100,
                height: 762,
                pivot_length: 0,
                hit_points: 1000,
                smartness: 0,
                violent: false,
                turn_rate: DEG_1 * 4,
            },
            ObjectInfo {
                id: ObjectId(1),
                name: "wolf".into(),
                intelligent: true,
                collision: CollisionKind::Creature,
                locomotion: LocomotionClass::Walk,
                radius: 340,
                height: 400,
                pivot_length: 375,
                hit_points: 6,
                smartness: 0x2000,
                violent: true,
                turn_rate: DEG_1 * 2,
            },
            ObjectInfo {
                id: ObjectId(2),
                name: "bat".into(),
                intelligent: true,
                collision: CollisionKind::Creature,
                locomotion: LocomotionClass::Fly,
                radius: 102,
                height: 200,
                pivot_length: 0,
                hit_points: 1,
                smartness: 0,
                violent: true,
                turn_rate: DEG_1 * 20,
            },
            ObjectInfo {
                id: ObjectId(3),
                name: "ape".into(),
                intelligent: true,
                collision: CollisionKind::Creature,
                locomotion: LocomotionClass::Climb,
                radius: 250,
                height: 600,
                pivot_length: 250,
                hit_points: 22,
                smartness: 0x4000,
                violent: false,
                turn_rate: DEG_1 * 5,
            },
            ObjectInfo {
                id: ObjectId(4),
                name: "crate".into(),
                intelligent: false,
                collision: CollisionKind::Object,
                locomotion: LocomotionClass::Walk,
                radius: 512,
                height: WALL_L,
                pivot_length: 0,
                hit_points: 0,
                smartness: 0,
                violent: false,
                turn_rate: 0,
            },
        ];

        Self {
            tick_duration_ms: 33,
            max_creatures: 5,
            camera_distance_shift: 8,
            expansion_budget: 5,
            target_distance_shift: 6,
            target_hysteresis: 1024,
            escape_chance: 0x800,
            recover_chance: 0x100,
            escape_distance: WALL_L * 5,
            stalk_distance: WALL_L * 3,
            attack_range: (WALL_L as i64 * 3) * (WALL_L as i64 * 3),
            max_head_change: DEG_1 * 5,
            head_arc: ANGLE_90,
            collision: CollisionDefaults::default(),
            objects,
        }
    }
}

impl CoreConfig {
    /// Parse and validate a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: CoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_json(&text)?;
        tracing::debug!(
            path = %path.display(),
            objects = config.objects.len(),
            max_creatures = config.max_creatures,
            "loaded core config"
        );
        Ok(config)
    }

    /// Reject values the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_duration_ms == 0 {
            return Err(invalid("tick_duration_ms", "must be at least 1"));
        }
        if self.max_creatures == 0 {
            return Err(invalid("max_creatures", "must be at least 1"));
        }
        if self.max_creatures > u8::MAX as usize {
            return Err(invalid(
                "max_creatures",
                format!("must be at most {}", u8::MAX),
            ));
        }
        if self.expansion_budget == 0 {
            return Err(invalid("expansion_budget", "must be at least 1"));
        }
        if self.camera_distance_shift > 16 || self.target_distance_shift > 16 {
            return Err(invalid("distance shift", "must be at most 16"));
        }
        let mut seen = BTreeSet::new();
        for info in &self.objects {
            if !seen.insert(info.id) {
                return Err(invalid("objects", format!("duplicate object id {}", info.id.0)));
            }
            if info.radius < 0 {
                return Err(invalid("objects", format!("{} has a negative radius", info.name)));
            }
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
