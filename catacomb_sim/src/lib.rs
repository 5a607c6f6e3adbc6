// catacomb_sim: deterministic spatial core for a sector-grid action game.
//
// This crate answers where things are, where they may go, and what they
// bump into: room and sector geometry, the collision probe, body-on-body
// pushing, creature navigation over the box graph (LOT search and steering
// targets), creature slot management and the per-creature targeting
// primitives. Rendering, animation, audio, input and save files live
// elsewhere and talk to this crate through `sim::Core`.
//
// Module overview:
// - `sim.rs`:       Core: owns level, items, slots and PRNG; tick loop and entry points.
// - `types.rs`:     World units, WorldPos, BoundingBox, id newtypes.
// - `angle.rs`:     16-bit binary angles, fixed-point trig, facing quadrants.
// - `level.rs`:     Rooms, sectors, portals, floor/ceiling sampling (SectorGrid).
// - `nav.rs`:       Navigation boxes, locomotion classes, zone tables.
// - `neighbors.rs`: Rooms touched by a body's bounding box.
// - `statics.rs`:   Static mesh (pillar, furniture) cylinder collider.
// - `collision.rs`: The collision probe: four-point clearance and shift.
// - `push.rs`:      Pushing the player out of another body's box.
// - `object.rs`:    Per-kind object data and collision routines.
// - `item.rs`:      Item and ItemTable.
// - `lot.rs`:       Per-creature breadth-first box search and steering target.
// - `slots.rs`:     Bounded creature slot pool with camera-distance eviction.
// - `targeting.rs`: Enemy selection, AI info, mood, turning, head tracking, stepping.
// - `config.rs`:    CoreConfig, collision defaults and the object table.
// - `error.rs`:     ConfigError and LevelError.
// - `prng`:         Re-exported from `catacomb_prng`: the control-random LCG.
//
// **Critical constraint: determinism.** Given the same level, config, seed
// and inputs, every run produces identical positions, slot assignments and
// creature decisions. All randomness comes from the single control PRNG.
// No `HashMap`, no floating point in the tick path, no system time.

pub mod angle;
pub mod collision;
pub mod config;
pub mod error;
pub mod item;
pub mod level;
pub mod lot;
pub mod nav;
pub mod neighbors;
pub mod object;
pub mod push;
pub mod sim;
pub mod slots;
pub mod statics;
pub mod targeting;
pub mod types;

pub use catacomb_prng as prng;
