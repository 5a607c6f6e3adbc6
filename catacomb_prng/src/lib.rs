// Deterministic control-random generator for the spatial core.
//
// Implements the classic 32-bit linear congruential generator the engine
// family uses for gameplay ("control") randomness: multiplier 0x41C64E6D,
// increment 0x3039, output taken from bits 10..25 as a 15-bit value in
// `0..=0x7FFF`. Every consumer scales that value with a right shift by 15
// (`value * n >> 15`), which is why the generator exposes `scaled()` rather
// than float ranges.
//
// The creature layer draws from this stream for mood transitions, random
// box picks and target points inside boxes. Rendering-side randomness is
// a separate stream and out of scope for this crate.
//
// **Critical constraint: determinism.** Every method on `ControlRng` must
// produce identical output given the same prior state, on every platform.
// No floating point, no stdlib RNG, no OS entropy.

use serde::{Deserialize, Serialize};

/// Seed the generator starts from when a level is loaded without an
/// explicit seed.
pub const DEFAULT_SEED: u32 = 0xD371_F947;

/// One past the largest value `next()` can return.
pub const CONTROL_RANGE: i32 = 0x8000;

/// Linear congruential generator producing 15-bit control values.
///
/// The sim owns exactly one `ControlRng`; all creature decisions draw from
/// it in a fixed per-tick order, so two runs with the same seed and the same
/// inputs make the same choices.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlRng {
    state: u32,
}

impl Default for ControlRng {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

impl ControlRng {
    /// Create a generator from a 32-bit seed.
    pub fn new(seed: u32) -> Self {
        Self { state: seed }
    }

    /// Reseed in place. Used when a level restarts.
    pub fn reseed(&mut self, seed: u32) {
        self.state = seed;
    }

    /// Next control value in `0..CONTROL_RANGE`.
    pub fn next(&mut self) -> i32 {
        self.state = self
            .state
            .wrapping_mul(0x41C6_4E6D)
            .wrapping_add(0x3039);
        ((self.state >> 10) & 0x7FFF) as i32
    }

    /// Uniform value in `0..n` using the engine's `value * n >> 15` scaling.
    ///
    /// Returns 0 when `n <= 0`, so callers picking from an empty list get a
    /// harmless index they must still bounds-check.
    pub fn scaled(&mut self, n: i32) -> i32 {
        if n <= 0 {
            // Keep the stream advancing the same number of times regardless
            // of the argument.
            self.next();
            return 0;
        }
        ((self.next() as i64 * n as i64) >> 15) as i32
    }

    /// `true` when the next control value falls below `threshold`.
    ///
    /// `threshold` is in control units: 0 never fires, `CONTROL_RANGE`
    /// always fires.
    pub fn chance(&mut self, threshold: i32) -> bool {
        self.next() < threshold
    }

    /// Raw generator state, for snapshots and debugging overlays.
    pub fn state(&self) -> u32 {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn determinism_same_seed_same_output() {
        let mut a = ControlRng::new(42);
        let mut b = ControlRng::new(42);
        for _ in 0..1000 {
            assert_eq!(a.next(), b.next());
        }
    }

    #[test]
    fn known_sequence_from_default_seed() {
        // If this ever changes, saved demos and replays stop matching.
        let mut rng = ControlRng::default();
        let vals: Vec<i32> = (0..5).map(|_| rng.next()).collect();
        assert_eq!(vals, vec![22845, 8066, 21794, 21176, 9597]);
    }

    #[test]
    fn known_sequence_from_seed_42() {
        let mut rng = ControlRng::new(42);
        let vals: Vec<i32> = (0..5).map(|_| rng.next()).collect();
        assert_eq!(vals, vec![8771, 8794, 26951, 23933, 2076]);
    }

    #[test]
    fn next_stays_in_control_range() {
        let mut rng = ControlRng::new(12345);
        for _ in 0..10_000 {
            let v = rng.next();
            assert!((0..CONTROL_RANGE).contains(&v), "out of range: {v}");
        }
    }

    #[test]
    fn scaled_within_bounds() {
        let mut rng = ControlRng::new(999);
        for _ in 0..10_000 {
            let v = rng.scaled(7);
            assert!((0..7).contains(&v), "scaled out of range: {v}");
        }
    }

    #[test]
    fn scaled_zero_returns_zero_and_advances() {
        let mut a = ControlRng::new(5);
        let mut b = ControlRng::new(5);
        assert_eq!(a.scaled(0), 0);
        b.next();
        assert_eq!(a.state(), b.state());
    }

    #[test]
    fn chance_extremes() {
        let mut rng = ControlRng::new(42);
        for _ in 0..100 {
            assert!(!rng.chance(0));
        }
        for _ in 0..100 {
            assert!(rng.chance(CONTROL_RANGE));
        }
    }

    #[test]
    fn chance_distribution() {
        let mut rng = ControlRng::new(7);
        let n = 10_000;
        let hits = (0..n).filter(|_| rng.chance(CONTROL_RANGE / 2)).count();
        let pct = hits as f64 / n as f64;
        assert!((0.45..0.55).contains(&pct), "expected ~50%, got {pct}");
    }

    #[test]
    fn serialization_roundtrip() {
        let mut rng = ControlRng::new(42);
        for _ in 0..100 {
            rng.next();
        }
        let json = serde_json::to_string(&rng).unwrap();
        let mut restored: ControlRng = serde_json::from_str(&json).unwrap();
        for _ in 0..100 {
            assert_eq!(rng.next(), restored.next());
        }
    }
}
