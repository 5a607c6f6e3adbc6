// Binary angles, fixed-point trig, and facing quadrants.
//
// Angles are `i16` binary angles: 65536 units per full turn, wrapping on
// overflow, 0 facing +Z (north), 0x4000 facing +X (east). Sine and cosine
// are returned in 1.14 fixed point (`TRIG_ONE` == 1.0) so rotations are
// `(cos * a - sin * b) >> TRIG_SHIFT`.
//
// `Quadrant` is the single source of truth for how a facing angle is
// bucketed for collision. The probe's front/left/right offsets and every
// left/right tie-break (height pass and static collider alike) go through
// `Quadrant::from_facing` plus the axis helpers below. Deriving the
// quadrant twice in two different ways is how the "collision only works
// facing one direction" class of bug appears.
//
// See also: `collision.rs` (probe offsets, grid snap), `statics.rs` (static
// tie-break), `push.rs` (rotation into an item's local frame).
//
// **Critical constraint: determinism.** Trig is table-driven integer math:
// a quarter-wave sine table and a first-octant arctangent table, both
// linearly interpolated. No floating point, so every platform agrees.

use serde::{Deserialize, Serialize};

/// One degree in binary angle units (rounded).
pub const DEG_1: i16 = 182;
pub const ANGLE_45: i16 = 0x2000;
pub const ANGLE_90: i16 = 0x4000;
/// Half a turn. Stored as `i16::MIN`; negation wraps back to itself.
pub const ANGLE_180: i16 = i16::MIN;

/// Fixed-point shift of the trig functions.
pub const TRIG_SHIFT: u32 = 14;
/// 1.0 in trig fixed point.
pub const TRIG_ONE: i32 = 1 << TRIG_SHIFT;

/// `sin` over a quarter turn in 1.14 fixed point, one entry per 64 angle
/// units.
const SIN_TABLE: [u16; 257] = [
    0, 101, 201, 302, 402, 503, 603, 704,
    804, 904, 1005, 1105, 1205, 1306, 1406, 1506,
    1606, 1706, 1806, 1906, 2006, 2105, 2205, 2305,
    2404, 2503, 2603, 2702, 2801, 2900, 2999, 3098,
    3196, 3295, 3393, 3492, 3590, 3688, 3786, 3883,
    3981, 4078, 4176, 4273, 4370, 4467, 4563, 4660,
    4756, 4852, 4948, 5044, 5139, 5235, 5330, 5425,
    5520, 5614, 5708, 5803, 5897, 5990, 6084, 6177,
    6270, 6363, 6455, 6547, 6639, 6731, 6823, 6914,
    7005, 7096, 7186, 7276, 7366, 7456, 7545, 7635,
    7723, 7812, 7900, 7988, 8076, 8163, 8250, 8337,
    8423, 8509, 8595, 8680, 8765, 8850, 8935, 9019,
    9102, 9186, 9269, 9352, 9434, 9516, 9598, 9679,
    9760, 9841, 9921, 10001, 10080, 10159, 10238, 10316,
    10394, 10471, 10549, 10625, 10702, 10778, 10853, 10928,
    11003, 11077, 11151, 11224, 11297, 11370, 11442, 11514,
    11585, 11656, 11727, 11797, 11866, 11935, 12004, 12072,
    12140, 12207, 12274, 12340, 12406, 12472, 12537, 12601,
    12665, 12729, 12792, 12854, 12916, 12978, 13039, 13100,
    13160, 13219, 13279, 13337, 13395, 13453, 13510, 13567,
    13623, 13678, 13733, 13788, 13842, 13896, 13949, 14001,
    14053, 14104, 14155, 14206, 14256, 14305, 14354, 14402,
    14449, 14497, 14543, 14589, 14635, 14680, 14724, 14768,
    14811, 14854, 14896, 14937, 14978, 15019, 15059, 15098,
    15137, 15175, 15213, 15250, 15286, 15322, 15357, 15392,
    15426, 15460, 15493, 15525, 15557, 15588, 15619, 15649,
    15679, 15707, 15736, 15763, 15791, 15817, 15843, 15868,
    15893, 15917, 15941, 15964, 15986, 16008, 16029, 16049,
    16069, 16088, 16107, 16125, 16143, 16160, 16176, 16192,
    16207, 16221, 16235, 16248, 16261, 16273, 16284, 16295,
    16305, 16315, 16324, 16332, 16340, 16347, 16353, 16359,
    16364, 16369, 16373, 16376, 16379, 16381, 16383, 16384,
    16384,
];

/// `atan(i / 256)` in binary angle units, for `i` in `0..=256`.
const ATAN_TABLE: [u16; 257] = [
    0, 41, 81, 122, 163, 204, 244, 285,
    326, 367, 407, 448, 489, 529, 570, 610,
    651, 692, 732, 773, 813, 854, 894, 935,
    975, 1015, 1056, 1096, 1136, 1177, 1217, 1257,
    1297, 1337, 1377, 1417, 1457, 1497, 1537, 1577,
    1617, 1656, 1696, 1736, 1775, 1815, 1854, 1894,
    1933, 1973, 2012, 2051, 2090, 2129, 2168, 2207,
    2246, 2285, 2324, 2363, 2401, 2440, 2478, 2517,
    2555, 2594, 2632, 2670, 2708, 2746, 2784, 2822,
    2860, 2897, 2935, 2973, 3010, 3047, 3085, 3122,
    3159, 3196, 3233, 3270, 3307, 3344, 3380, 3417,
    3453, 3490, 3526, 3562, 3599, 3635, 3670, 3706,
    3742, 3778, 3813, 3849, 3884, 3920, 3955, 3990,
    4025, 4060, 4095, 4129, 4164, 4199, 4233, 4267,
    4302, 4336, 4370, 4404, 4438, 4471, 4505, 4539,
    4572, 4605, 4639, 4672, 4705, 4738, 4771, 4803,
    4836, 4869, 4901, 4933, 4966, 4998, 5030, 5062,
    5094, 5125, 5157, 5188, 5220, 5251, 5282, 5313,
    5344, 5375, 5406, 5437, 5467, 5498, 5528, 5559,
    5589, 5619, 5649, 5679, 5708, 5738, 5768, 5797,
    5826, 5856, 5885, 5914, 5943, 5972, 6000, 6029,
    6058, 6086, 6114, 6142, 6171, 6199, 6227, 6254,
    6282, 6310, 6337, 6365, 6392, 6419, 6446, 6473,
    6500, 6527, 6554, 6580, 6607, 6633, 6660, 6686,
    6712, 6738, 6764, 6790, 6815, 6841, 6867, 6892,
    6917, 6943, 6968, 6993, 7018, 7043, 7068, 7092,
    7117, 7141, 7166, 7190, 7214, 7238, 7262, 7286,
    7310, 7334, 7358, 7381, 7405, 7428, 7451, 7475,
    7498, 7521, 7544, 7566, 7589, 7612, 7635, 7657,
    7679, 7702, 7724, 7746, 7768, 7790, 7812, 7834,
    7856, 7877, 7899, 7920, 7942, 7963, 7984, 8005,
    8026, 8047, 8068, 8089, 8110, 8131, 8151, 8172,
    8192,
];

/// Interpolate a 257-entry table at `pos`, where `pos` runs `0..=0x4000`.
fn lookup(table: &[u16; 257], pos: u32) -> i32 {
    let i = (pos >> 6) as usize;
    let Some(&low) = table.get(i) else {
        return table[256] as i32;
    };
    let high = table.get(i + 1).copied().unwrap_or(low);
    let frac = (pos & 63) as i32;
    low as i32 + (((high as i32 - low as i32) * frac) >> 6)
}

/// Sine of a binary angle in 1.14 fixed point.
pub fn sin(angle: i16) -> i32 {
    let a = angle as u16 as u32;
    let offset = a & 0x3FFF;
    match a >> 14 {
        0 => lookup(&SIN_TABLE, offset),
        1 => lookup(&SIN_TABLE, 0x4000 - offset),
        2 => -lookup(&SIN_TABLE, offset),
        _ => -lookup(&SIN_TABLE, 0x4000 - offset),
    }
}

/// Cosine of a binary angle in 1.14 fixed point.
pub fn cos(angle: i16) -> i32 {
    sin(angle.wrapping_add(ANGLE_90))
}

/// Angle of `small / large` in the first octant, `0..=ANGLE_45`.
fn octant_atan(small: u64, large: u64) -> i32 {
    let ratio = ((small << TRIG_SHIFT) / large) as u32;
    lookup(&ATAN_TABLE, ratio)
}

/// Heading of the vector `(x, z)`: the angle `a` with `sin(a) ~ x` and
/// `cos(a) ~ z`. Returns 0 for the zero vector.
pub fn atan(z: i32, x: i32) -> i16 {
    if x == 0 && z == 0 {
        return 0;
    }
    let (ax, az) = (x.unsigned_abs() as u64, z.unsigned_abs() as u64);
    // Angle off the +Z axis toward +X, within the first quadrant.
    let base = if ax <= az {
        octant_atan(ax, az)
    } else {
        ANGLE_90 as i32 - octant_atan(az, ax)
    };
    let turn = match (x >= 0, z >= 0) {
        (true, true) => base,
        (true, false) => 0x8000 - base,
        (false, false) => base - 0x8000,
        (false, true) => -base,
    };
    turn as u16 as i16
}

/// Rotate a world-space horizontal offset into the local frame of something
/// facing `yaw` (local +Z is that thing's forward).
pub fn to_local(dx: i32, dz: i32, yaw: i16) -> (i32, i32) {
    let c = cos(yaw) as i64;
    let s = sin(yaw) as i64;
    let (dx, dz) = (dx as i64, dz as i64);
    (
        ((c * dx - s * dz) >> TRIG_SHIFT) as i32,
        ((c * dz + s * dx) >> TRIG_SHIFT) as i32,
    )
}

/// Inverse of `to_local`.
pub fn to_world(rx: i32, rz: i32, yaw: i16) -> (i32, i32) {
    let c = cos(yaw) as i64;
    let s = sin(yaw) as i64;
    let (rx, rz) = (rx as i64, rz as i64);
    (
        ((c * rx + s * rz) >> TRIG_SHIFT) as i32,
        ((c * rz - s * rx) >> TRIG_SHIFT) as i32,
    )
}

/// Horizontal world axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Axis {
    X,
    Z,
}

impl Axis {
    pub fn other(self) -> Axis {
        match self {
            Axis::X => Axis::Z,
            Axis::Z => Axis::X,
        }
    }

    /// Component of `(x, z)` along this axis.
    pub fn of(self, x: i32, z: i32) -> i32 {
        match self {
            Axis::X => x,
            Axis::Z => z,
        }
    }
}

/// One of the four cardinal buckets a facing rounds into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    North,
    East,
    South,
    West,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Quadrant::North,
        Quadrant::East,
        Quadrant::South,
        Quadrant::West,
    ];

    /// Round a facing to the nearest cardinal direction. Ties at exact
    /// diagonals go clockwise (a facing of 45° is `East`).
    pub fn from_facing(facing: i16) -> Quadrant {
        let bucket = (facing as u16).wrapping_add(ANGLE_45 as u16) / (ANGLE_90 as u16);
        Self::from_index(bucket)
    }

    fn from_index(index: u16) -> Quadrant {
        match index & 3 {
            0 => Quadrant::North,
            1 => Quadrant::East,
            2 => Quadrant::South,
            _ => Quadrant::West,
        }
    }

    pub fn index(self) -> u16 {
        match self {
            Quadrant::North => 0,
            Quadrant::East => 1,
            Quadrant::South => 2,
            Quadrant::West => 3,
        }
    }

    /// Unit forward vector `(x, z)`.
    pub fn forward(self) -> (i32, i32) {
        match self {
            Quadrant::North => (0, 1),
            Quadrant::East => (1, 0),
            Quadrant::South => (0, -1),
            Quadrant::West => (-1, 0),
        }
    }

    /// Unit vector `(x, z)` pointing to the body's right-hand side.
    pub fn right(self) -> (i32, i32) {
        match self {
            Quadrant::North => (1, 0),
            Quadrant::East => (0, -1),
            Quadrant::South => (-1, 0),
            Quadrant::West => (0, 1),
        }
    }

    /// World axis the body is moving along.
    pub fn forward_axis(self) -> Axis {
        match self {
            Quadrant::North | Quadrant::South => Axis::Z,
            Quadrant::East | Quadrant::West => Axis::X,
        }
    }

    /// World axis perpendicular to the direction of travel.
    pub fn lateral_axis(self) -> Axis {
        self.forward_axis().other()
    }

    /// Sign of the right-hand vector along the lateral axis. A lateral push
    /// whose sign matches this moves the body rightwards.
    pub fn right_sign(self) -> i32 {
        let (x, z) = self.right();
        self.lateral_axis().of(x, z)
    }
}
