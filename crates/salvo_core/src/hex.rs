//! Hex coordinates, facings and firing arcs.
//!
//! The board uses flat-topped hexes addressed by offset coordinates
//! `(col, row)` with odd columns shifted half a hex down. Geometry is done
//! in axial/cube space where neighbor offsets and distances are uniform.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::CubeFixed;

/// Offset hex coordinate on the board.
///
/// Ordering is by column, then row. Target cycling uses it as a stable
/// tie-break so it must stay total and deterministic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub struct HexCoord {
    /// Column index.
    pub col: i32,
    /// Row index.
    pub row: i32,
}

impl HexCoord {
    /// Create a new hex coordinate.
    #[must_use]
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// Axial coordinates `(q, r)`.
    #[must_use]
    pub const fn to_axial(self) -> (i32, i32) {
        let q = self.col;
        let r = self.row - (self.col - (self.col & 1)) / 2;
        (q, r)
    }

    /// Build from axial coordinates.
    #[must_use]
    pub const fn from_axial(q: i32, r: i32) -> Self {
        Self {
            col: q,
            row: r + (q - (q & 1)) / 2,
        }
    }

    /// Cube coordinates `(x, y, z)` with `x + y + z == 0`.
    #[must_use]
    pub const fn to_cube(self) -> (i32, i32, i32) {
        let (q, r) = self.to_axial();
        (q, -q - r, r)
    }

    /// Hex distance (number of steps between hex centers).
    #[must_use]
    pub fn distance(self, other: Self) -> u32 {
        let (ax, ay, az) = self.to_cube();
        let (bx, by, bz) = other.to_cube();
        let d = (ax - bx).abs() + (ay - by).abs() + (az - bz).abs();
        (d / 2).unsigned_abs()
    }

    /// Whether `other` shares an edge with this hex.
    #[must_use]
    pub fn is_adjacent(self, other: Self) -> bool {
        self.distance(other) == 1
    }

    /// The neighboring hex in `facing`.
    #[must_use]
    pub fn neighbor(self, facing: Facing) -> Self {
        let (q, r) = self.to_axial();
        let (dq, dr) = facing.axial_offset();
        Self::from_axial(q + dq, r + dr)
    }

    /// All six neighbors, clockwise from north.
    #[must_use]
    pub fn neighbors(self) -> [Self; 6] {
        Facing::ALL.map(|f| self.neighbor(f))
    }

    /// Every hex whose center the straight segment `self -> other` crosses.
    ///
    /// Includes both endpoints. When the segment runs exactly along a hex
    /// edge both hexes sharing that edge are included, so the result is
    /// the set of hexes on the segment within rounding tolerance.
    #[must_use]
    pub fn line_to(self, other: Self) -> Vec<Self> {
        let steps = self.distance(other);
        if steps == 0 {
            return vec![self];
        }

        let (ax, ay, az) = self.to_cube();
        let (bx, by, bz) = other.to_cube();
        let a = CubeFixed::from_int(ax, ay, az);
        let b = CubeFixed::from_int(bx, by, bz);

        let mut hexes = Vec::with_capacity(2 * (steps as usize + 1));
        for step in 0..=steps {
            let point = a.lerp(b, step, steps);
            for sign in [1, -1] {
                let (x, _, z) = point.nudged(sign).round();
                let hex = Self::from_axial(x, z);
                if !hexes.contains(&hex) {
                    hexes.push(hex);
                }
            }
        }
        hexes
    }
}

impl fmt::Display for HexCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.col, self.row)
    }
}

/// One of the six hex facings, clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Facing {
    /// Toward row - 1.
    #[default]
    North,
    /// Upper right edge.
    NorthEast,
    /// Lower right edge.
    SouthEast,
    /// Toward row + 1.
    South,
    /// Lower left edge.
    SouthWest,
    /// Upper left edge.
    NorthWest,
}

impl Facing {
    /// All facings in clockwise order.
    pub const ALL: [Facing; 6] = [
        Facing::North,
        Facing::NorthEast,
        Facing::SouthEast,
        Facing::South,
        Facing::SouthWest,
        Facing::NorthWest,
    ];

    /// Facing index, 0 (north) to 5 (north-west).
    #[must_use]
    pub const fn index(self) -> u8 {
        match self {
            Facing::North => 0,
            Facing::NorthEast => 1,
            Facing::SouthEast => 2,
            Facing::South => 3,
            Facing::SouthWest => 4,
            Facing::NorthWest => 5,
        }
    }

    /// Facing from an index, wrapping modulo 6.
    #[must_use]
    pub fn from_index(index: i32) -> Self {
        // rem_euclid keeps the index in 0..6 for negative input
        #[allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]
        let i = index.rem_euclid(6) as usize;
        Self::ALL[i]
    }

    /// Rotate clockwise by `steps` hex sides (negative turns counter-clockwise).
    #[must_use]
    pub fn rotate(self, steps: i32) -> Self {
        Self::from_index(i32::from(self.index()) + steps)
    }

    /// The opposite facing.
    #[must_use]
    pub fn opposite(self) -> Self {
        self.rotate(3)
    }

    /// Axial step `(dq, dr)` toward the neighbor in this facing.
    #[must_use]
    pub const fn axial_offset(self) -> (i32, i32) {
        match self {
            Facing::North => (0, -1),
            Facing::NorthEast => (1, -1),
            Facing::SouthEast => (1, 0),
            Facing::South => (0, 1),
            Facing::SouthWest => (-1, 1),
            Facing::NorthWest => (-1, 0),
        }
    }
}

/// Whether `target` lies in the forward arc of a unit at `origin` facing `facing`.
///
/// The forward arc is the 120 degree cone centered on `facing`, boundaries
/// included. The test uses integer cross products in axial space; a linear
/// change of basis maps cones to cones, so the result matches the test on
/// the rendered board exactly. A target sharing the origin hex is in arc.
#[must_use]
pub fn in_forward_arc(origin: HexCoord, facing: Facing, target: HexCoord) -> bool {
    let (oq, or) = origin.to_axial();
    let (tq, tr) = target.to_axial();
    let v = (tq - oq, tr - or);

    let left = facing.rotate(-1).axial_offset();
    let right = facing.rotate(1).axial_offset();

    cross(left, v) >= 0 && cross(v, right) >= 0
}

fn cross(a: (i32, i32), b: (i32, i32)) -> i64 {
    i64::from(a.0) * i64::from(b.1) - i64::from(a.1) * i64::from(b.0)
}
