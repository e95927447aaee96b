//! Fixed-point math utilities for deterministic hex geometry.
//!
//! Line tracing across the hex grid interpolates between hex centers.
//! Doing that in floating point can round differently on different CPUs,
//! which would make the same strafing pick legal on one client and
//! illegal on another. Everything here uses fixed-point arithmetic instead.

use fixed::types::I32F32;

/// Fixed-point number type for geometry math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Tie-break nudge applied before rounding a fractional hex.
///
/// Roughly one millionth of a hex. Small enough never to move a point
/// that is clearly inside a hex, large enough to push a point sitting
/// exactly on a hex edge to one side.
pub const NUDGE: Fixed = Fixed::from_bits(1 << 12);

/// A point in continuous cube-coordinate space (`x + y + z == 0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CubeFixed {
    /// Cube x (axial q).
    pub x: Fixed,
    /// Cube y.
    pub y: Fixed,
    /// Cube z (axial r).
    pub z: Fixed,
}

impl CubeFixed {
    /// Create a fractional cube point from integer cube coordinates.
    #[must_use]
    pub fn from_int(x: i32, y: i32, z: i32) -> Self {
        Self {
            x: Fixed::from_num(x),
            y: Fixed::from_num(y),
            z: Fixed::from_num(z),
        }
    }

    /// Linear interpolation `self + (other - self) * step / steps`.
    ///
    /// `steps` must be positive.
    #[must_use]
    pub fn lerp(self, other: Self, step: u32, steps: u32) -> Self {
        let t = Fixed::from_num(step) / Fixed::from_num(steps);
        Self {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
            z: self.z + (other.z - self.z) * t,
        }
    }

    /// Shift the point by `sign * (NUDGE, 2 NUDGE, -3 NUDGE)`.
    ///
    /// The offsets sum to zero so the point stays on the cube plane.
    #[must_use]
    pub fn nudged(self, sign: i32) -> Self {
        let e = NUDGE * Fixed::from_num(sign);
        Self {
            x: self.x + e,
            y: self.y + e * Fixed::from_num(2),
            z: self.z - e * Fixed::from_num(3),
        }
    }

    /// Round to the containing hex, returned as integer cube coordinates.
    ///
    /// The component with the largest rounding error is recomputed from
    /// the other two so the result satisfies `x + y + z == 0`.
    #[must_use]
    pub fn round(self) -> (i32, i32, i32) {
        let rx = self.x.round();
        let ry = self.y.round();
        let rz = self.z.round();

        let dx = (rx - self.x).abs();
        let dy = (ry - self.y).abs();
        let dz = (rz - self.z).abs();

        let (rx, ry, rz) = (rx.to_num::<i32>(), ry.to_num::<i32>(), rz.to_num::<i32>());
        if dx > dy && dx > dz {
            (-ry - rz, ry, rz)
        } else if dy > dz {
            (rx, -rx - rz, rz)
        } else {
            (rx, ry, -rx - ry)
        }
    }
}
