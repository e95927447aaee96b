//! Attack targets.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::combatant::{BuildingId, UnitId};
use crate::hex::HexCoord;

/// What a hex attack is trying to do to the hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HexTargetKind {
    /// Clear woods or rubble.
    Clear,
    /// Set the hex on fire.
    Ignite,
    /// Deliver an illumination flare.
    FlareDeliver,
    /// Drop ordnance on the hex.
    BombDrop,
}

/// Something an attack can be declared against.
///
/// Equality is structural: two targets are the same iff they have the same
/// variant and the same id or coordinates. The derived ordering (variant,
/// then id/coordinates) is the stable tie-break key for target cycling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Target {
    /// Another combatant.
    Unit(UnitId),
    /// A board hex.
    Hex {
        /// Hex attacked.
        coords: HexCoord,
        /// Purpose of the hex attack.
        kind: HexTargetKind,
    },
    /// A building occupying a hex.
    Building {
        /// Building attacked.
        id: BuildingId,
        /// Hex of the building being hit.
        coords: HexCoord,
    },
}

impl Target {
    /// Unit id if this targets a unit.
    #[must_use]
    pub const fn unit(&self) -> Option<UnitId> {
        match self {
            Self::Unit(id) => Some(*id),
            _ => None,
        }
    }

    /// Whether this targets a unit.
    #[must_use]
    pub const fn is_unit(&self) -> bool {
        matches!(self, Self::Unit(_))
    }

    /// Fixed coordinates for hex and building targets.
    ///
    /// Unit positions move, so they come from the battlefield instead.
    #[must_use]
    pub const fn fixed_coords(&self) -> Option<HexCoord> {
        match self {
            Self::Unit(_) => None,
            Self::Hex { coords, .. } | Self::Building { coords, .. } => Some(*coords),
        }
    }

    /// Hex target helper.
    #[must_use]
    pub const fn hex(coords: HexCoord, kind: HexTargetKind) -> Self {
        Self::Hex { coords, kind }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unit(id) => write!(f, "{id}"),
            Self::Hex { coords, kind } => write!(f, "hex {coords} ({kind:?})"),
            Self::Building { id, coords } => write!(f, "{id} at {coords}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_structural_equality() {
        let a = Target::hex(HexCoord::new(1, 2), HexTargetKind::Clear);
        let b = Target::hex(HexCoord::new(1, 2), HexTargetKind::Clear);
        let c = Target::hex(HexCoord::new(1, 2), HexTargetKind::FlareDeliver);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_units_order_before_hexes() {
        let unit = Target::Unit(UnitId(99));
        let hex = Target::hex(HexCoord::new(0, 0), HexTargetKind::Clear);
        assert!(unit < hex);
        assert!(Target::Unit(UnitId(1)) < Target::Unit(UnitId(2)));
    }

    #[test]
    fn test_fixed_coords() {
        assert_eq!(Target::Unit(UnitId(1)).fixed_coords(), None);
        let building = Target::Building {
            id: BuildingId(4),
            coords: HexCoord::new(3, 3),
        };
        assert_eq!(building.fixed_coords(), Some(HexCoord::new(3, 3)));
    }
}
