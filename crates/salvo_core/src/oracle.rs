//! Boundary traits for the collaborators the controller consults.
//!
//! The to-hit formula, line of sight, flight paths and the board itself
//! live outside this crate. The controller only asks questions through
//! these traits and treats every answer as a pure query.
//!
//! [`FireContext`] bundles the collaborators so session calls that need
//! them take a single argument.

use serde::{Deserialize, Serialize};

use crate::combatant::{BuildingId, Combatant, UnitId, WeaponId};
use crate::declaration::AimingMode;
use crate::hex::HexCoord;
use crate::rules::FireRules;
use crate::target::Target;

/// Verdict of the targeting oracle for one shot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ToHit {
    /// Roll needed to hit (2d6 scale).
    Difficulty(i32),
    /// The shot is legal but cannot hit.
    AutomaticFail(String),
    /// The shot is not legal.
    Impossible(String),
}

impl ToHit {
    /// Whether the shot can be taken and can hit.
    ///
    /// False for automatic failures, impossible shots and difficulties
    /// above the highest roll the dice can produce.
    #[must_use]
    pub fn is_feasible(&self, max_roll: i32) -> bool {
        matches!(self, Self::Difficulty(d) if *d <= max_roll)
    }

    /// Short human-readable description.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Difficulty(d) => format!("{d}+ to hit"),
            Self::AutomaticFail(reason) => format!("automatic failure: {reason}"),
            Self::Impossible(reason) => format!("impossible: {reason}"),
        }
    }
}

/// Everything the oracle needs to judge one shot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShotRequest {
    /// Unit firing.
    pub firer: UnitId,
    /// Target.
    pub target: Target,
    /// Weapon, or `None` for a targeting-only query.
    pub weapon: Option<WeaponId>,
    /// Location aimed at.
    pub aimed_location: Option<u8>,
    /// How the shot is aimed.
    pub aiming_mode: AimingMode,
    /// Whether the shot is part of a strafing run.
    pub strafing: bool,
}

/// External to-hit calculator.
pub trait TargetingOracle {
    /// Judge one shot.
    fn legality(&self, request: &ShotRequest) -> ToHit;
}

/// Read-only view of the board and the units on it.
pub trait Battlefield {
    /// Look up a combatant.
    fn combatant(&self, id: UnitId) -> Option<&Combatant>;

    /// Whether `firer` can see `target`.
    fn has_line_of_sight(&self, firer: UnitId, target: &Target) -> bool;

    /// Whether `firer`'s flight path this turn passed through `hex`.
    fn passed_through(&self, firer: UnitId, hex: HexCoord) -> bool;

    /// Building occupying `hex`, if any.
    fn building_at(&self, hex: HexCoord) -> Option<BuildingId>;

    /// Ground units standing in `hex`.
    fn ground_targets_at(&self, hex: HexCoord) -> Vec<UnitId>;

    /// Whether `target` still exists in the game.
    fn target_exists(&self, target: &Target) -> bool;

    /// Hex where a target currently is.
    fn target_position(&self, target: &Target) -> Option<HexCoord> {
        match target {
            Target::Unit(id) => self.combatant(*id).map(|c| c.position),
            _ => target.fixed_coords(),
        }
    }

    /// Whether `target` is hostile to `firer`.
    ///
    /// Hexes and buildings count as hostile so ally filtering never hides
    /// them.
    fn is_hostile(&self, firer: UnitId, target: &Target) -> bool {
        let Some(unit) = target.unit() else {
            return true;
        };
        match (self.combatant(firer), self.combatant(unit)) {
            (Some(a), Some(b)) => a.team != b.team,
            _ => false,
        }
    }

    /// Impact hex on an airborne target's flight path for a ground-to-air shot.
    fn impact_hex(&self, firer: UnitId, target: UnitId) -> Option<HexCoord>;
}

/// Collaborators and rules used by a session call.
#[derive(Clone, Copy)]
pub struct FireContext<'a> {
    /// Board and units.
    pub battlefield: &'a dyn Battlefield,
    /// To-hit calculator.
    pub oracle: &'a dyn TargetingOracle,
    /// Tunable rules.
    pub rules: &'a FireRules,
}

impl<'a> FireContext<'a> {
    /// Bundle collaborators.
    #[must_use]
    pub fn new(
        battlefield: &'a dyn Battlefield,
        oracle: &'a dyn TargetingOracle,
        rules: &'a FireRules,
    ) -> Self {
        Self {
            battlefield,
            oracle,
            rules,
        }
    }
}
