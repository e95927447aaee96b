//! Error types for the fire-turn controller.
//!
//! Every error here blocks only the operation that raised it. The session and
//! its queue are left exactly as they were before the failed call.

use thiserror::Error;

use crate::abilities::SpecialAbility;
use crate::combatant::{AmmoId, LoadoutClass, UnitId, WeaponId};
use crate::strafing::StrafeRejection;

/// Result type alias using [`FireError`].
pub type Result<T> = std::result::Result<T, FireError>;

/// Top-level error type for the fire-turn controller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FireError {
    /// Fire attempted with no weapon selected.
    #[error("No weapon selected")]
    NoWeaponSelected,

    /// Fire attempted with no target and no strafing run.
    #[error("No target selected")]
    NoTargetSelected,

    /// The weapon already has a declaration queued this round.
    #[error("Weapon {0} has already fired this round")]
    WeaponAlreadyUsed(WeaponId),

    /// The weapon is not mounted on the acting unit.
    #[error("Unknown weapon: {0}")]
    UnknownWeapon(WeaponId),

    /// The weapon fires automatically and cannot be declared by hand.
    #[error("Weapon {0} cannot be fired manually")]
    WeaponNotFireable(WeaponId),

    /// A bomb weapon was fired before its payload was chosen.
    #[error("Bomb payload not resolved for weapon {0}")]
    PayloadUnresolved(WeaponId),

    /// A bomb payload exceeds what is left in the loadout or under the phase cap.
    #[error("Bomb payload of {requested} exceeds the {remaining} still available")]
    BombCapExceeded {
        /// Bombs in the payload.
        requested: u32,
        /// Bombs still available.
        remaining: u32,
    },

    /// A payload draws from a loadout class the weapon cannot release.
    #[error("Weapon {weapon} cannot drop {class:?} bombs")]
    WrongBombClass {
        /// Weapon addressed.
        weapon: WeaponId,
        /// Class the payload drew from.
        class: LoadoutClass,
    },

    /// A vibrabomb was fired before its setting was chosen.
    #[error("Vibrabomb setting not resolved for weapon {0}")]
    SettingUnresolved(WeaponId),

    /// Aimed shots requested for a weapon that cannot aim.
    #[error("Weapon {0} cannot make aimed shots")]
    AimingNotSupported(WeaponId),

    /// The oracle rules the shot out.
    #[error("Shot not possible: {0}")]
    ShotImpossible(String),

    /// The weapon has no such fire mode.
    #[error("Weapon {weapon} has no fire mode {mode}")]
    UnknownMode {
        /// Weapon addressed.
        weapon: WeaponId,
        /// Requested mode index.
        mode: usize,
    },

    /// A weapon order is not a permutation of the unit's weapons.
    #[error("Weapon order must list every weapon exactly once")]
    InvalidWeaponOrder,

    /// The unit cannot spot for the selected target.
    #[error("Spotting not available")]
    SpotUnavailable,

    /// The linked ammo bin has no unreserved shots left.
    #[error("Ammo bin {0} is empty")]
    OutOfAmmo(AmmoId),

    /// A strafing hex pick violated the run geometry.
    #[error("Strafing hex rejected: {0}")]
    StrafeRejected(StrafeRejection),

    /// A special ability could not be activated.
    #[error("Ability {0} is not available")]
    AbilityUnavailable(SpecialAbility),

    /// The acting unit is unknown to the battlefield.
    #[error("Unknown combatant: {0}")]
    UnknownCombatant(UnitId),

    /// Commit packet encoding or decoding failed.
    #[error("Packet encoding failed: {0}")]
    Encoding(String),

    /// Combatant data failed to parse or is inconsistent.
    #[error("Invalid combatant data: {0}")]
    Data(String),

    /// Rules configuration failed to parse.
    #[error("Invalid fire rules: {0}")]
    Rules(String),
}

impl FireError {
    /// Whether the session can carry on after this error.
    ///
    /// Selection and constraint errors only reject the offending call.
    /// Encoding and configuration errors happen outside a live session.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Encoding(_) | Self::Data(_) | Self::Rules(_))
    }
}
