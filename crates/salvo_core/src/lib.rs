//! # Salvo Core
//!
//! Attack-resolution controller for the weapons-fire turn of a hex-grid,
//! turn-based tactical game.
//!
//! For the unit currently taking its fire turn this crate tracks weapon and
//! target selection, builds an ordered queue of attack declarations,
//! validates strafing runs, allocates bombs across attacks, gates one-shot
//! special abilities and produces the normalized queue sent at end of turn.
//!
//! This crate contains **only** deterministic controller logic:
//! - No rendering
//! - No IO (the to-hit formula, line of sight and the board are collaborators)
//! - No system randomness
//! - No floating-point math (geometry is integer hex math plus fixed-point)
//!
//! ## Crate Structure
//!
//! - [`hex`] - Hex coordinates, facings and firing arcs
//! - [`combatant`] - Units, weapon mounts, ammo bins and bomb loadouts
//! - [`target`] / [`declaration`] - What is attacked and how
//! - [`oracle`] - Boundary traits for the board and the to-hit oracle
//! - [`catalog`] - Range-sorted target cycling
//! - [`strafing`] - Strafing run geometry
//! - [`ordnance`] - Bomb payload allocation
//! - [`abilities`] - One-shot special abilities
//! - [`queue`] - The attack queue and its commit reordering
//! - [`session`] - The per-unit turn state machine
//! - [`packet`] - What gets handed to the server at commit

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod abilities;
pub mod catalog;
pub mod combatant;
pub mod data;
pub mod declaration;
pub mod error;
pub mod hex;
pub mod math;
pub mod oracle;
pub mod ordnance;
pub mod packet;
pub mod queue;
pub mod rules;
pub mod session;
pub mod strafing;
pub mod target;

#[cfg(test)]
mod testing;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::abilities::{AbilitySet, SpecialAbility};
    pub use crate::catalog::{CycleDirection, CycleFilter, TargetCatalog};
    pub use crate::combatant::{
        AmmoBin, AmmoId, BombKind, BombLoadout, BuildingId, Combatant, CrewState, LoadoutClass,
        MunitionSet, TeamId, UnitCapabilities, UnitId, WeaponFlags, WeaponId, WeaponMount,
    };
    pub use crate::declaration::{
        AimingMode, AmmoLink, AttackDeclaration, AttackExtras, BombPayload, DeclarationKind,
    };
    pub use crate::error::{FireError, Result};
    pub use crate::hex::{Facing, HexCoord};
    pub use crate::oracle::{Battlefield, FireContext, ShotRequest, TargetingOracle, ToHit};
    pub use crate::ordnance::{BombAllowance, PhaseOrdnance};
    pub use crate::packet::{CommitPacket, SessionCommand, ShotCall};
    pub use crate::queue::{AttackQueue, CommittedQueue, DropReason, DroppedAttack};
    pub use crate::rules::FireRules;
    pub use crate::session::{SessionPhase, TurnSession};
    pub use crate::strafing::{StrafeRejection, StrafingRun};
    pub use crate::target::{HexTargetKind, Target};
}
