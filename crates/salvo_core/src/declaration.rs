//! Attack declarations.
//!
//! A declaration is immutable once queued. Anything that needs a different
//! declaration (commit reordering, strafing fan-out) builds a new value from
//! an existing one instead of editing it in place.

use serde::{Deserialize, Serialize};

use crate::abilities::SpecialAbility;
use crate::combatant::{AmmoId, BombLoadout, LoadoutClass, MunitionSet, UnitId, WeaponId};
use crate::hex::HexCoord;
use crate::target::Target;

/// What produced the declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclarationKind {
    /// A weapon attack.
    Weapon(WeaponId),
    /// A zero-weapon special ability.
    Ability(SpecialAbility),
    /// A zero-weapon spotting action.
    Spot,
}

/// How an aimed shot is being made.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AimingMode {
    /// No aimed shot.
    #[default]
    None,
    /// Aimed at an immobile target.
    Immobile,
    /// Aimed with a targeting computer.
    TargetingComputer,
}

/// Ammo a weapon attack draws from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AmmoLink {
    /// Bin fired from.
    pub bin: AmmoId,
    /// Unit physically carrying the bin.
    pub carrier: UnitId,
    /// Munitions in the bin.
    pub munitions: MunitionSet,
}

/// Bombs spent by one declaration, per loadout class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BombPayload {
    /// Bombs from the internal bay.
    pub internal: BombLoadout,
    /// Bombs from external hardpoints.
    pub external: BombLoadout,
}

impl BombPayload {
    /// Payload drawn from a single class.
    #[must_use]
    pub fn single(class: LoadoutClass, loadout: BombLoadout) -> Self {
        let mut payload = Self::default();
        *payload.class_mut(class) = loadout;
        payload
    }

    /// Bombs of one class.
    #[must_use]
    pub const fn class(&self, class: LoadoutClass) -> &BombLoadout {
        match class {
            LoadoutClass::Internal => &self.internal,
            LoadoutClass::External => &self.external,
        }
    }

    /// Bombs of one class, mutably.
    pub fn class_mut(&mut self, class: LoadoutClass) -> &mut BombLoadout {
        match class {
            LoadoutClass::Internal => &mut self.internal,
            LoadoutClass::External => &mut self.external,
        }
    }

    /// Total bombs across both classes.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.internal.total() + self.external.total()
    }
}

/// Attack-specific settings that do not fit elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct AttackExtras {
    /// Vibrabomb trigger weight in tons.
    pub vibrabomb_setting: Option<u32>,
}

/// One declared attack.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttackDeclaration {
    /// Unit making the attack.
    pub firer: UnitId,
    /// Weapon, ability or spot action.
    pub kind: DeclarationKind,
    /// What is attacked.
    pub target: Target,
    /// Location aimed at, if this is an aimed shot.
    pub aimed_location: Option<u8>,
    /// How the shot is aimed.
    pub aiming_mode: AimingMode,
    /// Ammo used.
    pub ammo: Option<AmmoLink>,
    /// Bombs dropped.
    pub bomb_payload: Option<BombPayload>,
    /// Part of a strafing run.
    pub strafing: bool,
    /// First shot of the weapon's strafing run.
    pub strafing_first_shot: bool,
    /// Impact hex on an airborne target's flight path (ground-to-air).
    pub impact_hex: Option<HexCoord>,
    /// Other settings.
    pub extras: AttackExtras,
}

impl AttackDeclaration {
    /// Create a plain weapon attack.
    #[must_use]
    pub fn weapon(firer: UnitId, weapon: WeaponId, target: Target) -> Self {
        Self::with_kind(firer, DeclarationKind::Weapon(weapon), target)
    }

    /// Create a zero-weapon ability declaration.
    #[must_use]
    pub fn ability(firer: UnitId, ability: SpecialAbility, target: Target) -> Self {
        Self::with_kind(firer, DeclarationKind::Ability(ability), target)
    }

    /// Create a zero-weapon spotting declaration.
    #[must_use]
    pub fn spot(firer: UnitId, target: Target) -> Self {
        Self::with_kind(firer, DeclarationKind::Spot, target)
    }

    fn with_kind(firer: UnitId, kind: DeclarationKind, target: Target) -> Self {
        Self {
            firer,
            kind,
            target,
            aimed_location: None,
            aiming_mode: AimingMode::None,
            ammo: None,
            bomb_payload: None,
            strafing: false,
            strafing_first_shot: false,
            impact_hex: None,
            extras: AttackExtras::default(),
        }
    }

    /// Builder method to aim the shot.
    #[must_use]
    pub fn with_aim(mut self, location: Option<u8>, mode: AimingMode) -> Self {
        self.aimed_location = location;
        self.aiming_mode = mode;
        self
    }

    /// Builder method to link ammo.
    #[must_use]
    pub fn with_ammo(mut self, ammo: AmmoLink) -> Self {
        self.ammo = Some(ammo);
        self
    }

    /// Builder method to attach a bomb payload.
    #[must_use]
    pub fn with_payload(mut self, payload: BombPayload) -> Self {
        self.bomb_payload = Some(payload);
        self
    }

    /// Builder method to mark the declaration as part of a strafing run.
    #[must_use]
    pub fn with_strafing(mut self, first_shot: bool) -> Self {
        self.strafing = true;
        self.strafing_first_shot = first_shot;
        self
    }

    /// Builder method to record the ground-to-air impact hex.
    #[must_use]
    pub fn with_impact_hex(mut self, hex: Option<HexCoord>) -> Self {
        self.impact_hex = hex;
        self
    }

    /// Builder method to set extras.
    #[must_use]
    pub fn with_extras(mut self, extras: AttackExtras) -> Self {
        self.extras = extras;
        self
    }

    /// Builder method to retarget, keeping everything else.
    #[must_use]
    pub fn with_target(mut self, target: Target) -> Self {
        self.target = target;
        self
    }

    /// Weapon used, if this is a weapon attack.
    #[must_use]
    pub const fn weapon_id(&self) -> Option<WeaponId> {
        match self.kind {
            DeclarationKind::Weapon(id) => Some(id),
            _ => None,
        }
    }

    /// Whether this is a weapon attack.
    #[must_use]
    pub const fn is_weapon_attack(&self) -> bool {
        matches!(self.kind, DeclarationKind::Weapon(_))
    }

    /// Bombs of one class spent by this declaration.
    #[must_use]
    pub fn bombs(&self, class: LoadoutClass) -> BombLoadout {
        self.bomb_payload
            .map(|p| *p.class(class))
            .unwrap_or_default()
    }

    /// Fresh copy sent at commit.
    ///
    /// Preserves aimed location, aiming mode, ammo linkage, munitions,
    /// carrier, bomb payload, strafing flags, impact hex and extras. The
    /// only thing that differs is where the copy lands in the committed
    /// queue.
    #[must_use]
    pub fn reissue(&self) -> Self {
        Self {
            firer: self.firer,
            kind: self.kind,
            target: self.target,
            aimed_location: self.aimed_location,
            aiming_mode: self.aiming_mode,
            ammo: self.ammo,
            bomb_payload: self.bomb_payload,
            strafing: self.strafing,
            strafing_first_shot: self.strafing_first_shot,
            impact_hex: self.impact_hex,
            extras: self.extras,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::BombKind;
    use crate::target::HexTargetKind;

    fn sample() -> AttackDeclaration {
        AttackDeclaration::weapon(
            UnitId(1),
            WeaponId(3),
            Target::hex(HexCoord::new(2, 2), HexTargetKind::Clear),
        )
        .with_aim(Some(4), AimingMode::TargetingComputer)
        .with_ammo(AmmoLink {
            bin: AmmoId(7),
            carrier: UnitId(9),
            munitions: MunitionSet::INFERNO,
        })
        .with_payload(BombPayload::single(
            LoadoutClass::Internal,
            BombLoadout::from_pairs(&[(BombKind::Cluster, 2)]),
        ))
        .with_strafing(true)
        .with_extras(AttackExtras {
            vibrabomb_setting: Some(40),
        })
    }

    #[test]
    fn test_reissue_preserves_every_field() {
        let original = sample();
        assert_eq!(original.reissue(), original);
    }

    #[test]
    fn test_bombs_by_class() {
        let decl = sample();
        assert_eq!(decl.bombs(LoadoutClass::Internal).total(), 2);
        assert!(decl.bombs(LoadoutClass::External).is_empty());
    }

    #[test]
    fn test_zero_weapon_declarations() {
        let spot = AttackDeclaration::spot(UnitId(1), Target::Unit(UnitId(2)));
        assert!(!spot.is_weapon_attack());
        assert_eq!(spot.weapon_id(), None);
    }
}
