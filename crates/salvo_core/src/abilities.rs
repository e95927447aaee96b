//! One-shot special abilities.
//!
//! An ability is declared as a zero-weapon entry placed at the front of the
//! attack queue, ahead of every weapon attack. Once engaged it stays with
//! the unit until the enclosing game clears it (unit destroyed, routed, or
//! the effect expires), which shows up here as
//! [`Combatant::active_abilities`](crate::combatant::Combatant::active_abilities).

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::declaration::{AttackDeclaration, DeclarationKind};
use crate::error::{FireError, Result};
use crate::queue::AttackQueue;
use crate::target::Target;

/// Special abilities a unit may activate during the fire phase.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum SpecialAbility {
    /// Pilot fixates on a single enemy unit for the rest of the battle.
    BloodStalker,
}

impl SpecialAbility {
    /// The set flag for this ability.
    #[must_use]
    pub const fn flag(self) -> AbilitySet {
        match self {
            Self::BloodStalker => AbilitySet::BLOOD_STALKER,
        }
    }
}

bitflags! {
    /// A set of special abilities.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct AbilitySet: u8 {
        /// See [`SpecialAbility::BloodStalker`].
        const BLOOD_STALKER = 1 << 0;
    }
}

/// Check whether `ability` may be activated against `target`.
///
/// Requires that the firer has the ability and has not already engaged it,
/// that a target is selected and is a unit, and that the queue does not
/// already hold a declaration for the ability.
pub fn check_activate(
    ability: SpecialAbility,
    firer: &Combatant,
    target: Option<&Target>,
    queue: &AttackQueue,
) -> Result<()> {
    let unavailable = Err(FireError::AbilityUnavailable(ability));
    if !firer.supports_ability(ability) || firer.active_abilities.contains(ability.flag()) {
        return unavailable;
    }
    let Some(target) = target else {
        return Err(FireError::NoTargetSelected);
    };
    if !target.is_unit() {
        return unavailable;
    }
    if queue.has_ability(ability) {
        return unavailable;
    }
    Ok(())
}

/// Whether `ability` may be activated against `target`.
#[must_use]
pub fn can_activate(
    ability: SpecialAbility,
    firer: &Combatant,
    target: Option<&Target>,
    queue: &AttackQueue,
) -> bool {
    check_activate(ability, firer, target, queue).is_ok()
}

/// Activate `ability`, placing its declaration at the front of the queue.
pub fn activate(
    ability: SpecialAbility,
    firer: &Combatant,
    target: Option<&Target>,
    queue: &mut AttackQueue,
) -> Result<()> {
    check_activate(ability, firer, target, queue)?;
    // check_activate guarantees a unit target
    let Some(&target) = target else {
        return Err(FireError::NoTargetSelected);
    };
    queue.push_front(AttackDeclaration::ability(firer.id, ability, target));
    tracing::info!(firer = %firer.id, %ability, %target, "Ability activated");
    Ok(())
}

/// Abilities declared among `declarations`.
#[must_use]
pub fn engaged<'a>(declarations: impl IntoIterator<Item = &'a AttackDeclaration>) -> AbilitySet {
    declarations
        .into_iter()
        .filter_map(|d| match d.kind {
            DeclarationKind::Ability(a) => Some(a.flag()),
            _ => None,
        })
        .fold(AbilitySet::empty(), |set, flag| set | flag)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{TeamId, UnitId, WeaponId};
    use crate::hex::{Facing, HexCoord};
    use crate::target::HexTargetKind;

    fn stalker() -> Combatant {
        Combatant::new(UnitId(1), TeamId(1), HexCoord::new(0, 0), Facing::North)
            .with_abilities(AbilitySet::BLOOD_STALKER)
    }

    #[test]
    fn test_activate_goes_to_front() {
        let firer = stalker();
        let mut queue = AttackQueue::new(firer.id);
        queue.push_back_unchecked(AttackDeclaration::weapon(
            firer.id,
            WeaponId(1),
            Target::Unit(UnitId(5)),
        ));

        let target = Target::Unit(UnitId(2));
        activate(SpecialAbility::BloodStalker, &firer, Some(&target), &mut queue).unwrap();

        let first = queue.iter().next().unwrap();
        assert_eq!(first.kind, DeclarationKind::Ability(SpecialAbility::BloodStalker));
        assert_eq!(first.target, target);
        assert_eq!(engaged(queue.iter()), AbilitySet::BLOOD_STALKER);
    }

    #[test]
    fn test_activation_is_idempotent() {
        let firer = stalker();
        let mut queue = AttackQueue::new(firer.id);
        let target = Target::Unit(UnitId(2));

        activate(SpecialAbility::BloodStalker, &firer, Some(&target), &mut queue).unwrap();
        let again = activate(SpecialAbility::BloodStalker, &firer, Some(&target), &mut queue);

        assert_eq!(
            again,
            Err(FireError::AbilityUnavailable(SpecialAbility::BloodStalker))
        );
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn test_requires_unit_target() {
        let firer = stalker();
        let queue = AttackQueue::new(firer.id);
        let hex = Target::hex(HexCoord::new(1, 1), HexTargetKind::Clear);

        assert!(!can_activate(SpecialAbility::BloodStalker, &firer, Some(&hex), &queue));
        assert!(!can_activate(SpecialAbility::BloodStalker, &firer, None, &queue));
    }

    #[test]
    fn test_requires_ability() {
        let firer = Combatant::new(UnitId(1), TeamId(1), HexCoord::new(0, 0), Facing::North);
        let queue = AttackQueue::new(firer.id);
        let target = Target::Unit(UnitId(2));
        assert!(!can_activate(SpecialAbility::BloodStalker, &firer, Some(&target), &queue));
    }

    #[test]
    fn test_refused_while_already_engaged() {
        let mut firer = stalker();
        firer.active_abilities = AbilitySet::BLOOD_STALKER;
        let queue = AttackQueue::new(firer.id);
        let target = Target::Unit(UnitId(2));
        assert!(!can_activate(SpecialAbility::BloodStalker, &firer, Some(&target), &queue));
    }
}
