//! The attack queue.
//!
//! Holds the acting unit's declarations in the order they were made and
//! keeps the bookkeeping that depends on them: weapon "used" flags, ammo
//! reservations and phase-wide internal bomb usage. [`AttackQueue::append`]
//! and [`AttackQueue::undo_last`] are exact inverses.
//!
//! At commit the queue is reordered so that attacks into the forward arc
//! resolve before attacks into the side and rear arcs, regardless of the
//! order they were clicked in. The to-hit penalty for engaging a secondary
//! target depends on that order.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};

use crate::abilities::SpecialAbility;
use crate::combatant::{AmmoId, Combatant, LoadoutClass, MunitionSet, UnitId, WeaponId};
use crate::declaration::{AttackDeclaration, BombPayload, DeclarationKind};
use crate::error::{FireError, Result};
use crate::hex::in_forward_arc;
use crate::oracle::Battlefield;
use crate::ordnance::{available_loadout, PhaseOrdnance};
use crate::rules::FireRules;

/// Why a declaration was left out of the committed queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// The target left the game after it was selected.
    TargetGone,
    /// The weapon is no longer mounted on the firer.
    WeaponGone,
}

/// A declaration skipped at commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroppedAttack {
    /// The skipped declaration.
    pub declaration: AttackDeclaration,
    /// Why it was skipped.
    pub reason: DropReason,
}

/// Output of [`AttackQueue::commit`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommittedQueue {
    /// Declarations in resolution order.
    pub attacks: Vec<AttackDeclaration>,
    /// Declarations that no longer made sense.
    pub dropped: Vec<DroppedAttack>,
}

/// Ordered attack declarations for one acting unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackQueue {
    firer: UnitId,
    declarations: VecDeque<AttackDeclaration>,
    reserved: BTreeMap<AmmoId, u32>,
}

impl AttackQueue {
    /// Create an empty queue for `firer`.
    #[must_use]
    pub fn new(firer: UnitId) -> Self {
        Self {
            firer,
            declarations: VecDeque::new(),
            reserved: BTreeMap::new(),
        }
    }

    /// Unit the queue belongs to.
    #[must_use]
    pub const fn firer(&self) -> UnitId {
        self.firer
    }

    /// Validate `declaration` and append it to the tail.
    ///
    /// Weapon attacks mark the weapon used, reserve one shot from the linked
    /// ammo bin and spend internal bombs from `ledger`. On error nothing
    /// changes.
    pub fn append(
        &mut self,
        declaration: AttackDeclaration,
        firer: &mut Combatant,
        ledger: &mut PhaseOrdnance,
        rules: &FireRules,
    ) -> Result<()> {
        if declaration.firer != self.firer || firer.id != self.firer {
            return Err(FireError::UnknownCombatant(declaration.firer));
        }
        if let Some(weapon) = declaration.weapon_id() {
            self.check_weapon_attack(&declaration, weapon, firer, ledger, rules)?;
        }

        if let Some(weapon) = declaration.weapon_id().and_then(|id| firer.weapon_mut(id)) {
            weapon.used_this_round = true;
        }
        if let Some(ammo) = declaration.ammo {
            *self.reserved.entry(ammo.bin).or_default() += 1;
        }
        ledger.spend(declaration.bombs(LoadoutClass::Internal).total());

        tracing::debug!(
            firer = %self.firer,
            kind = ?declaration.kind,
            target = %declaration.target,
            strafing = declaration.strafing,
            queued = self.declarations.len() + 1,
            "Attack declared"
        );
        self.declarations.push_back(declaration);

        #[cfg(feature = "debug-validation")]
        self.assert_consistent(firer, ledger, rules);

        Ok(())
    }

    /// Panics if reservations or bomb usage went past what the unit and
    /// the phase allow.
    #[cfg(feature = "debug-validation")]
    fn assert_consistent(&self, firer: &Combatant, ledger: &PhaseOrdnance, rules: &FireRules) {
        if let Err(problem) = self.check_consistent(firer, ledger, rules) {
            panic!("{problem}");
        }
    }

    /// Cross-check the queue against the unit's bins and the phase ledger.
    ///
    /// Pending internal usage must equal what the queued declarations carry,
    /// and any bombs the session adds must fit under the phase cap.
    #[cfg(any(test, feature = "debug-validation"))]
    pub(crate) fn check_consistent(
        &self,
        firer: &Combatant,
        ledger: &PhaseOrdnance,
        rules: &FireRules,
    ) -> std::result::Result<(), String> {
        for (&bin, &reserved) in &self.reserved {
            if let Some(bin) = firer.ammo_bin(bin) {
                if reserved > bin.shots {
                    return Err(format!(
                        "{} over-reserved: {reserved} of {}",
                        bin.id, bin.shots
                    ));
                }
            }
        }
        let queued: u32 = self
            .declarations
            .iter()
            .map(|d| d.bombs(LoadoutClass::Internal).total())
            .sum();
        if queued != ledger.pending {
            return Err(format!(
                "ledger pending {} but {queued} internal bombs queued",
                ledger.pending
            ));
        }
        if queued > 0 && ledger.used() > rules.internal_bombs_per_phase {
            return Err(format!(
                "internal bombs over the phase cap: {} of {}",
                ledger.used(),
                rules.internal_bombs_per_phase
            ));
        }
        Ok(())
    }

    fn check_weapon_attack(
        &self,
        declaration: &AttackDeclaration,
        id: WeaponId,
        firer: &Combatant,
        ledger: &PhaseOrdnance,
        rules: &FireRules,
    ) -> Result<()> {
        let weapon = firer.weapon(id).ok_or(FireError::UnknownWeapon(id))?;
        if !weapon.is_manually_fireable() {
            return Err(FireError::WeaponNotFireable(id));
        }
        if weapon.used_this_round && !self.continues_strafing_volley(declaration, id) {
            return Err(FireError::WeaponAlreadyUsed(id));
        }
        if declaration.aimed_location.is_some() && !weapon.can_aim {
            return Err(FireError::AimingNotSupported(id));
        }

        let classes = weapon.bomb_classes();
        if !classes.is_empty() {
            let payload = match declaration.bomb_payload {
                Some(payload) => payload,
                // later shots of a strafing run ride on the first shot's bombs
                None if self.continues_strafing_volley(declaration, id) => BombPayload::default(),
                None => return Err(FireError::PayloadUnresolved(id)),
            };
            for class in [LoadoutClass::Internal, LoadoutClass::External] {
                let requested = *payload.class(class);
                if requested.is_empty() {
                    continue;
                }
                if !classes.contains(&class) {
                    return Err(FireError::WrongBombClass { weapon: id, class });
                }
                let allowance = available_loadout(firer, self, class, None, ledger, rules);
                let granted = allowance.map(|a| a.clamp(&requested)).unwrap_or_default();
                if granted != requested {
                    return Err(FireError::BombCapExceeded {
                        requested: requested.total(),
                        remaining: allowance.map_or(0, |a| a.cap),
                    });
                }
            }
        }

        if let Some(ammo) = declaration.ammo {
            if ammo.munitions.contains(MunitionSet::VIBRABOMB)
                && declaration.extras.vibrabomb_setting.is_none()
            {
                return Err(FireError::SettingUnresolved(id));
            }
            let shots = firer.ammo_bin(ammo.bin).map_or(0, |bin| bin.shots);
            if self.reserved_shots(ammo.bin) >= shots {
                return Err(FireError::OutOfAmmo(ammo.bin));
            }
        }
        Ok(())
    }

    /// A strafing run fires the same weapon once per hex. Every shot after
    /// the first rides on the first shot's use of the weapon.
    fn continues_strafing_volley(&self, declaration: &AttackDeclaration, id: WeaponId) -> bool {
        declaration.strafing
            && !declaration.strafing_first_shot
            && self
                .declarations
                .back()
                .is_some_and(|tail| tail.strafing && tail.weapon_id() == Some(id))
    }

    /// Pop the most recent tail declaration and reverse its bookkeeping.
    ///
    /// The weapon's used flag is cleared once no remaining declaration
    /// references it.
    pub fn undo_last(
        &mut self,
        firer: &mut Combatant,
        ledger: &mut PhaseOrdnance,
    ) -> Option<AttackDeclaration> {
        let declaration = self.declarations.pop_back()?;

        if let Some(ammo) = declaration.ammo {
            if let Some(count) = self.reserved.get_mut(&ammo.bin) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    self.reserved.remove(&ammo.bin);
                }
            }
        }
        ledger.release(declaration.bombs(LoadoutClass::Internal).total());

        if let Some(id) = declaration.weapon_id() {
            let still_used = self.is_weapon_used(id);
            if let Some(weapon) = firer.weapon_mut(id) {
                weapon.used_this_round = still_used;
            }
        }

        tracing::debug!(
            firer = %self.firer,
            kind = ?declaration.kind,
            remaining = self.declarations.len(),
            "Attack undone"
        );
        Some(declaration)
    }

    /// Undo the last declaration together with the rest of its strafing volley.
    ///
    /// Returns the undone declarations, most recent first.
    pub fn undo_volley(
        &mut self,
        firer: &mut Combatant,
        ledger: &mut PhaseOrdnance,
    ) -> Vec<AttackDeclaration> {
        let mut undone = Vec::new();
        while let Some(declaration) = self.undo_last(firer, ledger) {
            let done = !declaration.strafing || declaration.strafing_first_shot;
            undone.push(declaration);
            if done {
                break;
            }
        }
        undone
    }

    /// Undo every declaration.
    pub fn clear(&mut self, firer: &mut Combatant, ledger: &mut PhaseOrdnance) {
        while self.undo_last(firer, ledger).is_some() {}
    }

    /// Place a zero-weapon declaration ahead of every other declaration.
    pub fn push_front(&mut self, declaration: AttackDeclaration) {
        self.declarations.push_front(declaration);
    }

    /// Whether any declaration references `weapon`.
    #[must_use]
    pub fn is_weapon_used(&self, weapon: WeaponId) -> bool {
        self.declarations
            .iter()
            .any(|d| d.weapon_id() == Some(weapon))
    }

    /// Whether `ability` has a declaration queued.
    #[must_use]
    pub fn has_ability(&self, ability: SpecialAbility) -> bool {
        self.declarations
            .iter()
            .any(|d| d.kind == DeclarationKind::Ability(ability))
    }

    /// Whether a spotting declaration is queued.
    #[must_use]
    pub fn has_spot(&self) -> bool {
        self.declarations
            .iter()
            .any(|d| d.kind == DeclarationKind::Spot)
    }

    /// Shots reserved from `bin` by queued declarations.
    #[must_use]
    pub fn reserved_shots(&self, bin: AmmoId) -> u32 {
        self.reserved.get(&bin).copied().unwrap_or(0)
    }

    /// Declarations in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &AttackDeclaration> + '_ {
        self.declarations.iter()
    }

    /// Most recent tail declaration.
    #[must_use]
    pub fn last(&self) -> Option<&AttackDeclaration> {
        self.declarations.back()
    }

    /// Number of declarations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    /// Produce the queue sent to the server.
    ///
    /// Declarations whose target or weapon no longer exists are dropped
    /// and reported. The rest are emitted in two stable passes:
    ///
    /// 1. Artillery attacks and zero-weapon declarations, unchanged, plus
    ///    weapon attacks whose target is in the forward arc now.
    /// 2. Every other weapon attack.
    ///
    /// The arc uses the firer's current facing on the board, which may
    /// differ from the snapshot after a twist. Weapon attacks are reissued
    /// as fresh declarations. When a strafing run loses its first shot, the
    /// first surviving shot of the run takes over the first-shot marker.
    #[must_use]
    pub fn commit(&self, firer: &Combatant, battlefield: &dyn Battlefield) -> CommittedQueue {
        let current = battlefield.combatant(firer.id).unwrap_or(firer);
        let origin = current.position;
        let facing = current.weapon_arc_facing();

        let mut committed = CommittedQueue::default();
        let mut live = Vec::with_capacity(self.declarations.len());
        // weapon of a strafing run whose first shot was dropped
        let mut orphaned_run: Option<WeaponId> = None;
        for declaration in &self.declarations {
            let reason = if !battlefield.target_exists(&declaration.target) {
                Some(DropReason::TargetGone)
            } else if declaration
                .weapon_id()
                .is_some_and(|id| current.weapon(id).is_none())
            {
                Some(DropReason::WeaponGone)
            } else {
                None
            };
            match reason {
                Some(reason) => {
                    tracing::warn!(
                        firer = %self.firer,
                        target = %declaration.target,
                        %reason,
                        "Stale attack dropped at commit"
                    );
                    if declaration.strafing_first_shot {
                        orphaned_run = declaration.weapon_id();
                    }
                    committed.dropped.push(DroppedAttack {
                        declaration: declaration.clone(),
                        reason,
                    });
                }
                None => {
                    let mut declaration = declaration.clone();
                    let continues_run = declaration.strafing && !declaration.strafing_first_shot;
                    if continues_run
                        && orphaned_run.is_some()
                        && declaration.weapon_id() == orphaned_run
                    {
                        declaration.strafing_first_shot = true;
                    }
                    orphaned_run = None;
                    live.push(declaration);
                }
            }
        }

        let is_artillery = |d: &AttackDeclaration| {
            d.weapon_id()
                .and_then(|id| current.weapon(id))
                .is_some_and(|w| w.is_artillery())
        };
        let in_front = |d: &AttackDeclaration| {
            battlefield
                .target_position(&d.target)
                .is_some_and(|pos| in_forward_arc(origin, facing, pos))
        };

        let mut rear = Vec::new();
        for declaration in live {
            if !declaration.is_weapon_attack() || is_artillery(&declaration) {
                committed.attacks.push(declaration);
            } else if in_front(&declaration) {
                committed.attacks.push(declaration.reissue());
            } else {
                rear.push(declaration.reissue());
            }
        }
        committed.attacks.extend(rear);

        tracing::info!(
            firer = %self.firer,
            attacks = committed.attacks.len(),
            dropped = committed.dropped.len(),
            "Attack queue committed"
        );
        committed
    }

    /// Append without any validation or bookkeeping.
    #[cfg(test)]
    pub(crate) fn push_back_unchecked(&mut self, declaration: AttackDeclaration) {
        self.declarations.push_back(declaration);
    }
}
