//! The per-unit fire turn.
//!
//! A [`TurnSession`] is created when a unit becomes eligible to act and is
//! consumed by [`TurnSession::commit`] or [`TurnSession::cancel`]. In
//! between, UI events arrive one at a time and each fully updates the
//! session before the next is accepted:
//!
//! ```text
//! SelectingWeapon -> Targeting -> (fire / undo)* -> commit | cancel
//!        \-> Strafing (hex picks) -/
//! ```
//!
//! Multi-step decisions that a UI would show as dialogs (bomb payload,
//! vibrabomb setting) are exposed as pending-decision queries plus a
//! discrete resolve call, so the whole turn can be driven headlessly.
//!
//! The session owns a snapshot of the acting unit. Weapon "used" flags,
//! mode changes and weapon order live on that snapshot; everything else on
//! the board is read through [`FireContext`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::abilities::{self, SpecialAbility};
use crate::catalog::{CycleDirection, CycleFilter, TargetCatalog};
use crate::combatant::{
    BombLoadout, Combatant, LoadoutClass, MunitionSet, UnitId, WeaponFlags, WeaponId,
};
use crate::declaration::{AimingMode, AmmoLink, AttackDeclaration, AttackExtras, BombPayload};
use crate::error::{FireError, Result};
use crate::hex::HexCoord;
use crate::oracle::{Battlefield, FireContext, ShotRequest, ToHit};
use crate::ordnance::{available_loadout, BombAllowance, PhaseOrdnance};
use crate::packet::{CommitPacket, SessionCommand, ShotCall, PACKET_VERSION};
use crate::queue::AttackQueue;
use crate::rules::FireRules;
use crate::strafing::{StrafeRejection, StrafingRun};
use crate::target::{HexTargetKind, Target};

/// Where the turn currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SessionPhase {
    /// No weapon selected.
    SelectingWeapon,
    /// A weapon is selected and targets are being picked.
    Targeting,
    /// Picking strafing hexes.
    Strafing,
    /// Every fireable weapon has been declared.
    Ready,
}

/// One acting unit's fire turn.
#[derive(Debug, Clone)]
pub struct TurnSession {
    firer: Combatant,
    queue: AttackQueue,
    catalog: TargetCatalog,
    run: StrafingRun,
    strafing: bool,
    weapon: Option<WeaponId>,
    target: Option<Target>,
    aimed_location: Option<u8>,
    aiming_mode: AimingMode,
    payloads: BTreeMap<WeaponId, BombPayload>,
    vibrabomb_settings: BTreeMap<WeaponId, u32>,
    called_shots: BTreeMap<WeaponId, ShotCall>,
    ledger: PhaseOrdnance,
    commands: Vec<SessionCommand>,
    last_to_hit: Option<ToHit>,
    last_feasible: bool,
}

impl TurnSession {
    /// Start a turn for `firer` with `ledger` holding the phase's internal
    /// bomb usage so far.
    #[must_use]
    pub fn new(firer: Combatant, ledger: PhaseOrdnance) -> Self {
        tracing::info!(
            firer = %firer.id,
            weapons = firer.weapons.len(),
            bombs_used = ledger.used(),
            "Fire turn started"
        );
        Self {
            queue: AttackQueue::new(firer.id),
            firer,
            catalog: TargetCatalog::new(),
            run: StrafingRun::new(),
            strafing: false,
            weapon: None,
            target: None,
            aimed_location: None,
            aiming_mode: AimingMode::None,
            payloads: BTreeMap::new(),
            vibrabomb_settings: BTreeMap::new(),
            called_shots: BTreeMap::new(),
            ledger,
            commands: Vec::new(),
            last_to_hit: None,
            last_feasible: false,
        }
    }

    /// Start a turn for the unit `id` as it currently stands on the board.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::UnknownCombatant`] if the board has no such unit.
    pub fn start(id: UnitId, ledger: PhaseOrdnance, ctx: &FireContext<'_>) -> Result<Self> {
        let firer = ctx
            .battlefield
            .combatant(id)
            .cloned()
            .ok_or(FireError::UnknownCombatant(id))?;
        Ok(Self::new(firer, ledger))
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Select a weapon.
    ///
    /// Grenade launchers always fire into the adjacent hex their mount
    /// faces, so selecting one also selects that hex.
    ///
    /// # Errors
    ///
    /// Fails if the weapon is not mounted or fires only automatically.
    pub fn select_weapon(&mut self, id: WeaponId, ctx: &FireContext<'_>) -> Result<()> {
        let mount = self.firer.weapon(id).ok_or(FireError::UnknownWeapon(id))?;
        if !mount.is_manually_fireable() {
            return Err(FireError::WeaponNotFireable(id));
        }
        if mount.flags.contains(WeaponFlags::VGL) {
            let facing = self.firer.facing.rotate(mount.mount_facing);
            self.target = Some(Target::hex(
                self.firer.position.neighbor(facing),
                HexTargetKind::Clear,
            ));
        }
        if self.weapon != Some(id) {
            self.aimed_location = None;
            self.aiming_mode = AimingMode::None;
        }
        self.weapon = Some(id);
        tracing::debug!(firer = %self.firer.id, weapon = %id, "Weapon selected");
        self.refresh_to_hit(ctx);
        Ok(())
    }

    /// Select the next unused, manually fireable weapon after the current
    /// one, wrapping around. Clears the selection if none is left.
    pub fn next_weapon(&mut self, ctx: &FireContext<'_>) -> Option<WeaponId> {
        let weapons = &self.firer.weapons;
        let start = self
            .weapon
            .and_then(|id| weapons.iter().position(|w| w.id == id))
            .map_or(0, |i| i + 1);

        let next = (0..weapons.len())
            .map(|offset| &weapons[(start + offset) % weapons.len()])
            .find(|w| !w.used_this_round && w.is_manually_fireable())
            .map(|w| w.id);

        match next {
            Some(id) => {
                // select_weapon cannot fail for a mounted, fireable weapon
                if self.select_weapon(id, ctx).is_err() {
                    self.weapon = None;
                }
            }
            None => {
                self.weapon = None;
                self.refresh_to_hit(ctx);
            }
        }
        self.weapon
    }

    /// Select a target directly, or clear the target with `None`.
    pub fn select_target(&mut self, target: Option<Target>, ctx: &FireContext<'_>) {
        if let Some(target) = &target {
            self.catalog.point_at(target);
        }
        self.target = target;
        tracing::debug!(firer = %self.firer.id, target = ?self.target, "Target selected");
        self.refresh_to_hit(ctx);
    }

    /// Snapshot `candidates` for target cycling.
    pub fn cache_targets(&mut self, candidates: &[Target], ctx: &FireContext<'_>) {
        self.catalog
            .cache_for(&self.firer, candidates, ctx.battlefield);
    }

    /// Cycle to the next or previous cataloged target.
    ///
    /// Legality is judged for the selected weapon. When nothing passes the
    /// filter the current target stays selected and `None` is returned.
    pub fn cycle_target(
        &mut self,
        direction: CycleDirection,
        filter: CycleFilter,
        ctx: &FireContext<'_>,
    ) -> Option<Target> {
        let template = self.shot_template();
        let max_roll = ctx.rules.max_feasible_roll;
        let found = self.catalog.next(direction, filter, |target| {
            let request = ShotRequest {
                target: *target,
                ..template.clone()
            };
            ctx.oracle.legality(&request).is_feasible(max_roll)
        });
        if let Some(target) = found {
            self.target = Some(target);
            self.refresh_to_hit(ctx);
        }
        found
    }

    /// Set the aimed location and aiming mode for the next shot.
    ///
    /// # Errors
    ///
    /// Fails if a location is given and the selected weapon cannot aim.
    pub fn set_aiming(
        &mut self,
        location: Option<u8>,
        mode: AimingMode,
        ctx: &FireContext<'_>,
    ) -> Result<()> {
        if let (Some(_), Some(id)) = (location, self.weapon) {
            let mount = self.firer.weapon(id).ok_or(FireError::UnknownWeapon(id))?;
            if !mount.can_aim {
                return Err(FireError::AimingNotSupported(id));
            }
        }
        self.aimed_location = location;
        self.aiming_mode = if location.is_some() {
            mode
        } else {
            AimingMode::None
        };
        self.refresh_to_hit(ctx);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Strafing
    // ------------------------------------------------------------------

    /// Turn strafing mode on or off and return the new state.
    ///
    /// Turning it off discards the run. Once attacks are queued the run is
    /// frozen, so strafing can no longer be toggled.
    ///
    /// # Errors
    ///
    /// Fails if the unit cannot strafe or attacks are already queued.
    pub fn toggle_strafing(&mut self, ctx: &FireContext<'_>) -> Result<bool> {
        if !self.firer.supports_strafing() {
            return Err(FireError::StrafeRejected(StrafeRejection::NotAerial));
        }
        if !self.queue.is_empty() {
            return Err(FireError::StrafeRejected(StrafeRejection::AttacksQueued));
        }
        self.strafing = !self.strafing;
        self.run.clear();
        self.target = None;
        tracing::debug!(firer = %self.firer.id, strafing = self.strafing, "Strafing toggled");
        self.refresh_to_hit(ctx);
        Ok(self.strafing)
    }

    /// Add a hex to the strafing run, entering strafing mode if needed.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::StrafeRejected`] with the first rule the hex
    /// breaks. The run is unchanged.
    pub fn pick_strafe_hex(&mut self, hex: HexCoord, ctx: &FireContext<'_>) -> Result<()> {
        if !self.strafing {
            self.toggle_strafing(ctx)?;
        }
        self.run
            .try_push(hex, &self.firer, self.queue.len(), ctx.battlefield, ctx.rules)
            .map_err(|rejection| {
                tracing::debug!(firer = %self.firer.id, %hex, %rejection, "Strafing hex rejected");
                FireError::StrafeRejected(rejection)
            })?;
        self.refresh_to_hit(ctx);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Pending decisions
    // ------------------------------------------------------------------

    /// Loadout classes the selected weapon still needs a payload for.
    ///
    /// Classes with nothing left to drop are not listed; there is nothing
    /// to ask about.
    #[must_use]
    pub fn needs_bomb_payload(&self, rules: &FireRules) -> Vec<LoadoutClass> {
        let Some(mount) = self.weapon.and_then(|id| self.firer.weapon(id)) else {
            return Vec::new();
        };
        if self.payloads.contains_key(&mount.id) {
            return Vec::new();
        }
        mount
            .bomb_classes()
            .into_iter()
            .filter(|&class| self.bomb_allowance(class, rules).is_some())
            .collect()
    }

    /// What the selected weapon may still drop from `class`.
    #[must_use]
    pub fn bomb_allowance(&self, class: LoadoutClass, rules: &FireRules) -> Option<BombAllowance> {
        let mount = self.weapon.and_then(|id| self.firer.weapon(id))?;
        let per_call = (class == LoadoutClass::External
            && mount.flags.contains(WeaponFlags::SPACE_BOMB))
        .then_some(rules.space_bomb_limit);
        available_loadout(&self.firer, &self.queue, class, per_call, &self.ledger, rules)
    }

    /// Answer the bomb payload decision for the selected weapon.
    ///
    /// The request is clamped to what is available; the granted payload is
    /// returned.
    ///
    /// # Errors
    ///
    /// Fails if no weapon is selected, or if the selected weapon does not
    /// drop bombs from `class`.
    pub fn resolve_bomb_payload(
        &mut self,
        class: LoadoutClass,
        request: &BombLoadout,
        rules: &FireRules,
    ) -> Result<BombLoadout> {
        let id = self.weapon.ok_or(FireError::NoWeaponSelected)?;
        let mount = self.firer.weapon(id).ok_or(FireError::UnknownWeapon(id))?;
        if !mount.bomb_classes().contains(&class) {
            return Err(FireError::WrongBombClass { weapon: id, class });
        }
        let granted = self
            .bomb_allowance(class, rules)
            .map(|allowance| allowance.clamp(request))
            .unwrap_or_default();
        *self.payloads.entry(id).or_default().class_mut(class) = granted;
        tracing::debug!(
            firer = %self.firer.id,
            weapon = %id,
            ?class,
            bombs = granted.total(),
            "Bomb payload resolved"
        );
        Ok(granted)
    }

    /// Whether the selected weapon fires vibrabombs with no setting chosen.
    #[must_use]
    pub fn needs_vibrabomb_setting(&self) -> bool {
        let Some(id) = self.weapon else {
            return false;
        };
        self.munitions(id).contains(MunitionSet::VIBRABOMB)
            && !self.vibrabomb_settings.contains_key(&id)
    }

    /// Answer the vibrabomb setting decision, in tons.
    ///
    /// # Errors
    ///
    /// Fails if no weapon is selected.
    pub fn resolve_vibrabomb_setting(&mut self, tons: u32) -> Result<()> {
        let id = self.weapon.ok_or(FireError::NoWeaponSelected)?;
        self.vibrabomb_settings.insert(id, tons);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    /// Activate a special ability against the selected target.
    ///
    /// # Errors
    ///
    /// Fails if the ability is not available; see [`abilities::check_activate`].
    pub fn activate_ability(&mut self, ability: SpecialAbility) -> Result<()> {
        abilities::activate(ability, &self.firer, self.target.as_ref(), &mut self.queue)
    }

    /// Whether `ability` could be activated now.
    #[must_use]
    pub fn can_activate(&self, ability: SpecialAbility) -> bool {
        abilities::can_activate(ability, &self.firer, self.target.as_ref(), &self.queue)
    }

    /// Spot the selected unit for indirect fire.
    ///
    /// Spotting twice is a no-op.
    ///
    /// # Errors
    ///
    /// Fails without a unit target, or if the unit cannot spot it.
    pub fn spot(&mut self, ctx: &FireContext<'_>) -> Result<()> {
        if self.queue.has_spot() {
            return Ok(());
        }
        let target = self.target.ok_or(FireError::NoTargetSelected)?;
        if !self.is_spot_enabled(ctx) {
            return Err(FireError::SpotUnavailable);
        }
        self.queue.append(
            AttackDeclaration::spot(self.firer.id, target),
            &mut self.firer,
            &mut self.ledger,
            ctx.rules,
        )?;
        tracing::info!(firer = %self.firer.id, %target, "Spotting declared");
        Ok(())
    }

    /// Fire the selected weapon.
    ///
    /// In strafing mode one declaration is queued per target in every run
    /// hex, or per empty hex. Otherwise a single declaration is queued
    /// against the selected target. Either way all or none are queued.
    /// On success the next weapon is selected and the number of queued
    /// declarations is returned.
    ///
    /// # Errors
    ///
    /// Fails with nothing selected, with a used weapon, with an unresolved
    /// decision, or when the oracle rules the shot out.
    pub fn fire(&mut self, ctx: &FireContext<'_>) -> Result<usize> {
        let id = self.weapon.ok_or(FireError::NoWeaponSelected)?;
        let mount = self.firer.weapon(id).ok_or(FireError::UnknownWeapon(id))?;
        if mount.used_this_round {
            return Err(FireError::WeaponAlreadyUsed(id));
        }

        let targets = if self.strafing {
            self.strafing_targets(ctx.battlefield)
        } else {
            self.target.into_iter().collect()
        };
        if targets.is_empty() {
            return Err(FireError::NoTargetSelected);
        }

        let payload = if mount.bomb_classes().is_empty() {
            None
        } else {
            match self.payloads.get(&id) {
                Some(payload) if payload.total() > 0 => Some(*payload),
                _ => return Err(FireError::PayloadUnresolved(id)),
            }
        };

        let ammo = mount
            .linked_ammo
            .and_then(|bin| self.firer.ammo_bin(bin))
            .map(|bin| AmmoLink {
                bin: bin.id,
                carrier: bin.owner,
                munitions: bin.munitions,
            });
        let mut extras = AttackExtras::default();
        if ammo.is_some_and(|a| a.munitions.contains(MunitionSet::VIBRABOMB)) {
            extras.vibrabomb_setting = Some(
                *self
                    .vibrabomb_settings
                    .get(&id)
                    .ok_or(FireError::SettingUnresolved(id))?,
            );
        }

        let verdict = ctx.oracle.legality(&ShotRequest {
            target: targets[0],
            ..self.shot_template()
        });
        if !verdict.is_feasible(ctx.rules.max_feasible_roll) {
            return Err(FireError::ShotImpossible(verdict.describe()));
        }

        let declarations: Vec<_> = targets
            .iter()
            .enumerate()
            .map(|(i, &target)| {
                let mut declaration = AttackDeclaration::weapon(self.firer.id, id, target)
                    .with_aim(self.aimed_location, self.aiming_mode)
                    .with_impact_hex(self.impact_hex(target, ctx.battlefield))
                    .with_extras(extras);
                if let Some(ammo) = ammo {
                    declaration = declaration.with_ammo(ammo);
                }
                // the volley's bombs are carried once, on the first shot
                if let Some(payload) = payload.filter(|_| i == 0) {
                    declaration = declaration.with_payload(payload);
                }
                if self.strafing {
                    declaration = declaration.with_strafing(i == 0);
                }
                declaration
            })
            .collect();

        let count = declarations.len();
        for (appended, declaration) in declarations.into_iter().enumerate() {
            if let Err(e) =
                self.queue
                    .append(declaration, &mut self.firer, &mut self.ledger, ctx.rules)
            {
                for _ in 0..appended {
                    self.queue.undo_last(&mut self.firer, &mut self.ledger);
                }
                return Err(e);
            }
        }

        self.payloads.remove(&id);
        self.vibrabomb_settings.remove(&id);
        tracing::info!(
            firer = %self.firer.id,
            weapon = %id,
            declarations = count,
            strafing = self.strafing,
            "Weapon fired"
        );
        self.next_weapon(ctx);
        Ok(count)
    }

    /// Undo the most recent declaration, or the whole strafing volley it
    /// belongs to. Returns the undone declarations, most recent first.
    pub fn undo(&mut self, ctx: &FireContext<'_>) -> Vec<AttackDeclaration> {
        let undone = self.queue.undo_volley(&mut self.firer, &mut self.ledger);
        if let Some(first) = undone.last() {
            tracing::debug!(
                firer = %self.firer.id,
                kind = ?first.kind,
                declarations = undone.len(),
                "Undo"
            );
        }
        self.refresh_to_hit(ctx);
        undone
    }

    /// Undo every declaration.
    pub fn clear_attacks(&mut self, ctx: &FireContext<'_>) {
        self.queue.clear(&mut self.firer, &mut self.ledger);
        self.refresh_to_hit(ctx);
    }

    // ------------------------------------------------------------------
    // Out-of-queue commands
    // ------------------------------------------------------------------

    /// Request a fire mode change for `weapon`, applied at end of phase.
    ///
    /// # Errors
    ///
    /// Fails for an unknown weapon or mode.
    pub fn set_fire_mode(&mut self, weapon: WeaponId, mode: usize) -> Result<()> {
        let mount = self
            .firer
            .weapon_mut(weapon)
            .ok_or(FireError::UnknownWeapon(weapon))?;
        if mode >= mount.modes.len() {
            return Err(FireError::UnknownMode { weapon, mode });
        }
        mount.pending_mode = (mode != mount.mode).then_some(mode);
        self.commands.push(SessionCommand::FireMode { weapon, mode });
        tracing::debug!(firer = %self.firer.id, %weapon, mode, "Fire mode change requested");
        Ok(())
    }

    /// Advance the called shot for `weapon` and return the new call.
    ///
    /// # Errors
    ///
    /// Fails for an unknown weapon.
    pub fn set_called_shot(&mut self, weapon: WeaponId) -> Result<ShotCall> {
        if self.firer.weapon(weapon).is_none() {
            return Err(FireError::UnknownWeapon(weapon));
        }
        let call = self.called_shots.entry(weapon).or_default();
        *call = call.next();
        let call = *call;
        self.commands
            .push(SessionCommand::CalledShot { weapon, call });
        tracing::debug!(firer = %self.firer.id, %weapon, %call, "Called shot changed");
        Ok(call)
    }

    /// Replace the unit's weapon order.
    ///
    /// # Errors
    ///
    /// Fails unless `order` lists every mounted weapon exactly once.
    pub fn reorder_weapons(&mut self, order: Vec<WeaponId>) -> Result<()> {
        let mut sorted = order.clone();
        sorted.sort_unstable();
        let mut mounted: Vec<_> = self.firer.weapons.iter().map(|w| w.id).collect();
        mounted.sort_unstable();
        if sorted != mounted {
            return Err(FireError::InvalidWeaponOrder);
        }

        self.firer
            .weapons
            .sort_by_key(|w| order.iter().position(|&id| id == w.id));
        tracing::debug!(firer = %self.firer.id, ?order, "Weapon order changed");
        self.commands.push(SessionCommand::WeaponOrder { order });
        Ok(())
    }

    // ------------------------------------------------------------------
    // End of turn
    // ------------------------------------------------------------------

    /// End the turn and produce the packet for the server.
    ///
    /// Always succeeds, including with an empty queue, so a forced commit
    /// can happen at any point.
    #[must_use]
    pub fn commit(self, ctx: &FireContext<'_>) -> CommitPacket {
        let committed = self.queue.commit(&self.firer, ctx.battlefield);

        let mut ordnance = self.ledger;
        for dropped in &committed.dropped {
            ordnance.release(dropped.declaration.bombs(LoadoutClass::Internal).total());
        }
        ordnance.settle();

        let engaged = abilities::engaged(&committed.attacks);

        tracing::info!(
            firer = %self.firer.id,
            attacks = committed.attacks.len(),
            commands = self.commands.len(),
            dropped = committed.dropped.len(),
            "Fire turn committed"
        );
        CommitPacket {
            version: PACKET_VERSION,
            firer: self.firer.id,
            attacks: committed.attacks,
            commands: self.commands,
            dropped: committed.dropped,
            ordnance,
            abilities: engaged,
        }
    }

    /// Abandon the turn without sending anything.
    ///
    /// Returns the phase ledger as it stood before the turn.
    #[must_use]
    pub fn cancel(self) -> PhaseOrdnance {
        tracing::info!(
            firer = %self.firer.id,
            discarded = self.queue.len(),
            "Fire turn cancelled"
        );
        PhaseOrdnance::new(self.ledger.resolved)
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    /// Whether firing the selected weapon would be accepted.
    #[must_use]
    pub fn is_fire_enabled(&self) -> bool {
        let Some(mount) = self.weapon.and_then(|id| self.firer.weapon(id)) else {
            return false;
        };
        let aimed = if self.strafing {
            !self.run.is_empty()
        } else {
            self.target.is_some()
        };
        !mount.used_this_round && mount.is_manually_fireable() && aimed && self.last_feasible
    }

    /// Whether [`spot`](Self::spot) would queue a spotting declaration.
    #[must_use]
    pub fn is_spot_enabled(&self, ctx: &FireContext<'_>) -> bool {
        let Some(target) = self.target.filter(Target::is_unit) else {
            return false;
        };
        self.firer.can_spot()
            && !self.queue.has_spot()
            && ctx.battlefield.has_line_of_sight(self.firer.id, &target)
    }

    /// Whether strafing mode may be entered.
    #[must_use]
    pub fn is_strafe_enabled(&self) -> bool {
        self.firer.supports_strafing() && self.queue.is_empty()
    }

    /// The oracle's last verdict, described.
    #[must_use]
    pub fn to_hit_summary(&self) -> Option<String> {
        self.last_to_hit.as_ref().map(ToHit::describe)
    }

    /// The oracle's last verdict.
    #[must_use]
    pub const fn last_to_hit(&self) -> Option<&ToHit> {
        self.last_to_hit.as_ref()
    }

    /// Where the turn stands.
    #[must_use]
    pub fn phase(&self) -> SessionPhase {
        let any_left = self
            .firer
            .weapons
            .iter()
            .any(|w| !w.used_this_round && w.is_manually_fireable());
        if !any_left {
            SessionPhase::Ready
        } else if self.strafing {
            SessionPhase::Strafing
        } else if self.weapon.is_none() {
            SessionPhase::SelectingWeapon
        } else {
            SessionPhase::Targeting
        }
    }

    /// The acting unit's snapshot.
    #[must_use]
    pub const fn firer(&self) -> &Combatant {
        &self.firer
    }

    /// The attack queue in declaration order.
    #[must_use]
    pub const fn queue(&self) -> &AttackQueue {
        &self.queue
    }

    /// The target catalog.
    #[must_use]
    pub const fn catalog(&self) -> &TargetCatalog {
        &self.catalog
    }

    /// The strafing run.
    #[must_use]
    pub const fn strafing_run(&self) -> &StrafingRun {
        &self.run
    }

    /// Whether strafing mode is on.
    #[must_use]
    pub const fn is_strafing(&self) -> bool {
        self.strafing
    }

    /// Selected weapon.
    #[must_use]
    pub const fn selected_weapon(&self) -> Option<WeaponId> {
        self.weapon
    }

    /// Selected target.
    #[must_use]
    pub const fn selected_target(&self) -> Option<Target> {
        self.target
    }

    /// Phase-wide internal bomb usage including this turn's declarations.
    #[must_use]
    pub const fn ledger(&self) -> &PhaseOrdnance {
        &self.ledger
    }

    /// Out-of-queue commands issued so far.
    #[must_use]
    pub fn commands(&self) -> &[SessionCommand] {
        &self.commands
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn shot_template(&self) -> ShotRequest {
        ShotRequest {
            firer: self.firer.id,
            target: self.target.unwrap_or(Target::Unit(self.firer.id)),
            weapon: self.weapon,
            aimed_location: self.aimed_location,
            aiming_mode: self.aiming_mode,
            strafing: self.strafing,
        }
    }

    fn munitions(&self, weapon: WeaponId) -> MunitionSet {
        self.firer
            .weapon(weapon)
            .and_then(|w| w.linked_ammo)
            .and_then(|bin| self.firer.ammo_bin(bin))
            .map_or(MunitionSet::empty(), |bin| bin.munitions)
    }

    fn strafing_targets(&self, battlefield: &dyn Battlefield) -> Vec<Target> {
        let mut targets = Vec::new();
        for &hex in self.run.hexes() {
            let units: Vec<_> = battlefield
                .ground_targets_at(hex)
                .into_iter()
                .filter(|&id| id != self.firer.id)
                .map(Target::Unit)
                .collect();
            if units.is_empty() {
                targets.push(Target::hex(hex, HexTargetKind::Clear));
            } else {
                targets.extend(units);
            }
        }
        targets
    }

    /// Ground-to-air shots record where on the target's flight path they hit.
    fn impact_hex(&self, target: Target, battlefield: &dyn Battlefield) -> Option<HexCoord> {
        let id = target.unit()?;
        let airborne = battlefield.combatant(id).is_some_and(Combatant::is_airborne);
        if airborne && !self.firer.is_airborne() {
            battlefield.impact_hex(self.firer.id, id)
        } else {
            None
        }
    }

    fn refresh_to_hit(&mut self, ctx: &FireContext<'_>) {
        let target = if self.strafing {
            self.strafing_targets(ctx.battlefield).first().copied()
        } else {
            self.target
        };
        let verdict = match (self.weapon, target) {
            (Some(_), Some(target)) => Some(ctx.oracle.legality(&ShotRequest {
                target,
                ..self.shot_template()
            })),
            _ => None,
        };
        self.last_feasible = verdict
            .as_ref()
            .is_some_and(|v| v.is_feasible(ctx.rules.max_feasible_roll));
        if let Some(verdict) = &verdict {
            tracing::trace!(firer = %self.firer.id, to_hit = %verdict.describe(), "To-hit refreshed");
        }
        self.last_to_hit = verdict;
    }
}
