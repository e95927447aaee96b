//! Bomb payload allocation.
//!
//! A bomber spends bombs from two pools. External hardpoints are limited
//! only by what is loaded. The internal bay is additionally capped per fire
//! phase across every attack the unit makes, which is tracked by
//! [`PhaseOrdnance`].
//!
//! Allocation is a request/response exchange: the session asks for the
//! [`BombAllowance`] of a class, the player picks a payload, and the pick
//! is clamped to the allowance before it is attached to a declaration.

use serde::{Deserialize, Serialize};

use crate::combatant::{BombLoadout, Combatant, LoadoutClass};
use crate::queue::AttackQueue;
use crate::rules::FireRules;

/// Phase-wide internal bay usage for one unit.
///
/// `resolved` covers attacks already resolved earlier in the phase and is
/// owned by the enclosing game. `pending` covers declarations still in the
/// live session. Only the session's own appends and undos move `pending`,
/// so usage can never drop below `resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PhaseOrdnance {
    /// Internal bombs consumed by resolved attacks this phase.
    pub resolved: u32,
    /// Internal bombs spent by declarations in the live session.
    pub pending: u32,
}

impl PhaseOrdnance {
    /// Start a session with `resolved` bombs already used this phase.
    #[must_use]
    pub const fn new(resolved: u32) -> Self {
        Self {
            resolved,
            pending: 0,
        }
    }

    /// Total internal bombs used this phase.
    #[must_use]
    pub const fn used(&self) -> u32 {
        self.resolved.saturating_add(self.pending)
    }

    /// Bombs left under `cap`.
    #[must_use]
    pub const fn remaining(&self, cap: u32) -> u32 {
        cap.saturating_sub(self.used())
    }

    /// Record `count` bombs spent by a new declaration.
    pub fn spend(&mut self, count: u32) {
        self.pending = self.pending.saturating_add(count);
    }

    /// Give back `count` bombs from an undone declaration.
    pub fn release(&mut self, count: u32) {
        self.pending = self.pending.saturating_sub(count);
    }

    /// Fold pending usage into resolved usage once the queue is committed.
    pub fn settle(&mut self) {
        self.resolved = self.used();
        self.pending = 0;
    }
}

/// What may still be assigned from one loadout class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BombAllowance {
    /// Class the allowance is for.
    pub class: LoadoutClass,
    /// Per-kind upper bound.
    pub per_kind: BombLoadout,
    /// Upper bound on the total across kinds.
    pub cap: u32,
}

impl BombAllowance {
    /// Clamp a requested payload to this allowance.
    ///
    /// Over-asking is never an error; the excess is trimmed, later bomb
    /// kinds first.
    #[must_use]
    pub fn clamp(&self, request: &BombLoadout) -> BombLoadout {
        let clamped = request.min_each(&self.per_kind).cap_total(self.cap);
        if clamped != *request {
            tracing::warn!(
                class = ?self.class,
                requested = request.total(),
                granted = clamped.total(),
                "Bomb payload clamped"
            );
        }
        clamped
    }
}

/// Bombs of `class` still available to `firer`.
///
/// Starts from the full loadout, subtracts everything already committed to
/// the firer's queued declarations, applies the phase cap for the internal
/// bay and then a positive `per_call_limit`. Returns `None` when nothing is
/// left, in which case the caller should not prompt for a payload.
#[must_use]
pub fn available_loadout(
    firer: &Combatant,
    queue: &AttackQueue,
    class: LoadoutClass,
    per_call_limit: Option<u32>,
    ledger: &PhaseOrdnance,
    rules: &FireRules,
) -> Option<BombAllowance> {
    let committed = queue
        .iter()
        .filter(|d| d.firer == firer.id)
        .fold(BombLoadout::EMPTY, |acc, d| acc.saturating_add(&d.bombs(class)));
    let remaining = firer.loadout(class).saturating_sub(&committed);

    let mut cap = remaining.total();
    if class == LoadoutClass::Internal {
        cap = cap.min(ledger.remaining(rules.internal_bombs_per_phase));
    }
    if let Some(limit) = per_call_limit.filter(|&l| l > 0) {
        cap = cap.min(limit);
    }

    if cap == 0 {
        tracing::debug!(firer = %firer.id, ?class, "No bombs available");
        return None;
    }
    Some(BombAllowance {
        class,
        per_kind: remaining.cap_each(cap),
        cap,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{BombKind, TeamId, UnitCapabilities, UnitId, WeaponId};
    use crate::declaration::{AttackDeclaration, BombPayload};
    use crate::hex::{Facing, HexCoord};
    use crate::target::{HexTargetKind, Target};

    fn bomber(internal: &[(BombKind, u32)], external: &[(BombKind, u32)]) -> Combatant {
        Combatant::new(UnitId(1), TeamId(1), HexCoord::new(0, 0), Facing::North)
            .with_capabilities(UnitCapabilities::AERIAL | UnitCapabilities::BOMBER)
            .with_bombs(
                BombLoadout::from_pairs(internal),
                BombLoadout::from_pairs(external),
            )
    }

    fn drop_on(firer: UnitId, class: LoadoutClass, bombs: &[(BombKind, u32)]) -> AttackDeclaration {
        AttackDeclaration::weapon(
            firer,
            WeaponId(1),
            Target::hex(HexCoord::new(1, 1), HexTargetKind::BombDrop),
        )
        .with_payload(BombPayload::single(class, BombLoadout::from_pairs(bombs)))
    }

    // ==========================================================================
    // Phase ledger
    // ==========================================================================

    #[test]
    fn test_ledger_release_never_below_resolved() {
        let mut ledger = PhaseOrdnance::new(3);
        ledger.spend(2);
        ledger.release(5);
        assert_eq!(ledger.used(), 3);
    }

    #[test]
    fn test_ledger_settle() {
        let mut ledger = PhaseOrdnance::new(1);
        ledger.spend(2);
        ledger.settle();
        assert_eq!(ledger, PhaseOrdnance::new(3));
    }

    // ==========================================================================
    // Allowance
    // ==========================================================================

    #[test]
    fn test_phase_cap_overrides_loadout() {
        let firer = bomber(&[(BombKind::HighExplosive, 6)], &[]);
        let queue = AttackQueue::new(firer.id);
        let ledger = PhaseOrdnance::new(4);

        let allowance = available_loadout(
            &firer,
            &queue,
            LoadoutClass::Internal,
            None,
            &ledger,
            &FireRules::default(),
        )
        .unwrap();
        assert_eq!(allowance.cap, 2);
        assert_eq!(allowance.per_kind.get(BombKind::HighExplosive), 2);
    }

    #[test]
    fn test_queued_payloads_are_not_double_counted() {
        let firer = bomber(&[], &[(BombKind::Cluster, 4), (BombKind::Inferno, 2)]);
        let mut queue = AttackQueue::new(firer.id);
        queue.push_back_unchecked(drop_on(
            firer.id,
            LoadoutClass::External,
            &[(BombKind::Cluster, 3)],
        ));

        let allowance = available_loadout(
            &firer,
            &queue,
            LoadoutClass::External,
            None,
            &PhaseOrdnance::default(),
            &FireRules::default(),
        )
        .unwrap();
        assert_eq!(allowance.per_kind.get(BombKind::Cluster), 1);
        assert_eq!(allowance.per_kind.get(BombKind::Inferno), 2);
        assert_eq!(allowance.cap, 3);
    }

    #[test]
    fn test_external_ignores_phase_cap() {
        let firer = bomber(&[], &[(BombKind::HighExplosive, 8)]);
        let queue = AttackQueue::new(firer.id);
        let allowance = available_loadout(
            &firer,
            &queue,
            LoadoutClass::External,
            None,
            &PhaseOrdnance::new(6),
            &FireRules::default(),
        )
        .unwrap();
        assert_eq!(allowance.cap, 8);
    }

    #[test]
    fn test_per_call_limit() {
        let firer = bomber(&[], &[(BombKind::HighExplosive, 5)]);
        let queue = AttackQueue::new(firer.id);
        let ledger = PhaseOrdnance::default();
        let rules = FireRules::default();

        let limited =
            available_loadout(&firer, &queue, LoadoutClass::External, Some(1), &ledger, &rules)
                .unwrap();
        assert_eq!(limited.cap, 1);

        let zero =
            available_loadout(&firer, &queue, LoadoutClass::External, Some(0), &ledger, &rules)
                .unwrap();
        assert_eq!(zero.cap, 5);
    }

    #[test]
    fn test_nothing_available() {
        let firer = bomber(&[(BombKind::HighExplosive, 2)], &[]);
        let queue = AttackQueue::new(firer.id);
        let rules = FireRules::default();
        assert!(available_loadout(
            &firer,
            &queue,
            LoadoutClass::Internal,
            None,
            &PhaseOrdnance::new(6),
            &rules
        )
        .is_none());
        assert!(available_loadout(
            &firer,
            &queue,
            LoadoutClass::External,
            None,
            &PhaseOrdnance::default(),
            &rules
        )
        .is_none());
    }

    #[test]
    fn test_clamp_trims_request() {
        let allowance = BombAllowance {
            class: LoadoutClass::Internal,
            per_kind: BombLoadout::from_pairs(&[(BombKind::HighExplosive, 2), (BombKind::Cluster, 2)]),
            cap: 2,
        };
        let request = BombLoadout::from_pairs(&[(BombKind::HighExplosive, 1), (BombKind::Cluster, 5)]);
        let granted = allowance.clamp(&request);
        assert_eq!(granted.get(BombKind::HighExplosive), 1);
        assert_eq!(granted.get(BombKind::Cluster), 1);
    }
}
