//! Proptest strategies.
//!
//! These strategies generate random but reproducible inputs for
//! property-based testing of the fire-turn controller.

use proptest::prelude::*;
use salvo_core::catalog::Candidate;
use salvo_core::combatant::{BombLoadout, UnitId};
use salvo_core::hex::{Facing, HexCoord};
use salvo_core::target::{HexTargetKind, Target};

/// Board size used by the hex strategies.
pub const BOARD_SIZE: i32 = 24;

/// Generate a hex on a [`BOARD_SIZE`] square board.
pub fn arb_hex() -> impl Strategy<Value = HexCoord> {
    (0..BOARD_SIZE, 0..BOARD_SIZE).prop_map(|(col, row)| HexCoord::new(col, row))
}

/// Generate a hex in the interior of the board, away from the edges.
pub fn arb_interior_hex() -> impl Strategy<Value = HexCoord> {
    (4..BOARD_SIZE - 4, 4..BOARD_SIZE - 4).prop_map(|(col, row)| HexCoord::new(col, row))
}

/// Generate a facing.
pub fn arb_facing() -> impl Strategy<Value = Facing> {
    (0..6i32).prop_map(Facing::from_index)
}

/// Generate a target of any kind.
pub fn arb_target() -> impl Strategy<Value = Target> {
    prop_oneof![
        (1u32..64).prop_map(|id| Target::Unit(UnitId(id))),
        arb_hex().prop_map(|hex| Target::hex(hex, HexTargetKind::Clear)),
    ]
}

/// Generate a catalog candidate with a unit target.
pub fn arb_candidate() -> impl Strategy<Value = Candidate> {
    (1u32..64, arb_hex(), any::<bool>()).prop_map(|(id, position, hostile)| Candidate {
        target: Target::Unit(UnitId(id)),
        position,
        hostile,
    })
}

/// Generate up to `max` candidates with distinct targets.
pub fn arb_candidates(max: usize) -> impl Strategy<Value = Vec<Candidate>> {
    proptest::collection::vec(arb_candidate(), 0..max).prop_map(|mut candidates| {
        candidates.sort_by_key(|c| c.target);
        candidates.dedup_by_key(|c| c.target);
        candidates
    })
}

/// Generate a walk of `len` hexes from `start`, one random step at a time.
///
/// Steps may turn or double back, so walks exercise every strafing rule.
pub fn arb_walk(len: usize) -> impl Strategy<Value = (HexCoord, Vec<HexCoord>)> {
    (arb_interior_hex(), proptest::collection::vec(arb_facing(), len)).prop_map(
        |(start, steps)| {
            let mut hex = start;
            let walk = steps
                .into_iter()
                .map(|facing| {
                    hex = hex.neighbor(facing);
                    hex
                })
                .collect();
            (start, walk)
        },
    )
}

/// Generate a bomb loadout with up to `max_each` of every kind.
pub fn arb_loadout(max_each: u32) -> impl Strategy<Value = BombLoadout> {
    proptest::collection::vec(0..=max_each, BombLoadout::EMPTY.0.len()).prop_map(|counts| {
        let mut loadout = BombLoadout::EMPTY;
        for (slot, count) in loadout.0.iter_mut().zip(counts) {
            *slot = count;
        }
        loadout
    })
}

/// A scripted queue operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOp {
    /// Fire the weapon at this index of the firer's weapon list.
    Fire(usize),
    /// Undo the last declaration.
    Undo,
    /// Clear the queue.
    Clear,
}

/// Generate a sequence of queue operations over `weapons` weapons.
pub fn arb_turn_ops(weapons: usize, max_len: usize) -> impl Strategy<Value = Vec<TurnOp>> {
    let op = prop_oneof![
        6 => (0..weapons.max(1)).prop_map(TurnOp::Fire),
        3 => Just(TurnOp::Undo),
        1 => Just(TurnOp::Clear),
    ];
    proptest::collection::vec(op, 0..max_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    proptest! {
        #[test]
        fn prop_walk_steps_are_adjacent((start, walk) in arb_walk(6)) {
            let mut prev = start;
            for hex in walk {
                prop_assert!(prev.is_adjacent(hex));
                prev = hex;
            }
        }

        #[test]
        fn prop_candidates_are_distinct(candidates in arb_candidates(16)) {
            for pair in candidates.windows(2) {
                prop_assert!(pair[0].target != pair[1].target);
            }
        }
    }
}
