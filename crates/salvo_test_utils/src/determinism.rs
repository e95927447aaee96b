//! Determinism testing utilities.
//!
//! A committed fire turn must be reproducible: the server and every client
//! replaying the same UI events against the same board have to produce
//! byte-identical commit packets.
//!
//! # Testing Strategy
//!
//! Sources of non-determinism include:
//!
//! - **Floating-point math**: the strafing line test uses fixed-point
//!   lerp, never floats.
//!
//! - **HashMap iteration order**: the controller only uses ordered maps,
//!   and target cycling breaks distance ties on the target's total order.
//!
//! - **Thread scheduling**: sessions share nothing, so N turns played in
//!   parallel must all match.
//!
//! A turn is scripted as a slice of [`TurnStep`]s. Live sessions are
//! compared step by step through [`session_hash`]; committed turns through
//! the hash of the packet's bincode encoding, which is exactly what the
//! transport sends.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::thread;

use salvo_core::combatant::UnitId;
use salvo_core::error::Result;
use salvo_core::oracle::FireContext;
use salvo_core::ordnance::PhaseOrdnance;
use salvo_core::packet::CommitPacket;
use salvo_core::session::TurnSession;

use crate::fixtures::Arena;

/// One scripted UI event applied to a live session.
///
/// Steps swallow their own rejections; a refused event is part of the
/// script like any other.
pub type TurnStep = fn(&mut TurnSession, &FireContext<'_>);

/// Packet hashes from replaying one script several times.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptReplay {
    /// Packet hash from each replay.
    pub hashes: Vec<u64>,
    /// Scripted steps per replay.
    pub steps: usize,
}

impl ScriptReplay {
    /// Whether every replay committed the same packet.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert that every replay matched.
    ///
    /// # Panics
    ///
    /// Panics if the replays committed different packets.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            panic!(
                "Scripted turn is non-deterministic!\n\
                 Replays: {}\n\
                 Steps: {}\n\
                 Packet hashes: {:?}",
                self.hashes.len(),
                self.steps,
                self.hashes
            );
        }
    }
}

/// Result of turns played on separate threads.
#[derive(Debug, Clone)]
pub struct ParallelTurnResult {
    /// Packet hash from each thread.
    pub hashes: Vec<u64>,
    /// Number of threads.
    pub num_turns: usize,
}

impl ParallelTurnResult {
    /// Check if all threads produced identical packets.
    #[must_use]
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }

    /// Assert all threads matched.
    ///
    /// # Panics
    ///
    /// Panics if threads produced different packets.
    pub fn assert_deterministic(&self) {
        if !self.is_deterministic() {
            let mut unique: Vec<u64> = self.hashes.clone();
            unique.sort_unstable();
            unique.dedup();
            panic!(
                "Parallel turns diverged!\n\
                 Turns: {}\n\
                 Unique hashes: {}\n\
                 All hashes: {:?}",
                self.num_turns,
                unique.len(),
                self.hashes
            );
        }
    }
}

/// Start `firer`'s turn on the arena's board and apply `script`.
///
/// # Panics
///
/// Panics if `firer` is not on the board.
pub fn play_script(
    arena: &Arena,
    firer: UnitId,
    ledger: PhaseOrdnance,
    script: &[TurnStep],
) -> TurnSession {
    let ctx = arena.ctx();
    let mut session = match TurnSession::start(firer, ledger, &ctx) {
        Ok(session) => session,
        Err(e) => panic!("Cannot start a turn for {firer}: {e}"),
    };
    for step in script {
        step(&mut session, &ctx);
    }
    session
}

/// Replay `script` `runs` times, committing each turn, and hash the packets.
///
/// # Errors
///
/// Returns an error if a packet fails to encode.
pub fn verify_script_determinism(
    arena: &Arena,
    firer: UnitId,
    ledger: PhaseOrdnance,
    script: &[TurnStep],
    runs: usize,
) -> Result<ScriptReplay> {
    let hashes = (0..runs)
        .map(|_| {
            let session = play_script(arena, firer, ledger, script);
            packet_hash(&session.commit(&arena.ctx()))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(ScriptReplay {
        hashes,
        steps: script.len(),
    })
}

/// Replay `script` against two boards side by side and find the first step
/// after which the live sessions differ.
///
/// Useful for checking that boards built differently (unit insertion order,
/// catalog refreshes) lead to the same turn.
///
/// # Returns
///
/// `None` if the sessions agree throughout, `Some(0)` if they differ before
/// any step, `Some(i)` if they diverge after step `i`.
///
/// # Panics
///
/// Panics if `firer` is missing from either board.
pub fn find_first_divergence(
    left: &Arena,
    right: &Arena,
    firer: UnitId,
    ledger: PhaseOrdnance,
    script: &[TurnStep],
) -> Option<usize> {
    let mut a = play_script(left, firer, ledger, &[]);
    let mut b = play_script(right, firer, ledger, &[]);
    if session_hash(&a) != session_hash(&b) {
        return Some(0);
    }

    let (left_ctx, right_ctx) = (left.ctx(), right.ctx());
    for (i, step) in script.iter().enumerate() {
        step(&mut a, &left_ctx);
        step(&mut b, &right_ctx);
        if session_hash(&a) != session_hash(&b) {
            return Some(i + 1);
        }
    }
    None
}

/// Hash of what a live session would send or show: its selection, its
/// queued declarations and its bomb ledger.
#[must_use]
pub fn session_hash(session: &TurnSession) -> u64 {
    let mut hasher = DefaultHasher::new();
    session.selected_weapon().hash(&mut hasher);
    session.selected_target().hash(&mut hasher);
    for declaration in session.queue().iter() {
        declaration.hash(&mut hasher);
    }
    session.ledger().hash(&mut hasher);
    hasher.finish()
}

/// Play the same turn on `num_turns` scoped threads and collect packet
/// hashes.
///
/// # Panics
///
/// Re-raises a panic from any turn thread, and panics if a packet fails to
/// encode.
pub fn run_parallel_turns<F>(play: F, num_turns: usize) -> ParallelTurnResult
where
    F: Fn() -> CommitPacket + Sync,
{
    let play = &play;
    let hashes = thread::scope(|s| {
        let handles: Vec<_> = (0..num_turns)
            .map(|_| s.spawn(move || packet_hash(&play())))
            .collect();

        handles
            .into_iter()
            .map(|h| match h.join() {
                Ok(Ok(hash)) => hash,
                Ok(Err(e)) => panic!("Packet failed to encode: {e}"),
                Err(payload) => std::panic::resume_unwind(payload),
            })
            .collect()
    });

    ParallelTurnResult { hashes, num_turns }
}

/// Verify that a packet survives the transport encoding unchanged.
pub fn verify_packet_encoding(packet: &CommitPacket) -> bool {
    let Ok(bytes) = packet.encode() else {
        return false;
    };
    CommitPacket::decode(&bytes).is_ok_and(|decoded| decoded == *packet)
}

/// Hash of a packet's bincode encoding.
///
/// # Errors
///
/// Returns an error if the packet fails to encode.
pub fn packet_hash(packet: &CommitPacket) -> Result<u64> {
    let bytes = packet.encode()?;
    let mut hasher = DefaultHasher::new();
    bytes.hash(&mut hasher);
    Ok(hasher.finish())
}

#[cfg(test)]
mod tests {
    use super::*;
    use salvo_core::catalog::{CycleDirection, CycleFilter};
    use salvo_core::hex::{Facing, HexCoord};
    use salvo_core::target::Target;

    use crate::fixtures::{mech, target_dummy, MockBattlefield, CANNON, LASER};

    const FIRER: UnitId = UnitId(1);

    fn arena_with_flanker(flanker: HexCoord) -> Arena {
        Arena::new(
            MockBattlefield::new()
                .with_unit(mech(1, 1, HexCoord::new(4, 6), Facing::North))
                .with_unit(target_dummy(20, 2, HexCoord::new(4, 3)))
                .with_unit(target_dummy(21, 2, flanker)),
        )
    }

    fn cache_both(session: &mut TurnSession, ctx: &FireContext<'_>) {
        session.cache_targets(&[Target::Unit(UnitId(20)), Target::Unit(UnitId(21))], ctx);
    }

    fn laser(session: &mut TurnSession, ctx: &FireContext<'_>) {
        let _ = session.select_weapon(LASER, ctx);
    }

    fn cannon(session: &mut TurnSession, ctx: &FireContext<'_>) {
        let _ = session.select_weapon(CANNON, ctx);
    }

    fn nearest(session: &mut TurnSession, ctx: &FireContext<'_>) {
        session.cycle_target(CycleDirection::Forward, CycleFilter::default(), ctx);
    }

    fn fire(session: &mut TurnSession, ctx: &FireContext<'_>) {
        let _ = session.fire(ctx);
    }

    const SCRIPT: [TurnStep; 7] = [cache_both, laser, nearest, fire, cannon, nearest, fire];

    // =========================================================================
    // Scripted replays
    // =========================================================================

    #[test]
    fn test_script_replays_identically() {
        let arena = arena_with_flanker(HexCoord::new(4, 5));
        let replay =
            verify_script_determinism(&arena, FIRER, PhaseOrdnance::default(), &SCRIPT, 3).unwrap();
        assert_eq!(replay.hashes.len(), 3);
        assert_eq!(replay.steps, SCRIPT.len());
        replay.assert_deterministic();
    }

    #[test]
    fn test_play_script_walks_the_catalog() {
        let arena = arena_with_flanker(HexCoord::new(4, 5));
        let session = play_script(&arena, FIRER, PhaseOrdnance::default(), &SCRIPT);
        let targets: Vec<_> = session.queue().iter().map(|d| d.target).collect();
        assert_eq!(
            targets,
            vec![Target::Unit(UnitId(21)), Target::Unit(UnitId(20))]
        );
    }

    // =========================================================================
    // Divergence
    // =========================================================================

    #[test]
    fn test_identical_boards_never_diverge() {
        let left = arena_with_flanker(HexCoord::new(4, 5));
        let right = arena_with_flanker(HexCoord::new(4, 5));
        assert_eq!(
            find_first_divergence(&left, &right, FIRER, PhaseOrdnance::default(), &SCRIPT),
            None
        );
    }

    #[test]
    fn test_divergence_found_at_target_pick() {
        // The flanker sits next to the firer on one board and far away on
        // the other, so the nearest target differs.
        let left = arena_with_flanker(HexCoord::new(4, 5));
        let right = arena_with_flanker(HexCoord::new(4, 12));
        assert_eq!(
            find_first_divergence(&left, &right, FIRER, PhaseOrdnance::default(), &SCRIPT),
            Some(3)
        );
    }

    #[test]
    fn test_ledger_changes_session_hash() {
        let arena = arena_with_flanker(HexCoord::new(4, 5));
        let mut spent = PhaseOrdnance::default();
        spent.spend(1);
        let a = play_script(&arena, FIRER, PhaseOrdnance::default(), &[]);
        let b = play_script(&arena, FIRER, spent, &[]);
        assert_ne!(session_hash(&a), session_hash(&b));
    }

    // =========================================================================
    // Threads and encoding
    // =========================================================================

    #[test]
    fn test_parallel_turns_match() {
        let arena = arena_with_flanker(HexCoord::new(4, 5));
        let play = || {
            play_script(&arena, FIRER, PhaseOrdnance::default(), &SCRIPT).commit(&arena.ctx())
        };
        let result = run_parallel_turns(play, 4);
        assert_eq!(result.hashes.len(), 4);
        result.assert_deterministic();
    }

    #[test]
    fn test_packet_survives_encoding() {
        let arena = arena_with_flanker(HexCoord::new(4, 5));
        let packet =
            play_script(&arena, FIRER, PhaseOrdnance::default(), &SCRIPT).commit(&arena.ctx());
        assert_eq!(packet.attacks.len(), 2);
        assert!(verify_packet_encoding(&packet));
    }
}
