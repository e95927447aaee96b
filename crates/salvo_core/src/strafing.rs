//! Strafing run geometry.
//!
//! A strafing run is a short straight line of contiguous hexes that an
//! aerial unit attacks in one pass. Hexes are picked one at a time, and
//! every pick is checked against the rules below in order. The first
//! failing rule is reported.
//!
//! 1. The firer can fly strafing runs.
//! 2. Nothing has been queued yet this session.
//! 3. The firer's flight path passed through the hex.
//! 4. An empty run accepts any hex that got this far.
//! 5. The run is not full.
//! 6. The hex is not already in the run.
//! 7. The hex is adjacent to some hex already in the run.
//! 8. Every hex after the first lies on the line from the first hex to the
//!    new hex.

use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::combatant::Combatant;
use crate::hex::HexCoord;
use crate::oracle::Battlefield;
use crate::rules::FireRules;

/// Why a strafing hex was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error, Serialize, Deserialize)]
pub enum StrafeRejection {
    /// The firer cannot fly strafing runs.
    #[error("unit cannot strafe")]
    NotAerial,
    /// Attacks are already queued; the run is frozen.
    #[error("attacks already declared")]
    AttacksQueued,
    /// The flight path did not cross the hex.
    #[error("hex {0} is not on the flight path")]
    NotOnFlightPath(HexCoord),
    /// The run already has the maximum number of hexes.
    #[error("run is full")]
    RunFull,
    /// The hex is already part of the run.
    #[error("hex {0} already selected")]
    AlreadySelected(HexCoord),
    /// The hex does not touch the run.
    #[error("hex {0} is not adjacent to the run")]
    NotAdjacent(HexCoord),
    /// The hex would bend the run.
    #[error("hex {0} is not in line with the run")]
    NotCollinear(HexCoord),
}

/// Ordered, distinct hexes of a strafing run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrafingRun(ArrayVec<HexCoord, { FireRules::MAX_STRAFE_HEXES }>);

impl StrafingRun {
    /// Create an empty run.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Hexes in pick order.
    #[must_use]
    pub fn hexes(&self) -> &[HexCoord] {
        &self.0
    }

    /// The first hex picked.
    #[must_use]
    pub fn first(&self) -> Option<HexCoord> {
        self.0.first().copied()
    }

    /// Number of hexes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no hex has been picked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether `hex` is in the run.
    #[must_use]
    pub fn contains(&self, hex: HexCoord) -> bool {
        self.0.contains(&hex)
    }

    /// Drop every hex.
    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Validate and append `hex`.
    pub fn try_push(
        &mut self,
        hex: HexCoord,
        firer: &Combatant,
        queued: usize,
        battlefield: &dyn Battlefield,
        rules: &FireRules,
    ) -> Result<(), StrafeRejection> {
        check_append(self, hex, firer, queued, battlefield, rules)?;
        // check_append keeps len below MAX_STRAFE_HEXES
        self.0
            .try_push(hex)
            .map_err(|_| StrafeRejection::RunFull)?;
        tracing::debug!(firer = %firer.id, %hex, len = self.0.len(), "Strafing hex added");
        Ok(())
    }
}

/// Check whether `hex` may be appended to `run`.
///
/// `queued` is the number of declarations already in the session.
pub fn check_append(
    run: &StrafingRun,
    hex: HexCoord,
    firer: &Combatant,
    queued: usize,
    battlefield: &dyn Battlefield,
    rules: &FireRules,
) -> Result<(), StrafeRejection> {
    if !firer.supports_strafing() {
        return Err(StrafeRejection::NotAerial);
    }
    if queued > 0 {
        return Err(StrafeRejection::AttacksQueued);
    }
    if !battlefield.passed_through(firer.id, hex) {
        return Err(StrafeRejection::NotOnFlightPath(hex));
    }

    let Some(first) = run.first() else {
        return Ok(());
    };

    let max = rules.max_strafe_hexes.min(FireRules::MAX_STRAFE_HEXES);
    if run.len() >= max {
        return Err(StrafeRejection::RunFull);
    }
    if run.contains(hex) {
        return Err(StrafeRejection::AlreadySelected(hex));
    }
    if !run.hexes().iter().any(|h| h.is_adjacent(hex)) {
        return Err(StrafeRejection::NotAdjacent(hex));
    }

    if run.len() > 1 {
        let line = first.line_to(hex);
        if !run.hexes()[1..].iter().all(|h| line.contains(h)) {
            return Err(StrafeRejection::NotCollinear(hex));
        }
    }
    Ok(())
}

/// Whether `hex` may be appended to `run`.
#[must_use]
pub fn can_append(
    run: &StrafingRun,
    hex: HexCoord,
    firer: &Combatant,
    queued: usize,
    battlefield: &dyn Battlefield,
    rules: &FireRules,
) -> bool {
    check_append(run, hex, firer, queued, battlefield, rules).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combatant::{TeamId, UnitCapabilities, UnitId};
    use crate::hex::Facing;
    use crate::testing::StubBoard;

    fn fighter() -> Combatant {
        Combatant::new(UnitId(1), TeamId(1), HexCoord::new(0, 0), Facing::North)
            .with_capabilities(UnitCapabilities::AERIAL)
    }

    fn open_sky() -> StubBoard {
        StubBoard::new().with_open_flight_path()
    }

    fn run_of(hexes: &[(i32, i32)]) -> StrafingRun {
        let firer = fighter();
        let board = open_sky();
        let rules = FireRules::default();
        let mut run = StrafingRun::new();
        for &(c, r) in hexes {
            run.try_push(HexCoord::new(c, r), &firer, 0, &board, &rules)
                .unwrap();
        }
        run
    }

    fn check(run: &StrafingRun, col: i32, row: i32) -> Result<(), StrafeRejection> {
        check_append(
            run,
            HexCoord::new(col, row),
            &fighter(),
            0,
            &open_sky(),
            &FireRules::default(),
        )
    }

    #[test]
    fn test_first_hex_accepted() {
        assert_eq!(check(&StrafingRun::new(), 4, 4), Ok(()));
    }

    #[test]
    fn test_rejects_non_adjacent() {
        let run = run_of(&[(2, 2)]);
        assert_eq!(
            check(&run, 5, 5),
            Err(StrafeRejection::NotAdjacent(HexCoord::new(5, 5)))
        );
        assert_eq!(run.len(), 1);
    }

    #[test]
    fn test_straight_column_accepted() {
        let run = run_of(&[(2, 2), (2, 3), (2, 4)]);
        assert_eq!(check(&run, 2, 5), Ok(()));
    }

    #[test]
    fn test_bent_run_rejected() {
        // (3,1) touches the first hex but the run heads south.
        let run = run_of(&[(2, 2), (2, 3)]);
        assert_eq!(
            check(&run, 3, 1),
            Err(StrafeRejection::NotCollinear(HexCoord::new(3, 1)))
        );
    }

    #[test]
    fn test_two_hex_run_allows_any_neighbor() {
        // Collinearity only binds once two hexes are down.
        let run = run_of(&[(2, 2)]);
        assert_eq!(check(&run, 3, 2), Ok(()));
        assert_eq!(check(&run, 1, 2), Ok(()));
    }

    #[test]
    fn test_duplicate_rejected() {
        let run = run_of(&[(2, 2), (2, 3)]);
        assert_eq!(
            check(&run, 2, 3),
            Err(StrafeRejection::AlreadySelected(HexCoord::new(2, 3)))
        );
    }

    #[test]
    fn test_full_run_rejected() {
        let run = run_of(&[(0, 0), (0, 1), (0, 2), (0, 3), (0, 4)]);
        assert_eq!(check(&run, 0, 5), Err(StrafeRejection::RunFull));
    }

    #[test]
    fn test_rule_order() {
        let ground = Combatant::new(UnitId(1), TeamId(1), HexCoord::new(0, 0), Facing::North);
        let rules = FireRules::default();
        let board = open_sky();
        let run = StrafingRun::new();
        assert_eq!(
            check_append(&run, HexCoord::new(0, 0), &ground, 3, &board, &rules),
            Err(StrafeRejection::NotAerial)
        );
        assert_eq!(
            check_append(&run, HexCoord::new(0, 0), &fighter(), 3, &board, &rules),
            Err(StrafeRejection::AttacksQueued)
        );
    }

    #[test]
    fn test_off_flight_path_rejected() {
        let board = StubBoard::new().with_flight_path(UnitId(1), &[HexCoord::new(1, 1)]);
        let rules = FireRules::default();
        let run = StrafingRun::new();
        assert!(can_append(&run, HexCoord::new(1, 1), &fighter(), 0, &board, &rules));
        assert_eq!(
            check_append(&run, HexCoord::new(2, 2), &fighter(), 0, &board, &rules),
            Err(StrafeRejection::NotOnFlightPath(HexCoord::new(2, 2)))
        );
    }

    #[test]
    fn test_shorter_configured_run() {
        let rules = FireRules {
            max_strafe_hexes: 2,
            ..FireRules::default()
        };
        let run = run_of(&[(0, 0), (0, 1)]);
        assert_eq!(
            check_append(&run, HexCoord::new(0, 2), &fighter(), 0, &open_sky(), &rules),
            Err(StrafeRejection::RunFull)
        );
    }
}
