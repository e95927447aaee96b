//! Event-driven turn runner.
//!
//! [`TurnRunner`] owns the scenario's board, oracle and rules and drives a
//! [`TurnSession`] one [`TurnEvent`] at a time, answering each with a
//! [`Response`]. Scripts replay the same way whether they come from a
//! scenario file or from JSON lines on stdin.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::io::{self, BufRead, Write};

use serde::Serialize;
use thiserror::Error;

use salvo_core::catalog::{CycleDirection, CycleFilter};
use salvo_core::combatant::{BombLoadout, UnitId, WeaponId};
use salvo_core::error::FireError;
use salvo_core::hex::HexCoord;
use salvo_core::oracle::{Battlefield, FireContext};
use salvo_core::ordnance::PhaseOrdnance;
use salvo_core::packet::CommitPacket;
use salvo_core::rules::FireRules;
use salvo_core::session::TurnSession;
use salvo_core::target::{HexTargetKind, Target};

use crate::protocol::{Response, SessionState, TurnEvent};
use crate::scenario::{Expectation, Scenario, ScenarioBoard, ScenarioError, ScenarioOracle};

/// Why an event was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    /// The controller refused the call.
    #[error(transparent)]
    Fire(#[from] FireError),
    /// No building stands in the hex.
    #[error("No building at {0}")]
    NoBuilding(HexCoord),
    /// The turn was already committed or cancelled.
    #[error("Turn has already ended")]
    TurnEnded,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Committed with this packet.
    Committed(CommitPacket),
    /// Cancelled; the phase ledger as it stood before the turn.
    Cancelled(PhaseOrdnance),
}

impl TurnOutcome {
    /// The response announcing this outcome.
    pub fn to_response(&self) -> Response {
        match self {
            Self::Committed(packet) => Response::Committed {
                packet: packet.clone(),
            },
            Self::Cancelled(ordnance) => Response::Cancelled {
                ordnance: *ordnance,
            },
        }
    }
}

/// Runs one fire turn from UI events.
pub struct TurnRunner {
    board: ScenarioBoard,
    oracle: ScenarioOracle,
    rules: FireRules,
    session: Option<TurnSession>,
    outcome: Option<TurnOutcome>,
}

impl TurnRunner {
    /// Build the board and start the firer's turn.
    pub fn from_scenario(scenario: &Scenario) -> Result<Self, ScenarioError> {
        let board = scenario.board()?;
        let oracle = scenario.oracle();
        let rules = scenario.rules.clone();
        let session = TurnSession::start(
            UnitId(scenario.firer),
            PhaseOrdnance::new(scenario.internal_bombs_used),
            &FireContext::new(&board, &oracle, &rules),
        )?;
        tracing::info!(
            scenario = %scenario.name,
            firer = scenario.firer,
            units = board.unit_count(),
            "Turn started"
        );
        Ok(Self {
            board,
            oracle,
            rules,
            session: Some(session),
            outcome: None,
        })
    }

    /// Apply one event.
    pub fn apply(&mut self, event: &TurnEvent) -> Response {
        let name = event.name();
        let response = match event {
            TurnEvent::Query => match self.state() {
                Some(state) => Response::State(state),
                None => Response::rejected(name, EventError::TurnEnded),
            },
            TurnEvent::Commit => self.commit(),
            TurnEvent::Cancel => self.cancel(),
            _ => match self.step(event) {
                Ok(detail) => Response::ack(name, detail),
                Err(e) => Response::rejected(name, e),
            },
        };
        if let Response::Rejected { error, .. } = &response {
            tracing::warn!(event = name, %error, "Event rejected");
        } else {
            tracing::debug!(event = name, "Event applied");
        }
        response
    }

    /// Apply every event in order.
    pub fn run_script(&mut self, events: &[TurnEvent]) -> Vec<Response> {
        events.iter().map(|event| self.apply(event)).collect()
    }

    /// Read JSON-line events until end of input, writing one JSON-line
    /// response per event.
    pub fn run_interactive<R: BufRead, W: Write>(
        &mut self,
        input: R,
        mut output: W,
    ) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let response = match TurnEvent::from_json(line) {
                Ok(event) => self.apply(&event),
                Err(e) => Response::error(format!("Parse error: {e}")),
            };
            output.write_all(response.to_json_line().as_bytes())?;
            output.flush()?;
            if self.is_finished() {
                break;
            }
        }
        Ok(())
    }

    /// Current session state, or `None` once the turn has ended.
    pub fn state(&self) -> Option<SessionState> {
        let session = self.session.as_ref()?;
        let ctx = self.ctx();

        let mut pending: Vec<String> = session
            .needs_bomb_payload(&self.rules)
            .into_iter()
            .map(|class| format!("bomb_payload:{class:?}"))
            .collect();
        if session.needs_vibrabomb_setting() {
            pending.push("vibrabomb_setting".to_string());
        }

        Some(SessionState {
            firer: session.firer().id.0,
            phase: session.phase(),
            weapon: session.selected_weapon().map(|w| w.0),
            target: session.selected_target(),
            to_hit: session.to_hit_summary(),
            strafing: session.is_strafing(),
            strafe_hexes: session.strafing_run().hexes().to_vec(),
            queued: session.queue().len(),
            internal_bombs_used: session.ledger().used(),
            fire_enabled: session.is_fire_enabled(),
            spot_enabled: session.is_spot_enabled(&ctx),
            strafe_enabled: session.is_strafe_enabled(),
            pending,
        })
    }

    /// How the turn ended, if it has.
    pub fn outcome(&self) -> Option<&TurnOutcome> {
        self.outcome.as_ref()
    }

    /// Whether the turn has been committed or cancelled.
    pub fn is_finished(&self) -> bool {
        self.outcome.is_some()
    }

    /// End the turn, committing it unless an event already ended it.
    pub fn finish(mut self) -> TurnOutcome {
        match (self.session.take(), self.outcome.take()) {
            (_, Some(outcome)) => outcome,
            (Some(session), None) => TurnOutcome::Committed(session.commit(&self.ctx())),
            (None, None) => TurnOutcome::Cancelled(PhaseOrdnance::default()),
        }
    }

    fn ctx(&self) -> FireContext<'_> {
        FireContext::new(&self.board, &self.oracle, &self.rules)
    }

    fn commit(&mut self) -> Response {
        let Some(session) = self.session.take() else {
            return Response::rejected("commit", EventError::TurnEnded);
        };
        let packet = session.commit(&self.ctx());
        self.outcome = Some(TurnOutcome::Committed(packet.clone()));
        Response::Committed { packet }
    }

    fn cancel(&mut self) -> Response {
        let Some(session) = self.session.take() else {
            return Response::rejected("cancel", EventError::TurnEnded);
        };
        let ordnance = session.cancel();
        self.outcome = Some(TurnOutcome::Cancelled(ordnance));
        Response::Cancelled { ordnance }
    }

    fn step(&mut self, event: &TurnEvent) -> Result<Option<String>, EventError> {
        let ctx = FireContext::new(&self.board, &self.oracle, &self.rules);
        let board = &self.board;
        let session = self.session.as_mut().ok_or(EventError::TurnEnded)?;

        let detail = match event {
            TurnEvent::SelectWeapon { weapon } => {
                session.select_weapon(WeaponId(*weapon), &ctx)?;
                session.to_hit_summary()
            }
            TurnEvent::NextWeapon => session.next_weapon(&ctx).map(|w| w.to_string()),
            TurnEvent::SelectUnit { unit } => {
                session.select_target(Some(Target::Unit(UnitId(*unit))), &ctx);
                session.to_hit_summary()
            }
            TurnEvent::SelectHex { col, row, kind } => {
                let target = Target::hex(
                    HexCoord::new(*col, *row),
                    kind.unwrap_or(HexTargetKind::Clear),
                );
                session.select_target(Some(target), &ctx);
                session.to_hit_summary()
            }
            TurnEvent::SelectBuilding { col, row } => {
                let coords = HexCoord::new(*col, *row);
                let id = board
                    .building_at(coords)
                    .ok_or(EventError::NoBuilding(coords))?;
                session.select_target(Some(Target::Building { id, coords }), &ctx);
                session.to_hit_summary()
            }
            TurnEvent::ClearTarget => {
                session.select_target(None, &ctx);
                None
            }
            TurnEvent::CacheTargets => {
                session.cache_targets(&board.unit_targets(session.firer().id), &ctx);
                Some(format!("{} targets", session.catalog().len()))
            }
            TurnEvent::CycleTarget {
                backward,
                only_legal,
                ignore_allies,
            } => {
                let direction = if *backward {
                    CycleDirection::Backward
                } else {
                    CycleDirection::Forward
                };
                let filter = CycleFilter {
                    only_legal: *only_legal,
                    ignore_allies: *ignore_allies,
                };
                session
                    .cycle_target(direction, filter, &ctx)
                    .map(|target| target.to_string())
            }
            TurnEvent::Aim { location, mode } => {
                session.set_aiming(*location, *mode, &ctx)?;
                session.to_hit_summary()
            }
            TurnEvent::ToggleStrafing => {
                let on = session.toggle_strafing(&ctx)?;
                Some(if on { "strafing on" } else { "strafing off" }.to_string())
            }
            TurnEvent::StrafeHex { col, row } => {
                session.pick_strafe_hex(HexCoord::new(*col, *row), &ctx)?;
                Some(format!("{} hexes", session.strafing_run().len()))
            }
            TurnEvent::BombPayload { class, bombs } => {
                let granted = session.resolve_bomb_payload(
                    *class,
                    &BombLoadout::from_pairs(bombs),
                    ctx.rules,
                )?;
                Some(format!("{} bombs granted", granted.total()))
            }
            TurnEvent::VibrabombSetting { tons } => {
                session.resolve_vibrabomb_setting(*tons)?;
                None
            }
            TurnEvent::Activate { ability } => {
                session.activate_ability(*ability)?;
                None
            }
            TurnEvent::Spot => {
                session.spot(&ctx)?;
                None
            }
            TurnEvent::Fire => {
                let queued = session.fire(&ctx)?;
                Some(format!("{queued} queued"))
            }
            TurnEvent::Undo => {
                let undone = session.undo(&ctx);
                Some(format!("{} undone", undone.len()))
            }
            TurnEvent::Clear => {
                session.clear_attacks(&ctx);
                None
            }
            TurnEvent::FireMode { weapon, mode } => {
                session.set_fire_mode(WeaponId(*weapon), *mode)?;
                None
            }
            TurnEvent::CalledShot { weapon } => {
                let call = session.set_called_shot(WeaponId(*weapon))?;
                Some(call.to_string())
            }
            TurnEvent::WeaponOrder { weapons } => {
                session.reorder_weapons(weapons.iter().copied().map(WeaponId).collect())?;
                None
            }
            // answered by `apply`
            TurnEvent::Query | TurnEvent::Commit | TurnEvent::Cancel => None,
        };
        Ok(detail)
    }
}

// ============================================================================
// Scenario replay
// ============================================================================

/// Result of replaying a scenario script.
#[derive(Debug, Clone)]
pub struct ScriptReport {
    /// Response to every scripted event.
    pub responses: Vec<Response>,
    /// How the turn ended. A script that stops early is committed.
    pub outcome: TurnOutcome,
}

impl ScriptReport {
    /// Number of refused events.
    pub fn rejected(&self) -> usize {
        self.responses.iter().filter(|r| r.is_rejected()).count()
    }

    /// The commit packet, unless the turn was cancelled.
    pub fn packet(&self) -> Option<&CommitPacket> {
        match &self.outcome {
            TurnOutcome::Committed(packet) => Some(packet),
            TurnOutcome::Cancelled(_) => None,
        }
    }

    /// Compare against the scenario's expectations. Returns one message per
    /// mismatch.
    pub fn check(&self, expect: &Expectation) -> Vec<String> {
        let mut failures = Vec::new();
        let mut compare = |what: &str, expected: Option<usize>, actual: usize| {
            if let Some(expected) = expected.filter(|&e| e != actual) {
                failures.push(format!("{what}: expected {expected}, got {actual}"));
            }
        };
        let packet = self.packet();
        compare(
            "attacks",
            expect.attacks,
            packet.map_or(0, |p| p.attacks.len()),
        );
        compare(
            "dropped",
            expect.dropped,
            packet.map_or(0, |p| p.dropped.len()),
        );
        compare("rejected", expect.rejected, self.rejected());

        let used = match &self.outcome {
            TurnOutcome::Committed(packet) => packet.ordnance.used(),
            TurnOutcome::Cancelled(ordnance) => ordnance.used(),
        };
        if let Some(expected) = expect.internal_bombs_used.filter(|&e| e != used) {
            failures.push(format!(
                "internal_bombs_used: expected {expected}, got {used}"
            ));
        }
        failures
    }

    /// Hash of the bincode-encoded packet, or of the cancelled ledger.
    pub fn outcome_hash(&self) -> Result<u64, FireError> {
        let mut hasher = DefaultHasher::new();
        match &self.outcome {
            TurnOutcome::Committed(packet) => packet.encode()?.hash(&mut hasher),
            TurnOutcome::Cancelled(ordnance) => ordnance.hash(&mut hasher),
        }
        Ok(hasher.finish())
    }
}

/// Replay a scenario's script from a fresh board.
///
/// A script that does not end the turn is committed after its last event,
/// like a forced end of phase.
pub fn replay(scenario: &Scenario) -> Result<ScriptReport, ScenarioError> {
    let mut runner = TurnRunner::from_scenario(scenario)?;
    let responses = runner.run_script(&scenario.script);
    if !runner.is_finished() {
        tracing::debug!(scenario = %scenario.name, "Script left the turn open, committing");
    }
    Ok(ScriptReport {
        responses,
        outcome: runner.finish(),
    })
}

/// Result of a determinism check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerifyReport {
    /// Outcome hash of every replay.
    pub hashes: Vec<u64>,
}

impl VerifyReport {
    /// Whether every replay produced the same outcome.
    pub fn is_deterministic(&self) -> bool {
        self.hashes.windows(2).all(|w| w[0] == w[1])
    }
}

/// Replay a scenario `runs` times and collect outcome hashes.
pub fn verify(scenario: &Scenario, runs: usize) -> Result<VerifyReport, ScenarioError> {
    let mut hashes = Vec::with_capacity(runs);
    for _ in 0..runs {
        hashes.push(replay(scenario)?.outcome_hash()?);
    }
    Ok(VerifyReport { hashes })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIRMISH: &str = r#"
Scenario(
    name: "Skirmish",
    firer: 1,
    units: [
        CombatantData(
            id: 1,
            team: 1,
            position: (4, 6),
            capabilities: "SPOTTER",
            weapons: [
                WeaponData(id: 1, name: "Laser", can_aim: true),
                WeaponData(id: 2, name: "AC/10", ammo: Some(10)),
            ],
            ammo: [AmmoData(id: 10, munitions: "STANDARD", shots: 1)],
        ),
        CombatantData(id: 20, team: 2, position: (4, 3)),
        CombatantData(id: 21, team: 1, position: (5, 5)),
    ],
    buildings: [BuildingPlacement(id: 7, hex: (6, 6))],
)
"#;

    fn runner() -> TurnRunner {
        TurnRunner::from_scenario(&Scenario::from_ron_str(SKIRMISH).unwrap()).unwrap()
    }

    // =========================================================================
    // Event handling
    // =========================================================================

    #[test]
    fn test_fire_is_acknowledged() {
        let mut runner = runner();
        let responses = runner.run_script(&[
            TurnEvent::SelectWeapon { weapon: 1 },
            TurnEvent::SelectUnit { unit: 20 },
            TurnEvent::Fire,
        ]);
        assert_eq!(
            responses[2],
            Response::ack("fire", Some("1 queued".to_string()))
        );
        let state = runner.state().unwrap();
        assert_eq!(state.queued, 1);
        assert_eq!(state.weapon, Some(2));
    }

    #[test]
    fn test_fire_without_weapon_rejected() {
        let mut runner = runner();
        let response = runner.apply(&TurnEvent::Fire);
        assert_eq!(
            response,
            Response::rejected("fire", FireError::NoWeaponSelected)
        );
        assert_eq!(runner.state().unwrap().queued, 0);
    }

    #[test]
    fn test_select_missing_building_rejected() {
        let mut runner = runner();
        let response = runner.apply(&TurnEvent::SelectBuilding { col: 1, row: 1 });
        assert!(response.is_rejected());

        let response = runner.apply(&TurnEvent::SelectBuilding { col: 6, row: 6 });
        assert!(!response.is_rejected());
        assert!(matches!(
            runner.state().unwrap().target,
            Some(Target::Building { .. })
        ));
    }

    #[test]
    fn test_cycle_skips_allies() {
        let mut runner = runner();
        runner.apply(&TurnEvent::CacheTargets);
        let response = runner.apply(&TurnEvent::CycleTarget {
            backward: false,
            only_legal: false,
            ignore_allies: true,
        });
        assert_eq!(
            response,
            Response::ack("cycle_target", Some("unit#20".to_string()))
        );
    }

    #[test]
    fn test_state_reports_spotting() {
        let mut runner = runner();
        assert!(!runner.state().unwrap().spot_enabled);
        runner.apply(&TurnEvent::SelectUnit { unit: 20 });
        assert!(runner.state().unwrap().spot_enabled);
    }

    #[test]
    fn test_events_after_commit_rejected() {
        let mut runner = runner();
        assert!(matches!(
            runner.apply(&TurnEvent::Commit),
            Response::Committed { .. }
        ));
        assert!(runner.is_finished());
        assert!(runner.apply(&TurnEvent::Fire).is_rejected());
        assert!(runner.apply(&TurnEvent::Query).is_rejected());
        assert!(runner.apply(&TurnEvent::Cancel).is_rejected());
    }

    #[test]
    fn test_cancel_reports_ledger() {
        let mut runner = runner();
        assert_eq!(
            runner.apply(&TurnEvent::Cancel),
            Response::Cancelled {
                ordnance: PhaseOrdnance::new(0)
            }
        );
        assert!(matches!(
            runner.outcome(),
            Some(TurnOutcome::Cancelled(_))
        ));
    }

    // =========================================================================
    // Interactive mode
    // =========================================================================

    #[test]
    fn test_interactive_lines() {
        let input = concat!(
            r#"{"select_weapon":{"weapon":1}}"#,
            "\n\n",
            "not json\n",
            r#"{"select_unit":{"unit":20}}"#,
            "\n",
            r#""fire""#,
            "\n",
            r#""commit""#,
            "\n",
            r#""fire""#,
            "\n",
        );
        let mut output = Vec::new();
        runner()
            .run_interactive(io::Cursor::new(input), &mut output)
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        // Input stops being read once the turn is committed.
        assert_eq!(lines.len(), 5);
        assert!(lines[1].contains(r#""type":"error""#));
        assert!(lines[4].contains(r#""type":"committed""#));
    }

    // =========================================================================
    // Replay
    // =========================================================================

    #[test]
    fn test_replay_forces_commit() {
        let mut scenario = Scenario::from_ron_str(SKIRMISH).unwrap();
        scenario.script = vec![
            TurnEvent::SelectWeapon { weapon: 2 },
            TurnEvent::SelectUnit { unit: 20 },
            TurnEvent::Fire,
        ];
        let report = replay(&scenario).unwrap();
        assert_eq!(report.responses.len(), 3);
        assert_eq!(report.packet().map(|p| p.attacks.len()), Some(1));
        assert_eq!(report.rejected(), 0);
    }

    #[test]
    fn test_expectation_mismatch_reported() {
        let scenario = Scenario::from_ron_str(SKIRMISH).unwrap();
        let report = replay(&scenario).unwrap();
        let expect = Expectation {
            attacks: Some(2),
            rejected: Some(0),
            ..Expectation::default()
        };
        assert_eq!(report.check(&expect), vec!["attacks: expected 2, got 0"]);
    }

    #[test]
    fn test_verify_is_deterministic() {
        let mut scenario = Scenario::from_ron_str(SKIRMISH).unwrap();
        scenario.script = vec![
            TurnEvent::SelectWeapon { weapon: 1 },
            TurnEvent::SelectUnit { unit: 20 },
            TurnEvent::Fire,
            TurnEvent::SelectUnit { unit: 20 },
            TurnEvent::Fire,
        ];
        let report = verify(&scenario, 3).unwrap();
        assert_eq!(report.hashes.len(), 3);
        assert!(report.is_deterministic());
    }
}
