//! Replays of the bundled scenario files.

use std::io::Write;
use std::path::PathBuf;

use salvo_core::combatant::{BombKind, LoadoutClass, UnitId};
use salvo_core::target::Target;
use salvo_headless::{replay, verify, Response, Scenario, ScenarioError, TurnEvent, TurnRunner};
use salvo_test_utils::determinism::verify_packet_encoding;

fn scenario_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("scenarios")
        .join(name)
}

fn load(name: &str) -> Scenario {
    Scenario::load(scenario_path(name)).unwrap()
}

// =============================================================================
// Bundled scenarios
// =============================================================================

#[test]
fn test_strafing_run_meets_expectations() {
    let scenario = load("strafing_run.ron");
    let report = replay(&scenario).unwrap();
    assert_eq!(report.check(&scenario.expect), Vec::<String>::new());

    let packet = report.packet().unwrap();
    assert_eq!(packet.firer, UnitId(1));
    assert_eq!(
        packet.attacks.iter().filter(|d| d.strafing_first_shot).count(),
        2
    );
    assert!(packet
        .attacks
        .iter()
        .any(|d| d.target == Target::Unit(UnitId(21))));
    assert!(verify_packet_encoding(packet));
}

#[test]
fn test_strafing_query_reports_run() {
    let scenario = load("strafing_run.ron");
    let report = replay(&scenario).unwrap();
    let Some(Response::State(state)) = report.responses.get(5) else {
        panic!("expected a state response, got {:?}", report.responses.get(5));
    };
    assert!(state.strafing);
    assert_eq!(state.strafe_hexes.len(), 3);
    assert_eq!(state.queued, 0);
}

#[test]
fn test_bomb_run_meets_expectations() {
    let scenario = load("bomb_run.ron");
    let report = replay(&scenario).unwrap();
    assert_eq!(report.check(&scenario.expect), Vec::<String>::new());
    assert_eq!(
        report.responses[3],
        Response::ack("bomb_payload", Some("2 bombs granted".to_string()))
    );

    let packet = report.packet().unwrap();
    let internal: u32 = packet
        .attacks
        .iter()
        .map(|d| d.bombs(LoadoutClass::Internal).get(BombKind::HighExplosive))
        .sum();
    assert_eq!(internal, 2);
}

#[test]
fn test_bomb_run_query_lists_pending_payload() {
    let scenario = load("bomb_run.ron");
    let report = replay(&scenario).unwrap();
    let Some(Response::State(state)) = report.responses.get(2) else {
        panic!("expected a state response");
    };
    assert_eq!(state.pending, vec!["bomb_payload:Internal".to_string()]);
}

#[test]
fn test_bundled_scenarios_are_deterministic() {
    for name in ["strafing_run.ron", "bomb_run.ron"] {
        let report = verify(&load(name), 4).unwrap();
        assert!(report.is_deterministic(), "{name} diverged");
    }
}

// =============================================================================
// Loading from disk
// =============================================================================

#[test]
fn test_load_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"Scenario(
            name: "Cancelled",
            firer: 1,
            units: [CombatantData(id: 1, team: 1, position: (0, 0))],
            script: [cancel],
        )"#
    )
    .unwrap();

    let scenario = Scenario::load(file.path()).unwrap();
    let report = replay(&scenario).unwrap();
    assert!(report.packet().is_none());
    assert_eq!(report.responses.len(), 1);
}

#[test]
fn test_malformed_file_reports_parse_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, "Scenario(name: ").unwrap();
    assert!(matches!(
        Scenario::load(file.path()),
        Err(ScenarioError::ParseError(_))
    ));
}

#[test]
fn test_interactive_after_script() {
    let scenario = load("bomb_run.ron");
    let mut runner = TurnRunner::from_scenario(&scenario).unwrap();
    // Stop short of the scripted commit.
    runner.run_script(&scenario.script[..5]);

    let mut output = Vec::new();
    runner
        .run_interactive(std::io::Cursor::new("\"undo\"\n\"query\"\n"), &mut output)
        .unwrap();
    assert!(!runner.is_finished());

    let text = String::from_utf8(output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let state: Response = serde_json::from_str(lines[1]).unwrap();
    let Response::State(state) = state else {
        panic!("expected state, got {state:?}");
    };
    assert_eq!(state.queued, 0);
    assert_eq!(state.internal_bombs_used, 4);

    assert!(matches!(
        runner.apply(&TurnEvent::Commit),
        Response::Committed { .. }
    ));
}
