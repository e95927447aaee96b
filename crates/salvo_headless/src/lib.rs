//! Headless fire-turn runner for scripted scenarios and CI verification.
//!
//! A scenario file describes a board and a fire turn; the runner replays
//! UI events against a [`TurnSession`](salvo_core::session::TurnSession)
//! and reports the commit packet. This enables:
//!
//! - **Regression testing**: scripted turns with expected outcomes
//! - **CI verification**: replaying a turn must produce identical packets
//! - **Manual inspection**: drive a turn by hand over JSON lines
//!
//! # Protocol
//!
//! Communication uses JSON lines (one JSON object per line):
//!
//! - **stdin**: UI events (`{"select_weapon":{"weapon":1}}`, `"fire"`, ...)
//! - **stdout**: Responses and the commit packet (JSON)
//! - **stderr**: Logs (human-readable)
//!
//! See the [`protocol`] module for the full event/response specification.
//!
//! # Example
//!
//! ```bash
//! # Replay a scenario's script
//! cargo run -p salvo_headless -- run --scenario scenarios/strafing_run.ron
//!
//! # Drive the turn from stdin
//! echo '"fire"' | cargo run -p salvo_headless -- run --scenario scenarios/bomb_run.ron --interactive
//!
//! # Verify determinism
//! cargo run -p salvo_headless -- verify --scenario scenarios/bomb_run.ron --runs 5
//! ```

pub mod protocol;
pub mod runner;
pub mod scenario;

pub use protocol::{Response, SessionState, TurnEvent};
pub use runner::{replay, verify, EventError, ScriptReport, TurnOutcome, TurnRunner, VerifyReport};
pub use scenario::{Expectation, Scenario, ScenarioError};
