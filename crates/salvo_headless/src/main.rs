//! Headless fire-turn runner.
//!
//! This binary replays scripted fire turns without a UI, printing every
//! response and the commit packet as JSON lines on stdout.
//!
//! # Usage
//!
//! ```bash
//! # Replay a scenario and check its expectations
//! cargo run -p salvo_headless -- run --scenario scenarios/strafing_run.ron
//!
//! # Replay the script, then keep reading events from stdin
//! cargo run -p salvo_headless -- run --scenario scenarios/bomb_run.ron --interactive
//!
//! # Check a scenario file without running it
//! cargo run -p salvo_headless -- validate --scenario scenarios/bomb_run.ron
//!
//! # Verify determinism by replaying several times
//! cargo run -p salvo_headless -- verify --scenario scenarios/bomb_run.ron --runs 5
//! ```
//!
//! Logs go to stderr; `RUST_LOG` overrides the level chosen by `--verbose`.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use salvo_headless::{
    replay, verify, Response, Scenario, ScenarioError, TurnEvent, TurnRunner,
};

#[derive(Parser)]
#[command(name = "salvo_headless")]
#[command(about = "Headless fire-turn runner for scripted scenarios and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario's script and print the responses
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// After the script, read further events from stdin
        #[arg(long)]
        interactive: bool,
    },

    /// Load a scenario and build its board without running it
    Validate {
        /// Scenario file to check
        #[arg(short, long)]
        scenario: PathBuf,
    },

    /// Verify determinism by replaying the same script several times
    Verify {
        /// Scenario to replay
        #[arg(short, long)]
        scenario: PathBuf,

        /// Number of replays
        #[arg(short, long, default_value = "5")]
        runs: usize,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for protocol)
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(filter)
        .init();

    let result = match cli.command {
        Commands::Run {
            scenario,
            interactive,
        } => cmd_run(&scenario, interactive),
        Commands::Validate { scenario } => cmd_validate(&scenario),
        Commands::Verify { scenario, runs } => cmd_verify(&scenario, runs),
    };

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn emit(out: &mut impl Write, response: &Response) -> io::Result<()> {
    out.write_all(response.to_json_line().as_bytes())
}

fn cmd_run(path: &Path, interactive: bool) -> Result<bool, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if interactive {
        let mut runner = TurnRunner::from_scenario(&scenario)?;
        for response in runner.run_script(&scenario.script) {
            emit(&mut out, &response)?;
        }
        if !runner.is_finished() {
            runner.run_interactive(io::stdin().lock(), &mut out)?;
        }
        if !runner.is_finished() {
            tracing::info!("Input ended with the turn open, committing");
            emit(&mut out, &runner.apply(&TurnEvent::Commit))?;
        }
        out.flush()?;
        return Ok(true);
    }

    let report = replay(&scenario)?;
    for response in &report.responses {
        emit(&mut out, response)?;
    }
    let ended = report
        .responses
        .iter()
        .any(|r| matches!(r, Response::Committed { .. } | Response::Cancelled { .. }));
    if !ended {
        emit(&mut out, &report.outcome.to_response())?;
    }
    out.flush()?;

    let failures = report.check(&scenario.expect);
    for failure in &failures {
        tracing::error!(scenario = %scenario.name, "{failure}");
    }
    if failures.is_empty() && !scenario.expect.is_empty() {
        tracing::info!(scenario = %scenario.name, "All expectations met");
    }
    Ok(failures.is_empty())
}

fn cmd_validate(path: &Path) -> Result<bool, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let board = scenario.board()?;
    tracing::info!(
        scenario = %scenario.name,
        units = board.unit_count(),
        events = scenario.script.len(),
        "Scenario is valid"
    );
    Ok(true)
}

fn cmd_verify(path: &Path, runs: usize) -> Result<bool, ScenarioError> {
    let scenario = Scenario::load(path)?;
    let report = verify(&scenario, runs)?;

    match serde_json::to_string(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::warn!("Failed to serialize report: {e}"),
    }

    if report.is_deterministic() {
        tracing::info!(scenario = %scenario.name, runs, "Replays are deterministic");
    } else {
        tracing::error!(
            scenario = %scenario.name,
            hashes = ?report.hashes,
            "Replays diverged"
        );
    }
    Ok(report.is_deterministic())
}
