//! Scenario loading and configuration.
//!
//! A scenario describes one fire turn: the board (units, flight paths,
//! buildings, line-of-sight blocks), a to-hit table standing in for the
//! real formula, the acting unit, and the UI events to replay against it.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use salvo_core::combatant::{BuildingId, Combatant, UnitId};
use salvo_core::data::CombatantData;
use salvo_core::error::FireError;
use salvo_core::hex::HexCoord;
use salvo_core::oracle::{Battlefield, ShotRequest, TargetingOracle, ToHit};
use salvo_core::rules::FireRules;
use salvo_core::target::Target;

use crate::protocol::TurnEvent;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// The controller refused the scenario's units or turn.
    #[error("Controller error: {0}")]
    Controller(#[from] FireError),
    /// Two units share an id.
    #[error("Duplicate unit id {0}")]
    DuplicateUnit(u32),
    /// The acting unit is not on the board.
    #[error("Firer {0} is not among the scenario units")]
    UnknownFirer(u32),
}

/// Hexes a unit flew over this turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightPath {
    pub unit: u32,
    pub hexes: Vec<(i32, i32)>,
}

/// A building placed on the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingPlacement {
    pub id: u32,
    pub hex: (i32, i32),
}

/// Where ground-to-air fire meets an airborne unit's path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactPoint {
    pub target: u32,
    pub hex: (i32, i32),
}

/// To-hit numbers used in place of the game's formula.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToHitTable {
    /// Roll needed against anything not listed.
    #[serde(default = "default_difficulty")]
    pub default: i32,
    /// Per-unit verdicts.
    #[serde(default)]
    pub units: Vec<(u32, ToHit)>,
}

fn default_difficulty() -> i32 {
    7
}

impl Default for ToHitTable {
    fn default() -> Self {
        Self {
            default: default_difficulty(),
            units: Vec::new(),
        }
    }
}

/// What a scripted turn should end with. Unset fields are not checked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expectation {
    /// Attacks in the commit packet.
    #[serde(default)]
    pub attacks: Option<usize>,
    /// Stale declarations dropped at commit.
    #[serde(default)]
    pub dropped: Option<usize>,
    /// Events refused while replaying the script.
    #[serde(default)]
    pub rejected: Option<usize>,
    /// Internal bombs used across the phase after the turn.
    #[serde(default)]
    pub internal_bombs_used: Option<u32>,
}

impl Expectation {
    /// Whether nothing is checked.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A complete scenario configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Rule overrides.
    #[serde(default)]
    pub rules: FireRules,
    /// Unit taking the fire turn.
    pub firer: u32,
    /// Internal bombs already dropped by earlier units this phase.
    #[serde(default)]
    pub internal_bombs_used: u32,
    /// Every unit on the board, the firer included.
    pub units: Vec<CombatantData>,
    /// Treat every hex as overflown.
    #[serde(default)]
    pub open_skies: bool,
    /// Recorded flight paths.
    #[serde(default)]
    pub flight_paths: Vec<FlightPath>,
    /// Units out of the firer's line of sight.
    #[serde(default)]
    pub hidden: Vec<u32>,
    /// Buildings.
    #[serde(default)]
    pub buildings: Vec<BuildingPlacement>,
    /// Ground-to-air impact hexes.
    #[serde(default)]
    pub impacts: Vec<ImpactPoint>,
    /// To-hit table.
    #[serde(default)]
    pub to_hit: ToHitTable,
    /// UI events replayed in order.
    #[serde(default)]
    pub script: Vec<TurnEvent>,
    /// Checks applied after the script has run.
    #[serde(default)]
    pub expect: Expectation,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Parse a scenario from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        Ok(ron::from_str(ron)?)
    }

    /// Build the board described by the scenario.
    pub fn board(&self) -> Result<ScenarioBoard, ScenarioError> {
        let mut units = BTreeMap::new();
        for data in &self.units {
            let unit = data.to_combatant()?;
            if units.insert(unit.id, unit).is_some() {
                return Err(ScenarioError::DuplicateUnit(data.id));
            }
        }
        if !units.contains_key(&UnitId(self.firer)) {
            return Err(ScenarioError::UnknownFirer(self.firer));
        }

        let mut flight_paths: BTreeMap<UnitId, BTreeSet<HexCoord>> = BTreeMap::new();
        for path in &self.flight_paths {
            flight_paths
                .entry(UnitId(path.unit))
                .or_default()
                .extend(path.hexes.iter().map(|&(col, row)| HexCoord::new(col, row)));
        }

        Ok(ScenarioBoard {
            units,
            flight_paths,
            open_skies: self.open_skies,
            hidden: self.hidden.iter().copied().map(UnitId).collect(),
            buildings: self
                .buildings
                .iter()
                .map(|b| (HexCoord::new(b.hex.0, b.hex.1), BuildingId(b.id)))
                .collect(),
            impacts: self
                .impacts
                .iter()
                .map(|i| (UnitId(i.target), HexCoord::new(i.hex.0, i.hex.1)))
                .collect(),
        })
    }

    /// Build the to-hit oracle described by the scenario.
    pub fn oracle(&self) -> ScenarioOracle {
        ScenarioOracle {
            default: ToHit::Difficulty(self.to_hit.default),
            units: self
                .to_hit
                .units
                .iter()
                .map(|(id, verdict)| (UnitId(*id), verdict.clone()))
                .collect(),
        }
    }
}

/// The scenario's board.
#[derive(Debug, Clone)]
pub struct ScenarioBoard {
    units: BTreeMap<UnitId, Combatant>,
    flight_paths: BTreeMap<UnitId, BTreeSet<HexCoord>>,
    open_skies: bool,
    hidden: BTreeSet<UnitId>,
    buildings: BTreeMap<HexCoord, BuildingId>,
    impacts: BTreeMap<UnitId, HexCoord>,
}

impl ScenarioBoard {
    /// Every unit other than `firer`, as targets.
    pub fn unit_targets(&self, firer: UnitId) -> Vec<Target> {
        self.units
            .keys()
            .filter(|&&id| id != firer)
            .map(|&id| Target::Unit(id))
            .collect()
    }

    /// Number of units on the board.
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }
}

impl Battlefield for ScenarioBoard {
    fn combatant(&self, id: UnitId) -> Option<&Combatant> {
        self.units.get(&id)
    }

    fn has_line_of_sight(&self, _firer: UnitId, target: &Target) -> bool {
        target.unit().map_or(true, |id| !self.hidden.contains(&id))
    }

    fn passed_through(&self, firer: UnitId, hex: HexCoord) -> bool {
        self.open_skies
            || self
                .flight_paths
                .get(&firer)
                .is_some_and(|path| path.contains(&hex))
    }

    fn building_at(&self, hex: HexCoord) -> Option<BuildingId> {
        self.buildings.get(&hex).copied()
    }

    fn ground_targets_at(&self, hex: HexCoord) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|u| u.position == hex && !u.is_airborne())
            .map(|u| u.id)
            .collect()
    }

    fn target_exists(&self, target: &Target) -> bool {
        match target {
            Target::Unit(id) => self.units.contains_key(id),
            Target::Hex { .. } => true,
            Target::Building { id, coords } => self.buildings.get(coords) == Some(id),
        }
    }

    fn impact_hex(&self, _firer: UnitId, target: UnitId) -> Option<HexCoord> {
        self.impacts.get(&target).copied()
    }
}

/// To-hit oracle backed by the scenario's table.
#[derive(Debug, Clone)]
pub struct ScenarioOracle {
    default: ToHit,
    units: BTreeMap<UnitId, ToHit>,
}

impl TargetingOracle for ScenarioOracle {
    fn legality(&self, request: &ShotRequest) -> ToHit {
        request
            .target
            .unit()
            .and_then(|id| self.units.get(&id))
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
