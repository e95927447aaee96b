//! In-crate stand-ins for the board and the oracle used by unit tests.

use std::collections::BTreeMap;

use crate::combatant::{BuildingId, Combatant, UnitId};
use crate::hex::HexCoord;
use crate::oracle::{Battlefield, ShotRequest, TargetingOracle, ToHit};
use crate::target::Target;

#[derive(Debug, Clone, Default)]
pub(crate) struct StubBoard {
    units: BTreeMap<UnitId, Combatant>,
    flight_paths: BTreeMap<UnitId, Vec<HexCoord>>,
    open_flight_path: bool,
    hidden: Vec<UnitId>,
    buildings: BTreeMap<HexCoord, BuildingId>,
    impacts: BTreeMap<UnitId, HexCoord>,
}

impl StubBoard {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Add or replace a unit.
    pub(crate) fn with_unit(mut self, unit: Combatant) -> Self {
        self.units.insert(unit.id, unit);
        self
    }

    /// Every hex counts as overflown.
    pub(crate) fn with_open_flight_path(mut self) -> Self {
        self.open_flight_path = true;
        self
    }

    pub(crate) fn with_flight_path(mut self, unit: UnitId, hexes: &[HexCoord]) -> Self {
        self.flight_paths.insert(unit, hexes.to_vec());
        self
    }

    /// Block line of sight to a unit.
    pub(crate) fn with_hidden(mut self, unit: UnitId) -> Self {
        self.hidden.push(unit);
        self
    }

    pub(crate) fn with_building(mut self, hex: HexCoord, id: BuildingId) -> Self {
        self.buildings.insert(hex, id);
        self
    }

    pub(crate) fn with_impact(mut self, target: UnitId, hex: HexCoord) -> Self {
        self.impacts.insert(target, hex);
        self
    }
}

impl Battlefield for StubBoard {
    fn combatant(&self, id: UnitId) -> Option<&Combatant> {
        self.units.get(&id)
    }

    fn has_line_of_sight(&self, _firer: UnitId, target: &Target) -> bool {
        target.unit().map_or(true, |id| !self.hidden.contains(&id))
    }

    fn passed_through(&self, firer: UnitId, hex: HexCoord) -> bool {
        self.open_flight_path
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

#[derive(Debug, Clone)]
pub(crate) struct StubOracle {
    default: ToHit,
    by_target: BTreeMap<Target, ToHit>,
}

impl StubOracle {
    pub(crate) fn new(default: ToHit) -> Self {
        Self {
            default,
            by_target: BTreeMap::new(),
        }
    }

    pub(crate) fn with_target(mut self, target: Target, verdict: ToHit) -> Self {
        self.by_target.insert(target, verdict);
        self
    }
}

impl TargetingOracle for StubOracle {
    fn legality(&self, request: &ShotRequest) -> ToHit {
        self.by_target
            .get(&request.target)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}
