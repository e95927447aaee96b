//! Test fixtures and helpers.
//!
//! An in-memory board, a table-driven to-hit oracle and a handful of
//! pre-built units for consistent testing.

use std::collections::{BTreeMap, BTreeSet};

use salvo_core::combatant::{
    AmmoBin, AmmoId, BombKind, BombLoadout, BuildingId, Combatant, MunitionSet, TeamId,
    UnitCapabilities, UnitId, WeaponFlags, WeaponId, WeaponMount,
};
use salvo_core::hex::{Facing, HexCoord};
use salvo_core::oracle::{Battlefield, FireContext, ShotRequest, TargetingOracle, ToHit};
use salvo_core::rules::FireRules;
use salvo_core::target::Target;

/// Laser on every pre-built unit.
pub const LASER: WeaponId = WeaponId(1);
/// Ammo-fed cannon on every pre-built unit.
pub const CANNON: WeaponId = WeaponId(2);
/// Rear-mounted weapon on [`mech`].
pub const REAR_LASER: WeaponId = WeaponId(3);
/// Internal bomb bay on [`bomber`].
pub const BOMB_BAY: WeaponId = WeaponId(5);
/// External hardpoint release on [`bomber`].
pub const HARDPOINTS: WeaponId = WeaponId(6);
/// Ammo bin feeding [`CANNON`].
pub const CANNON_BIN: AmmoId = AmmoId(10);

/// In-memory board.
///
/// Units are kept in a sorted map so every query is deterministic.
#[derive(Debug, Clone, Default)]
pub struct MockBattlefield {
    units: BTreeMap<UnitId, Combatant>,
    flight_paths: BTreeMap<UnitId, BTreeSet<HexCoord>>,
    open_skies: bool,
    blocked: BTreeSet<UnitId>,
    buildings: BTreeMap<HexCoord, BuildingId>,
    impacts: BTreeMap<UnitId, HexCoord>,
}

impl MockBattlefield {
    /// Create an empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a unit, replacing any unit with the same id.
    #[must_use]
    pub fn with_unit(mut self, unit: Combatant) -> Self {
        self.insert(unit);
        self
    }

    /// Treat every hex as overflown by every unit.
    #[must_use]
    pub fn with_open_skies(mut self) -> Self {
        self.open_skies = true;
        self
    }

    /// Record the hexes `unit` flew over this turn.
    #[must_use]
    pub fn with_flight_path(mut self, unit: UnitId, hexes: &[HexCoord]) -> Self {
        self.flight_paths
            .entry(unit)
            .or_default()
            .extend(hexes.iter().copied());
        self
    }

    /// Block line of sight to `unit`.
    #[must_use]
    pub fn with_blocked_sight(mut self, unit: UnitId) -> Self {
        self.blocked.insert(unit);
        self
    }

    /// Put a building on `hex`.
    #[must_use]
    pub fn with_building(mut self, hex: HexCoord, id: BuildingId) -> Self {
        self.buildings.insert(hex, id);
        self
    }

    /// Ground-to-air impact hex for shots at `target`.
    #[must_use]
    pub fn with_impact(mut self, target: UnitId, hex: HexCoord) -> Self {
        self.impacts.insert(target, hex);
        self
    }

    /// Place or replace a unit in place.
    pub fn insert(&mut self, unit: Combatant) {
        self.units.insert(unit.id, unit);
    }

    /// Remove a unit, e.g. to simulate it being destroyed mid-turn.
    pub fn remove(&mut self, id: UnitId) -> Option<Combatant> {
        self.units.remove(&id)
    }

    /// Mutable access to a unit.
    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Combatant> {
        self.units.get_mut(&id)
    }

    /// Every unit other than `firer`, as unit targets.
    #[must_use]
    pub fn unit_targets(&self, firer: UnitId) -> Vec<Target> {
        self.units
            .keys()
            .filter(|&&id| id != firer)
            .map(|&id| Target::Unit(id))
            .collect()
    }
}

impl Battlefield for MockBattlefield {
    fn combatant(&self, id: UnitId) -> Option<&Combatant> {
        self.units.get(&id)
    }

    fn has_line_of_sight(&self, _firer: UnitId, target: &Target) -> bool {
        target.unit().map_or(true, |id| !self.blocked.contains(&id))
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

/// To-hit oracle answering from a lookup table.
///
/// Targets without an entry get the default verdict.
#[derive(Debug, Clone)]
pub struct TableOracle {
    default: ToHit,
    table: BTreeMap<Target, ToHit>,
}

impl TableOracle {
    /// Every shot needs `difficulty` to hit unless overridden.
    #[must_use]
    pub fn new(difficulty: i32) -> Self {
        Self {
            default: ToHit::Difficulty(difficulty),
            table: BTreeMap::new(),
        }
    }

    /// Override the verdict for one target.
    #[must_use]
    pub fn with(mut self, target: Target, verdict: ToHit) -> Self {
        self.table.insert(target, verdict);
        self
    }
}

impl Default for TableOracle {
    fn default() -> Self {
        Self::new(7)
    }
}

impl TargetingOracle for TableOracle {
    fn legality(&self, request: &ShotRequest) -> ToHit {
        self.table
            .get(&request.target)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Board, oracle and rules owned together so tests can borrow a context.
#[derive(Debug, Clone, Default)]
pub struct Arena {
    /// The board.
    pub board: MockBattlefield,
    /// The oracle.
    pub oracle: TableOracle,
    /// Rules in force.
    pub rules: FireRules,
}

impl Arena {
    /// Bundle a board with the default oracle and rules.
    #[must_use]
    pub fn new(board: MockBattlefield) -> Self {
        Self {
            board,
            ..Self::default()
        }
    }

    /// Replace the oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: TableOracle) -> Self {
        self.oracle = oracle;
        self
    }

    /// Replace the rules.
    #[must_use]
    pub fn with_rules(mut self, rules: FireRules) -> Self {
        self.rules = rules;
        self
    }

    /// Borrow a fire context.
    #[must_use]
    pub fn ctx(&self) -> FireContext<'_> {
        FireContext::new(&self.board, &self.oracle, &self.rules)
    }
}

// =============================================================================
// Pre-built units
// =============================================================================

/// Ground unit with a forward laser, an ammo-fed cannon and a rear laser.
#[must_use]
pub fn mech(id: u32, team: u32, position: HexCoord, facing: Facing) -> Combatant {
    Combatant::new(UnitId(id), TeamId(team), position, facing)
        .with_capabilities(UnitCapabilities::SPOTTER)
        .with_weapon(
            WeaponMount::new(LASER, "Large Laser")
                .with_aiming()
                .with_modes(vec!["standard".into(), "pulse".into()]),
        )
        .with_weapon(WeaponMount::new(CANNON, "AC/10").with_ammo(CANNON_BIN))
        .with_weapon(WeaponMount::new(REAR_LASER, "Rear Laser").with_mount_facing(3))
        .with_ammo(AmmoBin::new(CANNON_BIN, UnitId(id), MunitionSet::STANDARD, 10))
}

/// Airborne strike fighter able to fly strafing runs.
#[must_use]
pub fn fighter(id: u32, team: u32, position: HexCoord, facing: Facing) -> Combatant {
    Combatant::new(UnitId(id), TeamId(team), position, facing)
        .with_capabilities(
            UnitCapabilities::AERIAL
                | UnitCapabilities::AIRBORNE
                | UnitCapabilities::GROUND_ATTACK,
        )
        .with_weapon(WeaponMount::new(LASER, "Nose Laser"))
        .with_weapon(WeaponMount::new(CANNON, "Wing Cannon").with_ammo(CANNON_BIN))
        .with_ammo(AmmoBin::new(CANNON_BIN, UnitId(id), MunitionSet::STANDARD, 10))
}

/// Airborne bomber with `internal` bombs in the bay and `external` on
/// hardpoints.
#[must_use]
pub fn bomber(
    id: u32,
    team: u32,
    position: HexCoord,
    internal: &[(BombKind, u32)],
    external: &[(BombKind, u32)],
) -> Combatant {
    Combatant::new(UnitId(id), TeamId(team), position, Facing::North)
        .with_capabilities(
            UnitCapabilities::AERIAL | UnitCapabilities::AIRBORNE | UnitCapabilities::BOMBER,
        )
        .with_weapon(WeaponMount::new(LASER, "Nose Laser"))
        .with_weapon(
            WeaponMount::new(BOMB_BAY, "Bomb Bay").with_flags(WeaponFlags::INTERNAL_BOMB_BAY),
        )
        .with_weapon(WeaponMount::new(HARDPOINTS, "Hardpoints").with_flags(WeaponFlags::BOMB_DROP))
        .with_bombs(
            BombLoadout::from_pairs(internal),
            BombLoadout::from_pairs(external),
        )
}

/// Unarmed ground target.
#[must_use]
pub fn target_dummy(id: u32, team: u32, position: HexCoord) -> Combatant {
    Combatant::new(UnitId(id), TeamId(team), position, Facing::South)
}
