//! Combatant data structures for data-driven unit definitions.

use serde::{Deserialize, Serialize};

use crate::abilities::AbilitySet;
use crate::combatant::{
    AmmoBin, AmmoId, BombKind, BombLoadout, Combatant, CrewState, MunitionSet, TeamId,
    UnitCapabilities, UnitId, WeaponFlags, WeaponId, WeaponMount,
};
use crate::error::{FireError, Result};
use crate::hex::{Facing, HexCoord};

/// One weapon mount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponData {
    /// Mount identifier, unique within the unit.
    pub id: u32,

    /// Display name.
    pub name: String,

    /// Weapon-kind flags, e.g. `"ARTILLERY | CAPITAL"`.
    #[serde(default)]
    pub flags: WeaponFlags,

    /// Linked ammo bin id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ammo: Option<u32>,

    /// Fire mode names.
    #[serde(default)]
    pub modes: Vec<String>,

    /// Whether aimed shots are possible.
    #[serde(default)]
    pub can_aim: bool,

    /// Mount facing offset in hex sides clockwise from the hull.
    #[serde(default)]
    pub mount_facing: i32,
}

/// One ammo bin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoData {
    /// Bin identifier.
    pub id: u32,

    /// Carrier unit, when the bin rides on another unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carrier: Option<u32>,

    /// Munitions loaded, e.g. `"STANDARD"`.
    pub munitions: MunitionSet,

    /// Shots left.
    pub shots: u32,
}

/// Data-driven combatant definition.
///
/// # Example RON
///
/// ```ron
/// CombatantData(
///     id: 1,
///     team: 1,
///     position: (4, 6),
///     facing: North,
///     capabilities: "AERIAL | BOMBER",
///     weapons: [
///         WeaponData(id: 1, name: "Nose Laser", can_aim: true),
///         WeaponData(id: 2, name: "Bomb Bay", flags: "INTERNAL_BOMB_BAY"),
///     ],
///     internal_bombs: [(HighExplosive, 4)],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatantData {
    /// Unit identifier.
    pub id: u32,

    /// Team identifier.
    pub team: u32,

    /// Offset coordinates `(col, row)`.
    pub position: (i32, i32),

    /// Hull facing.
    #[serde(default)]
    pub facing: Facing,

    /// Torso or turret facing when twisted away from the hull.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secondary_facing: Option<Facing>,

    /// Capability flags.
    #[serde(default)]
    pub capabilities: UnitCapabilities,

    /// Crew availability.
    #[serde(default)]
    pub crew: CrewState,

    /// Weapon mounts in weapon order.
    #[serde(default)]
    pub weapons: Vec<WeaponData>,

    /// Ammo bins.
    #[serde(default)]
    pub ammo: Vec<AmmoData>,

    /// Internal bay loadout as `(kind, count)` pairs.
    #[serde(default)]
    pub internal_bombs: Vec<(BombKind, u32)>,

    /// External hardpoint loadout as `(kind, count)` pairs.
    #[serde(default)]
    pub external_bombs: Vec<(BombKind, u32)>,

    /// Special abilities.
    #[serde(default)]
    pub abilities: AbilitySet,

    /// Abilities already engaged from earlier turns.
    #[serde(default)]
    pub active_abilities: AbilitySet,
}

impl CombatantData {
    /// Parse a definition from RON.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::Data`] on malformed RON.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        ron::from_str(ron).map_err(|e| FireError::Data(e.to_string()))
    }

    /// Build the controller's snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`FireError::Data`] if ids repeat or a weapon links a bin
    /// that does not exist.
    pub fn to_combatant(&self) -> Result<Combatant> {
        let id = UnitId(self.id);
        let (col, row) = self.position;

        let mut unit = Combatant::new(id, TeamId(self.team), HexCoord::new(col, row), self.facing)
            .with_capabilities(self.capabilities)
            .with_bombs(
                BombLoadout::from_pairs(&self.internal_bombs),
                BombLoadout::from_pairs(&self.external_bombs),
            )
            .with_abilities(self.abilities);
        unit.crew = self.crew;
        unit.active_abilities = self.active_abilities;
        if let Some(facing) = self.secondary_facing {
            unit = unit.with_secondary_facing(facing);
        }

        for bin in &self.ammo {
            if unit.ammo_bin(AmmoId(bin.id)).is_some() {
                return Err(FireError::Data(format!("{id}: duplicate ammo bin {}", bin.id)));
            }
            let owner = bin.carrier.map_or(id, UnitId);
            unit = unit.with_ammo(AmmoBin::new(AmmoId(bin.id), owner, bin.munitions, bin.shots));
        }

        for weapon in &self.weapons {
            if unit.weapon(WeaponId(weapon.id)).is_some() {
                return Err(FireError::Data(format!("{id}: duplicate weapon {}", weapon.id)));
            }
            let mut mount = WeaponMount::new(WeaponId(weapon.id), weapon.name.clone())
                .with_flags(weapon.flags)
                .with_modes(weapon.modes.clone())
                .with_mount_facing(weapon.mount_facing);
            if weapon.can_aim {
                mount = mount.with_aiming();
            }
            if let Some(bin) = weapon.ammo {
                if unit.ammo_bin(AmmoId(bin)).is_none() {
                    return Err(FireError::Data(format!(
                        "{id}: weapon {} links missing ammo bin {bin}",
                        weapon.id
                    )));
                }
                mount = mount.with_ammo(AmmoId(bin));
            }
            unit = unit.with_weapon(mount);
        }
        Ok(unit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOMBER: &str = r#"
        CombatantData(
            id: 7,
            team: 2,
            position: (3, 4),
            facing: SouthEast,
            capabilities: "AERIAL | BOMBER",
            weapons: [
                WeaponData(id: 1, name: "Nose Laser", can_aim: true),
                WeaponData(id: 2, name: "Autocannon", ammo: Some(10)),
                WeaponData(id: 3, name: "Bomb Bay", flags: "INTERNAL_BOMB_BAY"),
            ],
            ammo: [
                AmmoData(id: 10, munitions: "STANDARD", shots: 8),
            ],
            internal_bombs: [(HighExplosive, 4), (Cluster, 2)],
        )
    "#;

    #[test]
    fn test_parse_and_convert() {
        let data = CombatantData::from_ron_str(BOMBER).unwrap();
        let unit = data.to_combatant().unwrap();

        assert_eq!(unit.id, UnitId(7));
        assert_eq!(unit.position, HexCoord::new(3, 4));
        assert_eq!(unit.secondary_facing, Facing::SouthEast);
        assert!(unit.supports_strafing());
        assert!(unit.is_bomber());
        assert_eq!(unit.weapons.len(), 3);
        assert!(unit.weapon(WeaponId(1)).unwrap().can_aim);
        assert_eq!(unit.ammo_bin(AmmoId(10)).unwrap().owner, UnitId(7));
        assert_eq!(unit.internal_bombs.total(), 6);
    }

    #[test]
    fn test_missing_ammo_bin() {
        let mut data = CombatantData::from_ron_str(BOMBER).unwrap();
        data.ammo.clear();
        assert!(matches!(data.to_combatant(), Err(FireError::Data(_))));
    }

    #[test]
    fn test_duplicate_weapon() {
        let mut data = CombatantData::from_ron_str(BOMBER).unwrap();
        let copy = data.weapons[0].clone();
        data.weapons.push(copy);
        assert!(matches!(data.to_combatant(), Err(FireError::Data(_))));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(
            CombatantData::from_ron_str("CombatantData(id: \"x\")"),
            Err(FireError::Data(_))
        ));
    }
}
