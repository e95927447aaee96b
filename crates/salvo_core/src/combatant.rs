//! Combatants, weapon mounts, ammo bins and bomb loadouts.
//!
//! The enclosing game owns the authoritative unit state. The controller
//! works from a [`Combatant`] snapshot and branches only on capability
//! queries, never on concrete unit kinds. New unit kinds add capability
//! flags rather than new branches here.

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use strum::{EnumCount, EnumIter, IntoEnumIterator};

use crate::abilities::{AbilitySet, SpecialAbility};
use crate::hex::{Facing, HexCoord};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
        )]
        pub struct $name(pub u32);

        impl $name {
            /// Create a new ID.
            #[must_use]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

id_type!(
    /// Unique identifier for a combatant.
    UnitId,
    "unit"
);
id_type!(
    /// Identifier for a weapon mount, unique within its combatant.
    WeaponId,
    "weapon"
);
id_type!(
    /// Identifier for an ammo bin, unique within its carrier.
    AmmoId,
    "ammo"
);
id_type!(
    /// Unique identifier for a building.
    BuildingId,
    "building"
);
id_type!(
    /// Side a combatant fights for.
    TeamId,
    "team"
);

bitflags! {
    /// Capabilities the controller branches on.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct UnitCapabilities: u16 {
        /// Aerospace or VTOL class unit able to fly strafing runs.
        const AERIAL        = 1 << 0;
        /// Carries bomb loadouts.
        const BOMBER        = 1 << 1;
        /// Can make ground attacks while flying.
        const GROUND_ATTACK = 1 << 2;
        /// Can spot for indirect fire.
        const SPOTTER       = 1 << 3;
        /// Currently flying above the board.
        const AIRBORNE      = 1 << 4;
    }
}

bitflags! {
    /// Weapon-kind flags for a mount.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct WeaponFlags: u16 {
        /// Off-board or indirect artillery. Never reordered by arc.
        const ARTILLERY         = 1 << 0;
        /// Capital-scale weapon.
        const CAPITAL           = 1 << 1;
        /// Fires automatically; never declared by hand.
        const AUTO_TARGET       = 1 << 2;
        /// Vehicular grenade launcher, always fires into the adjacent hex.
        const VGL               = 1 << 3;
        /// Drops ordnance from the internal bomb bay.
        const INTERNAL_BOMB_BAY = 1 << 4;
        /// Drops ordnance from external hardpoints.
        const BOMB_DROP         = 1 << 5;
        /// Space bombing delivery, limited per attack.
        const SPACE_BOMB        = 1 << 6;
        /// Point-defense system.
        const POINT_DEFENSE     = 1 << 7;
    }
}

bitflags! {
    /// Munition types loaded in an ammo bin.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct MunitionSet: u16 {
        /// Standard rounds.
        const STANDARD   = 1 << 0;
        /// Armor-piercing rounds.
        const ARMOR_PIERCING = 1 << 1;
        /// Incendiary rounds.
        const INFERNO    = 1 << 2;
        /// Smoke rounds.
        const SMOKE      = 1 << 3;
        /// Flare rounds.
        const FLARE      = 1 << 4;
        /// Vibrabomb mines; need a trigger setting.
        const VIBRABOMB  = 1 << 5;
        /// Homing rounds for artillery.
        const HOMING     = 1 << 6;
    }
}

/// Crew availability of a combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CrewState {
    /// Crew is able to act.
    #[default]
    Active,
    /// Unit is hidden; acting reveals it.
    Hidden,
    /// Crew is stunned or unconscious.
    Inactive,
}

/// One weapon instance on a combatant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponMount {
    /// Mount identifier.
    pub id: WeaponId,
    /// Display name.
    pub name: String,
    /// Weapon-kind flags.
    pub flags: WeaponFlags,
    /// Whether the weapon has fired this round.
    pub used_this_round: bool,
    /// Linked ammo bin, if the weapon uses ammo.
    pub linked_ammo: Option<AmmoId>,
    /// Available fire modes. Empty for single-mode weapons.
    pub modes: Vec<String>,
    /// Index of the current mode.
    pub mode: usize,
    /// Mode change requested this turn, applied at end of phase.
    pub pending_mode: Option<usize>,
    /// Whether the weapon can make aimed shots.
    pub can_aim: bool,
    /// Mount facing relative to the unit, in hex sides clockwise.
    pub mount_facing: i32,
}

impl WeaponMount {
    /// Create a single-mode weapon mount with no flags.
    #[must_use]
    pub fn new(id: WeaponId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            flags: WeaponFlags::empty(),
            used_this_round: false,
            linked_ammo: None,
            modes: Vec::new(),
            mode: 0,
            pending_mode: None,
            can_aim: false,
            mount_facing: 0,
        }
    }

    /// Builder method to set weapon flags.
    #[must_use]
    pub fn with_flags(mut self, flags: WeaponFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Builder method to link an ammo bin.
    #[must_use]
    pub fn with_ammo(mut self, ammo: AmmoId) -> Self {
        self.linked_ammo = Some(ammo);
        self
    }

    /// Builder method to set fire modes.
    #[must_use]
    pub fn with_modes(mut self, modes: Vec<String>) -> Self {
        self.modes = modes;
        self
    }

    /// Builder method to allow aimed shots.
    #[must_use]
    pub fn with_aiming(mut self) -> Self {
        self.can_aim = true;
        self
    }

    /// Builder method to set the mount facing offset.
    #[must_use]
    pub fn with_mount_facing(mut self, steps: i32) -> Self {
        self.mount_facing = steps;
        self
    }

    /// Whether the weapon resolves as artillery.
    #[must_use]
    pub fn is_artillery(&self) -> bool {
        self.flags.contains(WeaponFlags::ARTILLERY)
    }

    /// Whether the player may declare this weapon by hand.
    #[must_use]
    pub fn is_manually_fireable(&self) -> bool {
        !self
            .flags
            .intersects(WeaponFlags::AUTO_TARGET | WeaponFlags::POINT_DEFENSE)
    }

    /// Bomb loadout classes this weapon draws ordnance from.
    #[must_use]
    pub fn bomb_classes(&self) -> Vec<LoadoutClass> {
        let mut classes = Vec::new();
        if self.flags.contains(WeaponFlags::INTERNAL_BOMB_BAY) {
            classes.push(LoadoutClass::Internal);
        }
        if self
            .flags
            .intersects(WeaponFlags::BOMB_DROP | WeaponFlags::SPACE_BOMB)
        {
            classes.push(LoadoutClass::External);
        }
        classes
    }
}

/// An ammo bin.
///
/// The owner may differ from the firing unit for carrier-linked ammo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AmmoBin {
    /// Bin identifier.
    pub id: AmmoId,
    /// Unit physically carrying the bin.
    pub owner: UnitId,
    /// Munitions loaded.
    pub munitions: MunitionSet,
    /// Shots left at the start of the turn.
    pub shots: u32,
}

impl AmmoBin {
    /// Create a new ammo bin.
    #[must_use]
    pub const fn new(id: AmmoId, owner: UnitId, munitions: MunitionSet, shots: u32) -> Self {
        Self {
            id,
            owner,
            munitions,
            shots,
        }
    }
}

/// Kinds of bomb a bomber can carry.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumCount,
    EnumIter,
    strum::Display,
)]
#[strum(serialize_all = "snake_case")]
pub enum BombKind {
    /// High-explosive.
    HighExplosive,
    /// Cluster.
    Cluster,
    /// Laser-guided.
    LaserGuided,
    /// Inferno.
    Inferno,
    /// Thunder (FASCAM).
    Thunder,
    /// Rocket pod.
    Rocket,
    /// TAG pod.
    Tag,
    /// Alamo nuclear missile.
    Alamo,
}

/// Which ordnance pool a bomb loadout belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LoadoutClass {
    /// Internal bomb bay, capped per phase.
    Internal,
    /// External hardpoints.
    External,
}

/// Count of bombs per [`BombKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BombLoadout(pub [u32; BombKind::COUNT]);

impl BombLoadout {
    /// Empty loadout.
    pub const EMPTY: Self = Self([0; BombKind::COUNT]);

    /// Build a loadout from `(kind, count)` pairs.
    #[must_use]
    pub fn from_pairs(pairs: &[(BombKind, u32)]) -> Self {
        let mut loadout = Self::EMPTY;
        for &(kind, count) in pairs {
            loadout.0[kind as usize] += count;
        }
        loadout
    }

    /// Count of one kind.
    #[must_use]
    pub const fn get(&self, kind: BombKind) -> u32 {
        self.0[kind as usize]
    }

    /// Set the count of one kind.
    pub fn set(&mut self, kind: BombKind, count: u32) {
        self.0[kind as usize] = count;
    }

    /// Total bombs across kinds.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    /// Whether the loadout holds no bombs.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Component-wise subtraction, flooring at zero.
    #[must_use]
    pub fn saturating_sub(&self, other: &Self) -> Self {
        let mut out = *self;
        for (slot, spent) in out.0.iter_mut().zip(other.0.iter()) {
            *slot = slot.saturating_sub(*spent);
        }
        out
    }

    /// Component-wise sum.
    #[must_use]
    pub fn saturating_add(&self, other: &Self) -> Self {
        let mut out = *self;
        for (slot, extra) in out.0.iter_mut().zip(other.0.iter()) {
            *slot = slot.saturating_add(*extra);
        }
        out
    }

    /// Component-wise minimum.
    #[must_use]
    pub fn min_each(&self, other: &Self) -> Self {
        let mut out = *self;
        for (slot, limit) in out.0.iter_mut().zip(other.0.iter()) {
            *slot = (*slot).min(*limit);
        }
        out
    }

    /// Cap every kind at `cap`.
    #[must_use]
    pub fn cap_each(&self, cap: u32) -> Self {
        let mut out = *self;
        for slot in &mut out.0 {
            *slot = (*slot).min(cap);
        }
        out
    }

    /// Trim the loadout so its total does not exceed `cap`.
    ///
    /// Kinds are kept in declaration order; later kinds are trimmed first.
    #[must_use]
    pub fn cap_total(&self, cap: u32) -> Self {
        let mut out = Self::EMPTY;
        let mut left = cap;
        for (i, &count) in self.0.iter().enumerate() {
            let take = count.min(left);
            out.0[i] = take;
            left -= take;
        }
        out
    }

    /// Iterate the non-zero `(kind, count)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (BombKind, u32)> + '_ {
        BombKind::iter()
            .map(|kind| (kind, self.get(kind)))
            .filter(|&(_, count)| count > 0)
    }
}

/// Snapshot of a unit taking part in the fire phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Combatant {
    /// Unit identifier.
    pub id: UnitId,
    /// Side the unit fights for.
    pub team: TeamId,
    /// Board position.
    pub position: HexCoord,
    /// Hull facing.
    pub facing: Facing,
    /// Torso or turret facing, differs from `facing` after a twist.
    pub secondary_facing: Facing,
    /// Capability flags.
    pub capabilities: UnitCapabilities,
    /// Crew availability.
    pub crew: CrewState,
    /// Weapon mounts in the unit's weapon order.
    pub weapons: Vec<WeaponMount>,
    /// Ammo bins, including bins on linked carriers.
    pub ammo: Vec<AmmoBin>,
    /// Internal bomb bay loadout.
    pub internal_bombs: BombLoadout,
    /// External hardpoint loadout.
    pub external_bombs: BombLoadout,
    /// Special abilities the unit has.
    pub abilities: AbilitySet,
    /// Abilities already engaged from earlier turns.
    pub active_abilities: AbilitySet,
}

impl Combatant {
    /// Create a ground combatant with no weapons.
    #[must_use]
    pub fn new(id: UnitId, team: TeamId, position: HexCoord, facing: Facing) -> Self {
        Self {
            id,
            team,
            position,
            facing,
            secondary_facing: facing,
            capabilities: UnitCapabilities::empty(),
            crew: CrewState::Active,
            weapons: Vec::new(),
            ammo: Vec::new(),
            internal_bombs: BombLoadout::EMPTY,
            external_bombs: BombLoadout::EMPTY,
            abilities: AbilitySet::empty(),
            active_abilities: AbilitySet::empty(),
        }
    }

    /// Builder method to set capabilities.
    #[must_use]
    pub fn with_capabilities(mut self, capabilities: UnitCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Builder method to add a weapon mount.
    #[must_use]
    pub fn with_weapon(mut self, weapon: WeaponMount) -> Self {
        self.weapons.push(weapon);
        self
    }

    /// Builder method to add an ammo bin.
    #[must_use]
    pub fn with_ammo(mut self, bin: AmmoBin) -> Self {
        self.ammo.push(bin);
        self
    }

    /// Builder method to set bomb loadouts.
    #[must_use]
    pub fn with_bombs(mut self, internal: BombLoadout, external: BombLoadout) -> Self {
        self.internal_bombs = internal;
        self.external_bombs = external;
        self
    }

    /// Builder method to grant special abilities.
    #[must_use]
    pub fn with_abilities(mut self, abilities: AbilitySet) -> Self {
        self.abilities = abilities;
        self
    }

    /// Builder method to set the secondary facing.
    #[must_use]
    pub fn with_secondary_facing(mut self, facing: Facing) -> Self {
        self.secondary_facing = facing;
        self
    }

    /// Whether the unit can fly strafing runs.
    #[must_use]
    pub fn supports_strafing(&self) -> bool {
        self.capabilities.contains(UnitCapabilities::AERIAL)
    }

    /// Whether the unit carries bomb loadouts.
    #[must_use]
    pub fn is_bomber(&self) -> bool {
        self.capabilities.contains(UnitCapabilities::BOMBER)
    }

    /// Whether the unit is flying above the board.
    #[must_use]
    pub fn is_airborne(&self) -> bool {
        self.capabilities.contains(UnitCapabilities::AIRBORNE)
    }

    /// Whether the unit can spot this turn.
    #[must_use]
    pub fn can_spot(&self) -> bool {
        self.capabilities.contains(UnitCapabilities::SPOTTER) && self.crew == CrewState::Active
    }

    /// Facing that weapon arcs are measured from.
    #[must_use]
    pub const fn weapon_arc_facing(&self) -> Facing {
        self.secondary_facing
    }

    /// Whether the unit has a special ability.
    #[must_use]
    pub fn supports_ability(&self, ability: SpecialAbility) -> bool {
        self.abilities.contains(ability.flag())
    }

    /// Look up a weapon mount.
    #[must_use]
    pub fn weapon(&self, id: WeaponId) -> Option<&WeaponMount> {
        self.weapons.iter().find(|w| w.id == id)
    }

    /// Look up a weapon mount mutably.
    pub fn weapon_mut(&mut self, id: WeaponId) -> Option<&mut WeaponMount> {
        self.weapons.iter_mut().find(|w| w.id == id)
    }

    /// Look up an ammo bin.
    #[must_use]
    pub fn ammo_bin(&self, id: AmmoId) -> Option<&AmmoBin> {
        self.ammo.iter().find(|a| a.id == id)
    }

    /// Full loadout of one bomb class.
    #[must_use]
    pub const fn loadout(&self, class: LoadoutClass) -> &BombLoadout {
        match class {
            LoadoutClass::Internal => &self.internal_bombs,
            LoadoutClass::External => &self.external_bombs,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loadout_sub_floors_at_zero() {
        let full = BombLoadout::from_pairs(&[(BombKind::HighExplosive, 3), (BombKind::Cluster, 1)]);
        let spent =
            BombLoadout::from_pairs(&[(BombKind::HighExplosive, 1), (BombKind::Cluster, 4)]);
        let left = full.saturating_sub(&spent);
        assert_eq!(left.get(BombKind::HighExplosive), 2);
        assert_eq!(left.get(BombKind::Cluster), 0);
    }

    #[test]
    fn test_loadout_cap_total_trims_later_kinds() {
        let loadout =
            BombLoadout::from_pairs(&[(BombKind::HighExplosive, 2), (BombKind::Inferno, 3)]);
        let capped = loadout.cap_total(3);
        assert_eq!(capped.total(), 3);
        assert_eq!(capped.get(BombKind::HighExplosive), 2);
        assert_eq!(capped.get(BombKind::Inferno), 1);
    }

    #[test]
    fn test_loadout_iter_skips_zero() {
        let loadout = BombLoadout::from_pairs(&[(BombKind::Tag, 1)]);
        let pairs: Vec<_> = loadout.iter().collect();
        assert_eq!(pairs, vec![(BombKind::Tag, 1)]);
    }

    #[test]
    fn test_bomb_classes() {
        let bay = WeaponMount::new(WeaponId(1), "Bay").with_flags(WeaponFlags::INTERNAL_BOMB_BAY);
        assert_eq!(bay.bomb_classes(), vec![LoadoutClass::Internal]);

        let drop = WeaponMount::new(WeaponId(2), "Drop").with_flags(WeaponFlags::BOMB_DROP);
        assert_eq!(drop.bomb_classes(), vec![LoadoutClass::External]);

        let gun = WeaponMount::new(WeaponId(3), "Gun");
        assert!(gun.bomb_classes().is_empty());
    }

    #[test]
    fn test_manual_fire_excludes_point_defense() {
        let ams = WeaponMount::new(WeaponId(1), "AMS")
            .with_flags(WeaponFlags::POINT_DEFENSE | WeaponFlags::AUTO_TARGET);
        assert!(!ams.is_manually_fireable());
        assert!(WeaponMount::new(WeaponId(2), "Laser").is_manually_fireable());
    }

    #[test]
    fn test_capability_queries() {
        let unit = Combatant::new(UnitId(1), TeamId(1), HexCoord::new(0, 0), Facing::North)
            .with_capabilities(UnitCapabilities::AERIAL | UnitCapabilities::BOMBER);
        assert!(unit.supports_strafing());
        assert!(unit.is_bomber());
        assert!(!unit.is_airborne());
        assert!(!unit.can_spot());
    }

    #[test]
    fn test_arc_facing_follows_twist() {
        let unit = Combatant::new(UnitId(1), TeamId(1), HexCoord::new(0, 0), Facing::North)
            .with_secondary_facing(Facing::NorthEast);
        assert_eq!(unit.weapon_arc_facing(), Facing::NorthEast);
    }
}
