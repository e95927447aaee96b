//! JSON protocol for the headless runner.
//!
//! Events use serde's external tagging so the same enum reads from a RON
//! scenario script (`select_weapon(weapon: 1)`) and from a JSON line
//! (`{"select_weapon":{"weapon":1}}`). Unit variants are bare names in
//! both (`fire`, `"fire"`).
//!
//! Ids and coordinates are plain numbers on the wire; the runner wraps
//! them in the controller's types.

use serde::{Deserialize, Serialize};

use salvo_core::abilities::SpecialAbility;
use salvo_core::combatant::{BombKind, LoadoutClass};
use salvo_core::declaration::AimingMode;
use salvo_core::hex::HexCoord;
use salvo_core::ordnance::PhaseOrdnance;
use salvo_core::packet::CommitPacket;
use salvo_core::session::SessionPhase;
use salvo_core::target::{HexTargetKind, Target};

// ============================================================================
// Events (scenario script / stdin)
// ============================================================================

/// A UI event applied to the running turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEvent {
    /// Select a weapon by mount id.
    SelectWeapon { weapon: u32 },

    /// Select the next unused weapon.
    NextWeapon,

    /// Target a unit.
    SelectUnit { unit: u32 },

    /// Target a hex. The kind defaults to clearing the hex.
    SelectHex {
        col: i32,
        row: i32,
        #[serde(default)]
        kind: Option<HexTargetKind>,
    },

    /// Target the building standing in a hex.
    SelectBuilding { col: i32, row: i32 },

    /// Drop the current target.
    ClearTarget,

    /// Refresh the target catalog from every other unit on the board.
    CacheTargets,

    /// Step through the catalog.
    CycleTarget {
        #[serde(default)]
        backward: bool,
        #[serde(default)]
        only_legal: bool,
        #[serde(default)]
        ignore_allies: bool,
    },

    /// Set the aimed location for the next shot. `None` clears it.
    Aim {
        #[serde(default)]
        location: Option<u8>,
        #[serde(default)]
        mode: AimingMode,
    },

    /// Enter or leave strafing mode.
    ToggleStrafing,

    /// Add a hex to the strafing run.
    StrafeHex { col: i32, row: i32 },

    /// Answer the bomb payload decision for the selected weapon.
    BombPayload {
        class: LoadoutClass,
        bombs: Vec<(BombKind, u32)>,
    },

    /// Answer the vibrabomb setting decision, in tons.
    VibrabombSetting { tons: u32 },

    /// Activate a special ability against the selected target.
    Activate { ability: SpecialAbility },

    /// Spot the selected unit.
    Spot,

    /// Fire the selected weapon.
    Fire,

    /// Undo the last declaration or strafing volley.
    Undo,

    /// Undo every declaration.
    Clear,

    /// Change a weapon's fire mode at end of phase.
    FireMode { weapon: u32, mode: usize },

    /// Cycle a weapon's called shot.
    CalledShot { weapon: u32 },

    /// Reorder the unit's weapons.
    WeaponOrder { weapons: Vec<u32> },

    /// Report the session state.
    Query,

    /// End the turn and emit the commit packet.
    Commit,

    /// Abandon the turn.
    Cancel,
}

impl TurnEvent {
    /// Parse from a JSON line.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Event name for acknowledgments and logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::SelectWeapon { .. } => "select_weapon",
            Self::NextWeapon => "next_weapon",
            Self::SelectUnit { .. } => "select_unit",
            Self::SelectHex { .. } => "select_hex",
            Self::SelectBuilding { .. } => "select_building",
            Self::ClearTarget => "clear_target",
            Self::CacheTargets => "cache_targets",
            Self::CycleTarget { .. } => "cycle_target",
            Self::Aim { .. } => "aim",
            Self::ToggleStrafing => "toggle_strafing",
            Self::StrafeHex { .. } => "strafe_hex",
            Self::BombPayload { .. } => "bomb_payload",
            Self::VibrabombSetting { .. } => "vibrabomb_setting",
            Self::Activate { .. } => "activate",
            Self::Spot => "spot",
            Self::Fire => "fire",
            Self::Undo => "undo",
            Self::Clear => "clear",
            Self::FireMode { .. } => "fire_mode",
            Self::CalledShot { .. } => "called_shot",
            Self::WeaponOrder { .. } => "weapon_order",
            Self::Query => "query",
            Self::Commit => "commit",
            Self::Cancel => "cancel",
        }
    }
}

// ============================================================================
// Responses (stdout)
// ============================================================================

/// Response to one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// The event was applied.
    Ack {
        event: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// The event was refused; the turn is unchanged.
    Rejected { event: String, error: String },

    /// A line that could not be parsed as an event.
    Error { message: String },

    /// Current session state.
    State(SessionState),

    /// The turn was committed.
    Committed { packet: CommitPacket },

    /// The turn was abandoned.
    Cancelled { ordnance: PhaseOrdnance },
}

/// Snapshot of a running turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub firer: u32,
    pub phase: SessionPhase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<Target>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_hit: Option<String>,
    pub strafing: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub strafe_hexes: Vec<HexCoord>,
    pub queued: usize,
    pub internal_bombs_used: u32,
    pub fire_enabled: bool,
    pub spot_enabled: bool,
    pub strafe_enabled: bool,
    /// Decisions the selected weapon is waiting on.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<String>,
}

impl Response {
    /// Create an acknowledgment.
    pub fn ack(event: &str, detail: Option<String>) -> Self {
        Self::Ack {
            event: event.to_string(),
            detail,
        }
    }

    /// Create a rejection.
    pub fn rejected(event: &str, error: impl ToString) -> Self {
        Self::Rejected {
            event: event.to_string(),
            error: error.to_string(),
        }
    }

    /// Create a parse error response.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Whether the event was refused.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected { .. })
    }

    /// Serialize to JSON line (with newline).
    pub fn to_json_line(&self) -> String {
        let mut json = serde_json::to_string(self).unwrap_or_else(|e| {
            format!(r#"{{"type":"error","message":"Serialization failed: {e}"}}"#)
        });
        json.push('\n');
        json
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_select_weapon() {
        let event = TurnEvent::from_json(r#"{"select_weapon":{"weapon":2}}"#).unwrap();
        assert_eq!(event, TurnEvent::SelectWeapon { weapon: 2 });
        assert_eq!(event.name(), "select_weapon");
    }

    #[test]
    fn test_parse_unit_event() {
        assert_eq!(TurnEvent::from_json(r#""fire""#).unwrap(), TurnEvent::Fire);
    }

    #[test]
    fn test_cycle_defaults() {
        let event = TurnEvent::from_json(r#"{"cycle_target":{}}"#).unwrap();
        assert_eq!(
            event,
            TurnEvent::CycleTarget {
                backward: false,
                only_legal: false,
                ignore_allies: false,
            }
        );
    }

    #[test]
    fn test_parse_bomb_payload() {
        let json = r#"{"bomb_payload":{"class":"Internal","bombs":[["HighExplosive",3]]}}"#;
        let event = TurnEvent::from_json(json).unwrap();
        assert_eq!(
            event,
            TurnEvent::BombPayload {
                class: LoadoutClass::Internal,
                bombs: vec![(BombKind::HighExplosive, 3)],
            }
        );
    }

    #[test]
    fn test_events_read_from_ron() {
        let script: Vec<TurnEvent> =
            ron::from_str("[select_hex(col: 3, row: 2, kind: Some(BombDrop)), fire, commit]")
                .unwrap();
        assert_eq!(
            script[0],
            TurnEvent::SelectHex {
                col: 3,
                row: 2,
                kind: Some(HexTargetKind::BombDrop),
            }
        );
        assert_eq!(script[1..], [TurnEvent::Fire, TurnEvent::Commit]);
    }

    #[test]
    fn test_serialize_rejection() {
        let json = Response::rejected("fire", "No weapon selected").to_json_line();
        assert!(json.ends_with('\n'));
        assert!(json.contains(r#""type":"rejected""#));
        assert!(json.contains(r#""error":"No weapon selected""#));
    }

    #[test]
    fn test_ack_omits_empty_detail() {
        let json = Response::ack("spot", None).to_json_line();
        assert!(!json.contains("detail"));
    }
}
