//! Tunable fire-phase rules.
//!
//! Defaults follow the standard game rules. Overrides come from RON so
//! optional rules can be switched without recompiling.
//!
//! # Example RON
//!
//! ```ron
//! FireRules(
//!     internal_bombs_per_phase: 4,
//! )
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{FireError, Result};

/// Tunable limits consulted by the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FireRules {
    /// Maximum hexes in one strafing run.
    pub max_strafe_hexes: usize,
    /// Internal-bay bombs a unit may drop per fire phase.
    pub internal_bombs_per_phase: u32,
    /// Highest roll the dice can produce; harder shots are not feasible.
    pub max_feasible_roll: i32,
    /// Bombs released per space-bombing attack.
    pub space_bomb_limit: u32,
}

impl FireRules {
    /// Hard upper bound on strafing run length.
    pub const MAX_STRAFE_HEXES: usize = 5;
    /// Default internal bay cap per phase.
    pub const DEFAULT_INTERNAL_BOMBS_PER_PHASE: u32 = 6;
    /// 2d6 maximum.
    pub const DEFAULT_MAX_FEASIBLE_ROLL: i32 = 12;
    /// Default per-attack space bomb release.
    pub const DEFAULT_SPACE_BOMB_LIMIT: u32 = 1;

    /// Create the standard rules.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_strafe_hexes: Self::MAX_STRAFE_HEXES,
            internal_bombs_per_phase: Self::DEFAULT_INTERNAL_BOMBS_PER_PHASE,
            max_feasible_roll: Self::DEFAULT_MAX_FEASIBLE_ROLL,
            space_bomb_limit: Self::DEFAULT_SPACE_BOMB_LIMIT,
        }
    }

    /// Parse rules from a RON string; missing fields keep their defaults.
    ///
    /// A strafing length above [`Self::MAX_STRAFE_HEXES`] is clamped since
    /// runs are stored inline.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        let mut rules: Self = ron::from_str(ron).map_err(|e| FireError::Rules(e.to_string()))?;
        if rules.max_strafe_hexes > Self::MAX_STRAFE_HEXES {
            tracing::warn!(
                requested = rules.max_strafe_hexes,
                max = Self::MAX_STRAFE_HEXES,
                "Strafing run length clamped"
            );
            rules.max_strafe_hexes = Self::MAX_STRAFE_HEXES;
        }
        Ok(rules)
    }
}

impl Default for FireRules {
    fn default() -> Self {
        Self::new()
    }
}
