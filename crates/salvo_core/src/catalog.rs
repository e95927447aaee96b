//! Range-sorted target cycling.
//!
//! The catalog snapshots the candidate targets visible to the acting unit,
//! sorted by hex distance with the target itself as a stable tie-break, and
//! walks that list cyclically in either direction. Filters are applied while
//! walking, never while sorting, so the order the player sees does not jump
//! around when filters change.

use serde::{Deserialize, Serialize};

use crate::combatant::Combatant;
use crate::hex::HexCoord;
use crate::oracle::Battlefield;
use crate::target::Target;

/// Direction to cycle in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CycleDirection {
    /// Next farther target, wrapping to the nearest.
    Forward,
    /// Next nearer target, wrapping to the farthest.
    Backward,
}

/// Which candidates cycling may stop on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct CycleFilter {
    /// Skip targets the oracle rules out.
    pub only_legal: bool,
    /// Skip targets that are not hostile to the firer.
    pub ignore_allies: bool,
}

/// A candidate target offered to the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// The target.
    pub target: Target,
    /// Where the target is.
    pub position: HexCoord,
    /// Whether it is hostile to the firer.
    pub hostile: bool,
}

/// A sorted catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// The target.
    pub target: Target,
    /// Hex distance from the firer when cached.
    pub distance: u32,
    /// Whether it was hostile when cached.
    pub hostile: bool,
}

/// Cached, range-sorted candidate targets with a cycling cursor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetCatalog {
    entries: Vec<CatalogEntry>,
    cursor: Option<usize>,
}

impl TargetCatalog {
    /// Create an empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot with `candidates` sorted by distance from `origin`.
    ///
    /// Ties are broken by target order. Resets the cursor.
    pub fn cache(&mut self, origin: HexCoord, candidates: impl IntoIterator<Item = Candidate>) {
        self.entries = candidates
            .into_iter()
            .map(|c| CatalogEntry {
                target: c.target,
                distance: origin.distance(c.position),
                hostile: c.hostile,
            })
            .collect();
        self.entries
            .sort_by(|a, b| a.distance.cmp(&b.distance).then(a.target.cmp(&b.target)));
        self.entries.dedup_by(|a, b| a.target == b.target);
        self.cursor = None;
        tracing::debug!(candidates = self.entries.len(), "Target catalog cached");
    }

    /// Cache `targets` as seen by `firer`, looking positions up on the board.
    ///
    /// Targets the board cannot place are left out.
    pub fn cache_for(
        &mut self,
        firer: &Combatant,
        targets: &[Target],
        battlefield: &dyn Battlefield,
    ) {
        let candidates = targets.iter().filter_map(|target| {
            let position = battlefield.target_position(target)?;
            Some(Candidate {
                target: *target,
                position,
                hostile: battlefield.is_hostile(firer.id, target),
            })
        });
        self.cache(firer.position, candidates);
    }

    /// Step the cursor and return the first target that passes `filter`.
    ///
    /// `is_legal` is consulted only when `filter.only_legal` is set. Visits
    /// at most one full lap; if nothing passes, returns `None` and leaves
    /// the cursor where it was.
    pub fn next<F>(
        &mut self,
        direction: CycleDirection,
        filter: CycleFilter,
        mut is_legal: F,
    ) -> Option<Target>
    where
        F: FnMut(&Target) -> bool,
    {
        let len = self.entries.len();
        if len == 0 {
            return None;
        }

        let mut index = self.cursor;
        for _ in 0..len {
            let i = match (index, direction) {
                (None, CycleDirection::Forward) => 0,
                (None, CycleDirection::Backward) => len - 1,
                (Some(i), CycleDirection::Forward) => (i + 1) % len,
                (Some(i), CycleDirection::Backward) => (i + len - 1) % len,
            };
            index = Some(i);

            let entry = &self.entries[i];
            if filter.ignore_allies && !entry.hostile {
                continue;
            }
            if filter.only_legal && !is_legal(&entry.target) {
                continue;
            }
            self.cursor = Some(i);
            return Some(entry.target);
        }
        None
    }

    /// Move the cursor onto `target` if it is cataloged.
    ///
    /// Used when the player picks a target directly so that cycling
    /// continues from it.
    pub fn point_at(&mut self, target: &Target) -> bool {
        match self.entries.iter().position(|e| e.target == *target) {
            Some(i) => {
                self.cursor = Some(i);
                true
            }
            None => false,
        }
    }

    /// Target under the cursor.
    #[must_use]
    pub fn current(&self) -> Option<Target> {
        self.cursor.map(|i| self.entries[i].target)
    }

    /// Clear the cursor without dropping the snapshot.
    pub fn reset_cursor(&mut self) {
        self.cursor = None;
    }

    /// Sorted entries.
    #[must_use]
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Number of cataloged targets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
