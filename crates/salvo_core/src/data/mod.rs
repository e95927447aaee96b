//! Data structures for combatant definitions.
//!
//! Scenario files and test fixtures describe units in RON. The types here
//! mirror [`Combatant`](crate::combatant::Combatant) in a form that is
//! pleasant to write by hand and convert into the controller's snapshot.
//!
//! **Note:** This module contains no IO - it only defines data types.
//! File loading is handled by `salvo_headless`.

mod combatant_data;

pub use combatant_data::{AmmoData, CombatantData, WeaponData};
