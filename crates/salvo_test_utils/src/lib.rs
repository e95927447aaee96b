//! # Salvo Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Board and oracle fixtures implementing the controller's collaborator traits
//! - Determinism harness for committed turns
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;
pub mod strategies;

/// Re-export proptest for convenience.
pub use proptest;
