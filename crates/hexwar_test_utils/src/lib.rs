//! # Hexwar Test Utilities
//!
//! Shared testing utilities for all crates:
//! - Sample rule set and world/game fixtures
//! - Determinism harness over move batches
//! - Property-based testing strategies

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod determinism;
pub mod fixtures;

/// Re-export proptest for convenience.
pub use proptest;
