//! Ordered-collection position engine.
//!
//! # Responsibility
//! - Keep every positioned list (cards in a table, tables in a dashboard,
//!   checklist items in a card) contiguous and zero-based.
//! - Move and copy entries across owners without exposing partial state.
//!
//! # Invariants
//! - The engine is synchronous and works on already-loaded aggregates only.
//! - Lookup and persistence stay outside this module.

pub mod collection;
pub mod mover;
pub mod sort;
