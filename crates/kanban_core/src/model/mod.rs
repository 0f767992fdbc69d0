//! Board domain model.
//!
//! # Responsibility
//! - Define dashboards, tables, cards and checklist items.
//! - Validate identities and text once, at construction time.
//!
//! # Invariants
//! - Every domain object is identified by a stable, non-nil UUID.
//! - Positioned lists are always `PositionedCollection`s owned by their parent.

pub mod board;
pub mod request;
