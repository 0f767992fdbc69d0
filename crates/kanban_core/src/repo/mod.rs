//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the lookup and atomic-save contracts the service depends on.
//! - Isolate SQLite query details from use-case orchestration.
//!
//! # Invariants
//! - Lookups report unknown ids as `None`, not as transport errors.
//! - A multi-aggregate save commits every write or none.

pub mod board_repo;
