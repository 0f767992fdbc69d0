//! Ordered-collection engine for kanban boards.
//!
//! Dashboards order tables, tables order cards, cards order checklist items.
//! This crate keeps every one of those lists contiguous and zero-based,
//! moves and copies entries between owners, and persists touched aggregates
//! as one unit.

pub mod db;
pub mod logging;
pub mod model;
pub mod ordering;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::board::{
    BoardValidationError, Card, CardId, ChecklistItem, ChecklistItemId, Dashboard, DashboardId,
    Table, TableHeader, TableId, TagId,
};
pub use model::request::MoveRequest;
pub use ordering::collection::{
    CollectionState, ItemId, OwnerId, PositionError, Positioned, PositionedCollection,
    StructuralClone,
};
pub use ordering::mover::{copy_all, move_all, move_one, MoveError, MoveOutcome};
pub use ordering::sort::{Labeled, SortPolicy, UnknownSortPolicy};
pub use repo::board_repo::{
    Aggregate, AggregateLookup, PersistenceGateway, SqliteBoardStore, StoreError, StoreResult,
};
pub use service::board_service::{BoardResult, BoardService, BoardServiceError, OwnerSide};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
