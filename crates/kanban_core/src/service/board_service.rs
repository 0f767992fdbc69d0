//! Board use-case service.
//!
//! # Responsibility
//! - Resolve owner aggregates, run the ordering engine on their collections,
//!   and persist every touched aggregate with a single `save_all`.
//! - Map engine, validation and store failures onto one error type with
//!   stable machine-readable codes.
//!
//! # Invariants
//! - Every owner id is resolved before any collection is mutated, so an
//!   unknown destination never leaves the source half-edited.
//! - Failed use-cases never call `save_all`; successful ones call it once.
//! - Each mutating use-case loads, edits and saves inside one store
//!   transaction; a failure anywhere rolls the whole use-case back.
//! - Each use-case logs exactly one `module=service` event.

use crate::model::board::{
    BoardValidationError, Card, CardId, ChecklistItem, ChecklistItemId, Dashboard, DashboardId,
    Table, TableId,
};
use crate::model::request::MoveRequest;
use crate::ordering::collection::{
    ItemId, OwnerId, PositionError, Positioned, PositionedCollection,
};
use crate::ordering::mover::{self, MoveError, MoveOutcome};
use crate::ordering::sort::SortPolicy;
use crate::repo::board_repo::{Aggregate, AggregateLookup, PersistenceGateway, StoreError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Result type used by board service operations.
pub type BoardResult<T> = Result<T, BoardServiceError>;

/// Which owner of a use-case failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerSide {
    /// Owner the item leaves.
    Source,
    /// Owner the item enters.
    Destination,
    /// Only owner of a single-collection use-case.
    Target,
}

impl OwnerSide {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::Destination => "destination",
            Self::Target => "target",
        }
    }
}

impl Display for OwnerSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors from board service operations.
#[derive(Debug)]
pub enum BoardServiceError {
    /// Owner aggregate id does not resolve.
    UnknownOwner { side: OwnerSide, id: Uuid },
    /// Item is not in the collection it was claimed to belong to.
    NotAMember { owner: OwnerId, item: ItemId },
    /// Target position is outside the collection's valid range.
    InvalidPosition {
        owner: OwnerId,
        requested: usize,
        len: usize,
    },
    /// Identity is already present in the destination collection.
    DuplicateMember { owner: OwnerId, item: ItemId },
    /// Source and destination name the same owner.
    SameOwner(OwnerId),
    /// Input failed boundary validation.
    Validation(BoardValidationError),
    /// Atomic save or load did not complete.
    Persistence(StoreError),
}

impl BoardServiceError {
    /// Stable machine-readable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnknownOwner { .. } => "unknown_owner",
            Self::NotAMember { .. } => "not_a_member",
            Self::InvalidPosition { .. } => "invalid_position",
            Self::DuplicateMember { .. } => "duplicate_member",
            Self::SameOwner(_) => "same_owner",
            Self::Validation(_) => "validation_failed",
            Self::Persistence(_) => "persistence_failed",
        }
    }
}

impl Display for BoardServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownOwner { side, id } => write!(f, "{side} owner not found: {id}"),
            Self::NotAMember { owner, item } => {
                write!(f, "item {item} is not a member of {owner}")
            }
            Self::InvalidPosition {
                owner,
                requested,
                len,
            } => write!(
                f,
                "position {requested} is out of range for {owner} (valid: 0..{len})"
            ),
            Self::DuplicateMember { owner, item } => {
                write!(f, "item {item} is already a member of {owner}")
            }
            Self::SameOwner(owner) => {
                write!(f, "source and destination are the same owner: {owner}")
            }
            Self::Validation(err) => write!(f, "{err}"),
            Self::Persistence(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BoardServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Persistence(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PositionError> for BoardServiceError {
    fn from(value: PositionError) -> Self {
        match value {
            PositionError::NotAMember { owner, item } => Self::NotAMember { owner, item },
            PositionError::InvalidPosition {
                owner,
                requested,
                len,
            } => Self::InvalidPosition {
                owner,
                requested,
                len,
            },
            PositionError::DuplicateMember { owner, item } => {
                Self::DuplicateMember { owner, item }
            }
        }
    }
}

impl From<MoveError> for BoardServiceError {
    fn from(value: MoveError) -> Self {
        match value {
            MoveError::Position(err) => err.into(),
            MoveError::SameOwner(owner) => Self::SameOwner(owner),
        }
    }
}

impl From<BoardValidationError> for BoardServiceError {
    fn from(value: BoardValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StoreError> for BoardServiceError {
    fn from(value: StoreError) -> Self {
        Self::Persistence(value)
    }
}

/// Board service facade.
pub struct BoardService<S: AggregateLookup + PersistenceGateway> {
    store: S,
}

impl<S: AggregateLookup + PersistenceGateway> BoardService<S> {
    /// Creates service from a store implementation.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Creates an empty dashboard.
    pub fn create_dashboard(&self, title: &str) -> BoardResult<Dashboard> {
        self.atomic("board_create_dashboard", || {
            let dashboard = Dashboard::new(title)?;
            self.store.save_all(&[Aggregate::Dashboard(&dashboard)])?;
            Ok(dashboard)
        })
    }

    /// Creates a table and appends it to the end of its dashboard.
    pub fn create_table(&self, dashboard_id: DashboardId, title: &str) -> BoardResult<Table> {
        self.atomic("board_create_table", || {
            let mut dashboard = self.require_dashboard(dashboard_id, OwnerSide::Target)?;
            let table = Table::new(dashboard_id, title)?;
            dashboard.tables_mut().append(table.header())?;
            self.store.save_all(&[
                Aggregate::Dashboard(&dashboard),
                Aggregate::Table(&table),
            ])?;
            Ok(table)
        })
    }

    /// Creates a card at the end of a table.
    pub fn create_card(&self, table_id: TableId, title: &str) -> BoardResult<Card> {
        self.atomic("board_create_card", || {
            let mut table = self.require_table(table_id, OwnerSide::Target)?;
            let mut card = Card::new(title)?;
            let position = table.cards_mut().append(card.clone())?;
            card.set_position(position);
            self.store.save_all(&[Aggregate::Table(&table)])?;
            Ok(card)
        })
    }

    /// Adds a checklist item at the end of a card's checklist.
    pub fn add_checklist_item(&self, card_id: CardId, text: &str) -> BoardResult<ChecklistItem> {
        self.atomic("board_add_checklist_item", || {
            let mut card = self.require_card(card_id, OwnerSide::Target)?;
            let mut item = ChecklistItem::new(text)?;
            let position = card.checklist_mut().append(item.clone())?;
            item.set_position(position);
            self.store.save_all(&[Aggregate::Card(&card)])?;
            Ok(item)
        })
    }

    /// Removes a table from its dashboard; later tables close the gap.
    pub fn delete_table(&self, dashboard_id: DashboardId, table_id: TableId) -> BoardResult<()> {
        self.atomic("board_delete_table", || {
            let mut dashboard = self.require_dashboard(dashboard_id, OwnerSide::Target)?;
            dashboard.tables_mut().remove_and_reindex(table_id)?;
            self.store.save_all(&[Aggregate::Dashboard(&dashboard)])?;
            Ok(())
        })
    }

    /// Removes a card from its table; later cards close the gap.
    pub fn delete_card(&self, table_id: TableId, card_id: CardId) -> BoardResult<()> {
        self.atomic("board_delete_card", || {
            let mut table = self.require_table(table_id, OwnerSide::Target)?;
            table.cards_mut().remove_and_reindex(card_id)?;
            self.store.save_all(&[Aggregate::Table(&table)])?;
            Ok(())
        })
    }

    /// Removes a checklist item from its card; later items close the gap.
    pub fn delete_checklist_item(
        &self,
        card_id: CardId,
        item_id: ChecklistItemId,
    ) -> BoardResult<()> {
        self.atomic("board_delete_checklist_item", || {
            let mut card = self.require_card(card_id, OwnerSide::Target)?;
            card.checklist_mut().remove_and_reindex(item_id)?;
            self.store.save_all(&[Aggregate::Card(&card)])?;
            Ok(())
        })
    }

    /// Reorders a table inside its dashboard.
    pub fn move_table(
        &self,
        dashboard_id: DashboardId,
        table_id: TableId,
        position: usize,
    ) -> BoardResult<MoveOutcome> {
        self.atomic("board_move_table", || {
            let mut dashboard = self.require_dashboard(dashboard_id, OwnerSide::Target)?;
            let outcome = reorder(dashboard.tables_mut(), table_id, position)?;
            if outcome != MoveOutcome::Unchanged {
                self.store.save_all(&[Aggregate::Dashboard(&dashboard)])?;
            }
            Ok(outcome)
        })
    }

    /// Reorders a checklist item inside its card.
    pub fn move_checklist_item(
        &self,
        card_id: CardId,
        item_id: ChecklistItemId,
        position: usize,
    ) -> BoardResult<MoveOutcome> {
        self.atomic("board_move_checklist_item", || {
            let mut card = self.require_card(card_id, OwnerSide::Target)?;
            let outcome = reorder(card.checklist_mut(), item_id, position)?;
            if outcome != MoveOutcome::Unchanged {
                self.store.save_all(&[Aggregate::Card(&card)])?;
            }
            Ok(outcome)
        })
    }

    /// Moves a card within its table or into another table.
    ///
    /// Inside one table this is a plain reorder that keeps the card's
    /// identity. Across tables the destination receives a clone under a new
    /// identity and both tables are saved together.
    pub fn move_card(&self, request: &MoveRequest) -> BoardResult<MoveOutcome> {
        self.atomic("board_move_card", || {
            if request.is_within_owner() {
                let mut table = self.require_table(request.source(), OwnerSide::Source)?;
                let outcome = reorder(table.cards_mut(), request.item(), request.position())?;
                if outcome != MoveOutcome::Unchanged {
                    self.store.save_all(&[Aggregate::Table(&table)])?;
                }
                return Ok(outcome);
            }

            let mut source = self.require_table(request.source(), OwnerSide::Source)?;
            let mut destination =
                self.require_table(request.destination(), OwnerSide::Destination)?;
            let outcome = mover::move_one(
                source.cards_mut(),
                destination.cards_mut(),
                request.item(),
                request.position(),
            )?;
            self.store.save_all(&[
                Aggregate::Table(&source),
                Aggregate::Table(&destination),
            ])?;
            Ok(outcome)
        })
    }

    /// Moves every card of `source_id` to the end of `destination_id`,
    /// keeping identities. Returns the number of moved cards.
    pub fn move_all_cards(
        &self,
        source_id: TableId,
        destination_id: TableId,
    ) -> BoardResult<usize> {
        self.atomic("board_move_all_cards", || {
            let mut source = self.require_table(source_id, OwnerSide::Source)?;
            let mut destination = self.require_table(destination_id, OwnerSide::Destination)?;
            let moved = mover::move_all(source.cards_mut(), destination.cards_mut())?;
            if moved > 0 {
                self.store.save_all(&[
                    Aggregate::Table(&source),
                    Aggregate::Table(&destination),
                ])?;
            }
            Ok(moved)
        })
    }

    /// Appends a fresh-identity copy of every card of `source_id` to
    /// `destination_id`. Returns the new card ids in order.
    pub fn copy_all_cards(
        &self,
        source_id: TableId,
        destination_id: TableId,
    ) -> BoardResult<Vec<CardId>> {
        self.atomic("board_copy_all_cards", || {
            let source = self.require_table(source_id, OwnerSide::Source)?;
            let mut destination = self.require_table(destination_id, OwnerSide::Destination)?;
            let created = mover::copy_all(source.cards(), destination.cards_mut())?;
            if !created.is_empty() {
                self.store.save_all(&[Aggregate::Table(&destination)])?;
            }
            Ok(created)
        })
    }

    /// Sorts a table's cards by `policy`.
    pub fn sort_cards(&self, table_id: TableId, policy: SortPolicy) -> BoardResult<Table> {
        self.atomic("board_sort_cards", || {
            let mut table = self.require_table(table_id, OwnerSide::Target)?;
            policy.apply(table.cards_mut());
            self.store.save_all(&[Aggregate::Table(&table)])?;
            Ok(table)
        })
    }

    /// Sorts a dashboard's tables by `policy`.
    pub fn sort_tables(
        &self,
        dashboard_id: DashboardId,
        policy: SortPolicy,
    ) -> BoardResult<Dashboard> {
        self.atomic("board_sort_tables", || {
            let mut dashboard = self.require_dashboard(dashboard_id, OwnerSide::Target)?;
            policy.apply(dashboard.tables_mut());
            self.store.save_all(&[Aggregate::Dashboard(&dashboard)])?;
            Ok(dashboard)
        })
    }

    /// Sorts a card's checklist by `policy`.
    pub fn sort_checklist(&self, card_id: CardId, policy: SortPolicy) -> BoardResult<Card> {
        self.atomic("board_sort_checklist", || {
            let mut card = self.require_card(card_id, OwnerSide::Target)?;
            policy.apply(card.checklist_mut());
            self.store.save_all(&[Aggregate::Card(&card)])?;
            Ok(card)
        })
    }

    /// Loads one dashboard.
    pub fn dashboard(&self, id: DashboardId) -> BoardResult<Option<Dashboard>> {
        Ok(self.store.load_dashboard(id)?)
    }

    /// Loads one table with its cards.
    pub fn table(&self, id: TableId) -> BoardResult<Option<Table>> {
        Ok(self.store.load_table(id)?)
    }

    /// Loads one card with its checklist.
    pub fn card(&self, id: CardId) -> BoardResult<Option<Card>> {
        Ok(self.store.load_card(id)?)
    }

    // Loads and the save of one use-case share a single write scope.
    fn atomic<T>(
        &self,
        event: &'static str,
        body: impl FnOnce() -> BoardResult<T>,
    ) -> BoardResult<T> {
        observe(event, || self.store.transaction(body))
    }

    fn require_dashboard(&self, id: DashboardId, side: OwnerSide) -> BoardResult<Dashboard> {
        self.store
            .load_dashboard(id)?
            .ok_or(BoardServiceError::UnknownOwner { side, id })
    }

    fn require_table(&self, id: TableId, side: OwnerSide) -> BoardResult<Table> {
        self.store
            .load_table(id)?
            .ok_or(BoardServiceError::UnknownOwner { side, id })
    }

    fn require_card(&self, id: CardId, side: OwnerSide) -> BoardResult<Card> {
        self.store
            .load_card(id)?
            .ok_or(BoardServiceError::UnknownOwner { side, id })
    }
}

fn reorder<T: Positioned>(
    collection: &mut PositionedCollection<T>,
    item: ItemId,
    position: usize,
) -> BoardResult<MoveOutcome> {
    let current = collection
        .position_of(item)
        .ok_or(PositionError::NotAMember {
            owner: collection.owner(),
            item,
        })?;
    if current == position {
        return Ok(MoveOutcome::Unchanged);
    }
    collection.update_position(item, position)?;
    Ok(MoveOutcome::Reordered { item, position })
}

fn observe<T>(event: &'static str, run: impl FnOnce() -> BoardResult<T>) -> BoardResult<T> {
    let started_at = Instant::now();
    let result = run();
    match &result {
        Ok(_) => info!(
            "event={} module=service status=ok duration_ms={}",
            event,
            started_at.elapsed().as_millis()
        ),
        Err(err) => warn!(
            "event={} module=service status=error duration_ms={} error_code={} error={}",
            event,
            started_at.elapsed().as_millis(),
            err.code(),
            err
        ),
    }
    result
}
