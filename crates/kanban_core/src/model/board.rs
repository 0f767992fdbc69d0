//! Board domain model: dashboards, tables, cards and checklist items.
//!
//! # Responsibility
//! - Define the aggregates whose positioned lists the ordering engine manages.
//! - Be the single validation boundary for identities and titles.
//!
//! # Invariants
//! - Identities are never nil; fresh identities are time-ordered UUIDs.
//! - Titles and checklist text are trimmed, whitespace-collapsed and non-blank.
//! - Every embedded collection is owned by its parent's identity.
//!
//! # See also
//! - `crate::ordering::collection`

use crate::ordering::collection::{ItemId, Positioned, PositionedCollection, StructuralClone};
use crate::ordering::sort::Labeled;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type DashboardId = Uuid;
pub type TableId = Uuid;
pub type CardId = Uuid;
pub type ChecklistItemId = Uuid;
pub type TagId = Uuid;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Generates a fresh identity for a new or cloned entity.
pub fn new_id() -> Uuid {
    Uuid::now_v7()
}

/// Validation failures for board entities and requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BoardValidationError {
    /// Named text field is empty after normalization.
    Blank(&'static str),
    /// Named identity field is the nil UUID.
    NilId(&'static str),
    /// Named identity field is not a UUID.
    MalformedId { field: &'static str, value: String },
    /// Raw position is negative.
    NegativePosition(i64),
    /// Embedded collection belongs to a different owner.
    OwnerMismatch { expected: Uuid, actual: Uuid },
}

impl Display for BoardValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blank(field) => write!(f, "{field} must not be blank"),
            Self::NilId(field) => write!(f, "{field} must not be nil"),
            Self::MalformedId { field, value } => {
                write!(f, "{field} is not a valid uuid: `{value}`")
            }
            Self::NegativePosition(value) => {
                write!(f, "position must be >= 0, got {value}")
            }
            Self::OwnerMismatch { expected, actual } => write!(
                f,
                "collection owner {actual} does not match aggregate {expected}"
            ),
        }
    }
}

impl Error for BoardValidationError {}

/// Normalizes user-facing text: trims and collapses inner whitespace.
pub fn normalize_text(field: &'static str, value: &str) -> Result<String, BoardValidationError> {
    let collapsed = WHITESPACE_RE.replace_all(value.trim(), " ");
    if collapsed.is_empty() {
        return Err(BoardValidationError::Blank(field));
    }
    Ok(collapsed.into_owned())
}

fn require_id(field: &'static str, id: Uuid) -> Result<Uuid, BoardValidationError> {
    if id.is_nil() {
        return Err(BoardValidationError::NilId(field));
    }
    Ok(id)
}

fn require_owner<T>(
    expected: Uuid,
    collection: &PositionedCollection<T>,
) -> Result<(), BoardValidationError>
where
    T: Positioned,
{
    if collection.owner() != expected {
        return Err(BoardValidationError::OwnerMismatch {
            expected,
            actual: collection.owner(),
        });
    }
    Ok(())
}

/// Top-level board holding an ordered list of tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    id: DashboardId,
    title: String,
    tables: PositionedCollection<TableHeader>,
}

impl Dashboard {
    /// Creates an empty dashboard with a generated identity.
    pub fn new(title: &str) -> Result<Self, BoardValidationError> {
        let id = new_id();
        Ok(Self {
            id,
            title: normalize_text("dashboard title", title)?,
            tables: PositionedCollection::new(id),
        })
    }

    /// Rebuilds a dashboard from persisted state.
    pub fn restore(
        id: DashboardId,
        title: &str,
        tables: PositionedCollection<TableHeader>,
    ) -> Result<Self, BoardValidationError> {
        let id = require_id("dashboard id", id)?;
        require_owner(id, &tables)?;
        Ok(Self {
            id,
            title: normalize_text("dashboard title", title)?,
            tables,
        })
    }

    pub fn id(&self) -> DashboardId {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn tables(&self) -> &PositionedCollection<TableHeader> {
        &self.tables
    }

    pub fn tables_mut(&mut self) -> &mut PositionedCollection<TableHeader> {
        &mut self.tables
    }
}

/// A dashboard's view of one of its tables.
///
/// The dashboard owns membership and position; the table owns its contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHeader {
    id: TableId,
    title: String,
    position: usize,
}

impl TableHeader {
    /// Rebuilds a header from persisted state.
    pub fn restore(
        id: TableId,
        title: &str,
        position: usize,
    ) -> Result<Self, BoardValidationError> {
        Ok(Self {
            id: require_id("table id", id)?,
            title: normalize_text("table title", title)?,
            position,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }
}

impl Positioned for TableHeader {
    fn id(&self) -> ItemId {
        self.id
    }

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }
}

impl Labeled for TableHeader {
    fn label(&self) -> &str {
        &self.title
    }
}

/// Column of cards inside a dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Table {
    id: TableId,
    dashboard_id: DashboardId,
    title: String,
    cards: PositionedCollection<Card>,
}

impl Table {
    /// Creates an empty table for `dashboard_id` with a generated identity.
    pub fn new(dashboard_id: DashboardId, title: &str) -> Result<Self, BoardValidationError> {
        let id = new_id();
        Ok(Self {
            id,
            dashboard_id: require_id("dashboard id", dashboard_id)?,
            title: normalize_text("table title", title)?,
            cards: PositionedCollection::new(id),
        })
    }

    /// Rebuilds a table from persisted state.
    pub fn restore(
        id: TableId,
        dashboard_id: DashboardId,
        title: &str,
        cards: PositionedCollection<Card>,
    ) -> Result<Self, BoardValidationError> {
        let id = require_id("table id", id)?;
        require_owner(id, &cards)?;
        Ok(Self {
            id,
            dashboard_id: require_id("dashboard id", dashboard_id)?,
            title: normalize_text("table title", title)?,
            cards,
        })
    }

    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn dashboard_id(&self) -> DashboardId {
        self.dashboard_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Header to register this table in its dashboard's list.
    pub fn header(&self) -> TableHeader {
        TableHeader {
            id: self.id,
            title: self.title.clone(),
            position: 0,
        }
    }

    pub fn cards(&self) -> &PositionedCollection<Card> {
        &self.cards
    }

    pub fn cards_mut(&mut self) -> &mut PositionedCollection<Card> {
        &mut self.cards
    }
}

/// Unit of work on a table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    id: CardId,
    title: String,
    /// Optional free-form body.
    pub description: Option<String>,
    /// Optional due time in epoch milliseconds.
    pub due_at: Option<i64>,
    /// Attached tags. Tags are shared entities, so clones link the same ids.
    pub tag_ids: BTreeSet<TagId>,
    checklist: PositionedCollection<ChecklistItem>,
    position: usize,
}

impl Card {
    /// Creates a card with a generated identity and an empty checklist.
    pub fn new(title: &str) -> Result<Self, BoardValidationError> {
        let id = new_id();
        Ok(Self {
            id,
            title: normalize_text("card title", title)?,
            description: None,
            due_at: None,
            tag_ids: BTreeSet::new(),
            checklist: PositionedCollection::new(id),
            position: 0,
        })
    }

    /// Rebuilds a card from persisted state.
    pub fn restore(
        id: CardId,
        title: &str,
        position: usize,
        checklist: PositionedCollection<ChecklistItem>,
    ) -> Result<Self, BoardValidationError> {
        let id = require_id("card id", id)?;
        require_owner(id, &checklist)?;
        Ok(Self {
            id,
            title: normalize_text("card title", title)?,
            description: None,
            due_at: None,
            tag_ids: BTreeSet::new(),
            checklist,
            position,
        })
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn checklist(&self) -> &PositionedCollection<ChecklistItem> {
        &self.checklist
    }

    pub fn checklist_mut(&mut self) -> &mut PositionedCollection<ChecklistItem> {
        &mut self.checklist
    }
}

impl Positioned for Card {
    fn id(&self) -> ItemId {
        self.id
    }

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }
}

impl StructuralClone for Card {
    /// Deep copy: the checklist is cloned under fresh identities too.
    fn structural_clone(&self) -> Self {
        let id = new_id();
        Self {
            id,
            title: self.title.clone(),
            description: self.description.clone(),
            due_at: self.due_at,
            tag_ids: self.tag_ids.clone(),
            checklist: self.checklist.copy_into(id),
            position: self.position,
        }
    }
}

impl Labeled for Card {
    fn label(&self) -> &str {
        &self.title
    }
}

/// One line of a card's checklist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChecklistItem {
    id: ChecklistItemId,
    text: String,
    /// Completion flag.
    pub is_checked: bool,
    position: usize,
}

impl ChecklistItem {
    /// Creates an unchecked item with a generated identity.
    pub fn new(text: &str) -> Result<Self, BoardValidationError> {
        Ok(Self {
            id: new_id(),
            text: normalize_text("checklist text", text)?,
            is_checked: false,
            position: 0,
        })
    }

    /// Rebuilds an item from persisted state.
    pub fn restore(
        id: ChecklistItemId,
        text: &str,
        is_checked: bool,
        position: usize,
    ) -> Result<Self, BoardValidationError> {
        Ok(Self {
            id: require_id("checklist item id", id)?,
            text: normalize_text("checklist text", text)?,
            is_checked,
            position,
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Positioned for ChecklistItem {
    fn id(&self) -> ItemId {
        self.id
    }

    fn position(&self) -> usize {
        self.position
    }

    fn set_position(&mut self, position: usize) {
        self.position = position;
    }
}

impl StructuralClone for ChecklistItem {
    fn structural_clone(&self) -> Self {
        Self {
            id: new_id(),
            text: self.text.clone(),
            is_checked: self.is_checked,
            position: self.position,
        }
    }
}

impl Labeled for ChecklistItem {
    fn label(&self) -> &str {
        &self.text
    }
}
