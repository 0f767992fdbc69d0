//! Board aggregate store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Resolve dashboards, tables and cards by identity (`AggregateLookup`).
//! - Persist any set of aggregates as one all-or-nothing unit
//!   (`PersistenceGateway`).
//! - Keep SQL details and row ownership rules inside the repository boundary.
//!
//! # Invariants
//! - Unknown identities load as `Ok(None)`, never as a generic error.
//! - Loaded collections must already be contiguous; corrupt ordering is
//!   rejected as `InvalidData` instead of being repaired.
//! - A dashboard owns its tables' membership and position, a table owns its
//!   title plus its cards' membership, position and contents, and a card owns
//!   its contents and checklist.
//! - `save_all` writes upserts first (dashboards, tables, cards), prunes rows
//!   no saved collection references anymore, and commits once.
//! - Inside a `transaction` scope, loads and saves share one IMMEDIATE
//!   transaction, so no other writer can commit between a load and the save
//!   built from it. `save_all` then runs under a savepoint of that scope.

use crate::db::migrations::latest_version;
use crate::db::DbError;
use crate::model::board::{
    BoardValidationError, Card, CardId, ChecklistItem, Dashboard, DashboardId, Table, TableHeader,
    TableId, TagId,
};
use crate::ordering::collection::{OwnerId, Positioned, PositionedCollection};
use log::{debug, error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

const CARD_SELECT_SQL: &str = "SELECT
    id,
    title,
    description,
    due_at,
    position
FROM cards";

const REQUIRED_TABLES: [&str; 6] = [
    "dashboards",
    "board_tables",
    "cards",
    "checklist_items",
    "tags",
    "card_tags",
];

/// Result type used by board store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors from board store operations.
#[derive(Debug)]
pub enum StoreError {
    /// Underlying SQLite/bootstrap error.
    Db(DbError),
    /// Persisted row fails domain validation.
    Validation(BoardValidationError),
    /// A row the save depends on does not exist.
    NotFound { kind: &'static str, id: Uuid },
    /// Persisted data cannot be converted to a valid aggregate.
    InvalidData(String),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    /// Required table is missing.
    MissingRequiredTable(&'static str),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Validation(err) => write!(f, "invalid persisted board data: {err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted board data: {message}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "board store requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "board store requires table `{table}`")
            }
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Validation(err) => Some(err),
            Self::NotFound { .. } => None,
            Self::InvalidData(_) => None,
            Self::UninitializedConnection { .. } => None,
            Self::MissingRequiredTable(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<BoardValidationError> for StoreError {
    fn from(value: BoardValidationError) -> Self {
        Self::Validation(value)
    }
}

/// Borrowed view of one aggregate handed to `save_all`.
#[derive(Debug, Clone, Copy)]
pub enum Aggregate<'a> {
    Dashboard(&'a Dashboard),
    Table(&'a Table),
    Card(&'a Card),
}

impl Aggregate<'_> {
    /// Identity of the wrapped aggregate.
    pub fn id(&self) -> Uuid {
        match self {
            Self::Dashboard(dashboard) => dashboard.id(),
            Self::Table(table) => table.id(),
            Self::Card(card) => card.id(),
        }
    }

    /// Stable kind label used in logs and errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Dashboard(_) => "dashboard",
            Self::Table(_) => "table",
            Self::Card(_) => "card",
        }
    }

    // Parents are written before children so child rows find their owner.
    fn write_rank(&self) -> u8 {
        match self {
            Self::Dashboard(_) => 0,
            Self::Table(_) => 1,
            Self::Card(_) => 2,
        }
    }
}

/// Resolves aggregates by identity.
pub trait AggregateLookup {
    /// Loads one dashboard with its ordered table headers.
    fn load_dashboard(&self, id: DashboardId) -> StoreResult<Option<Dashboard>>;
    /// Loads one table with its ordered cards and their checklists.
    fn load_table(&self, id: TableId) -> StoreResult<Option<Table>>;
    /// Loads one card with its ordered checklist.
    fn load_card(&self, id: CardId) -> StoreResult<Option<Card>>;
}

/// Persists aggregates atomically.
pub trait PersistenceGateway {
    /// Saves every aggregate in one unit: all writes land or none do.
    fn save_all(&self, aggregates: &[Aggregate<'_>]) -> StoreResult<()>;

    /// Runs `run` inside one write scope spanning every load and save it
    /// makes through this store.
    ///
    /// The scope commits when `run` returns `Ok` and rolls back otherwise.
    /// A scope opened inside another one joins the outer scope.
    fn transaction<T, E, F>(&self, run: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<StoreError>;
}

/// SQLite-backed board store.
pub struct SqliteBoardStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteBoardStore<'conn> {
    /// Creates a store from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> StoreResult<Self> {
        ensure_board_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn write_all(&self, ordered: &[&Aggregate<'_>]) -> StoreResult<()> {
        if !self.conn.is_autocommit() {
            return self.write_in_savepoint(ordered);
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        write_aggregates(&tx, ordered)?;
        tx.commit()?;
        Ok(())
    }

    // Nested under an open `transaction` scope; a failed save leaves the
    // scope as it was before the save started.
    fn write_in_savepoint(&self, ordered: &[&Aggregate<'_>]) -> StoreResult<()> {
        self.conn.execute_batch("SAVEPOINT store_save;")?;
        match write_aggregates(self.conn, ordered) {
            Ok(()) => {
                self.conn.execute_batch("RELEASE store_save;")?;
                Ok(())
            }
            Err(err) => {
                self.conn
                    .execute_batch("ROLLBACK TO store_save; RELEASE store_save;")?;
                Err(err)
            }
        }
    }
}

impl AggregateLookup for SqliteBoardStore<'_> {
    fn load_dashboard(&self, id: DashboardId) -> StoreResult<Option<Dashboard>> {
        let title: Option<String> = self
            .conn
            .query_row(
                "SELECT title FROM dashboards WHERE id = ?1;",
                [id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        let Some(title) = title else {
            return Ok(None);
        };

        let mut stmt = self.conn.prepare(
            "SELECT
                id,
                title,
                position
             FROM board_tables
             WHERE dashboard_id = ?1
             ORDER BY position ASC, id ASC;",
        )?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut headers = Vec::new();
        while let Some(row) = rows.next()? {
            let table_id = parse_uuid(&row.get::<_, String>("id")?, "board_tables.id")?;
            let position = parse_position(row.get("position")?, "board_tables.position")?;
            let title: String = row.get("title")?;
            headers.push(TableHeader::restore(table_id, &title, position)?);
        }

        let tables = restore_collection(id, headers, "board_tables")?;
        debug!(
            "event=store_load module=repo kind=dashboard id={} items={}",
            id,
            tables.len()
        );
        Ok(Some(Dashboard::restore(id, &title, tables)?))
    }

    fn load_table(&self, id: TableId) -> StoreResult<Option<Table>> {
        let row: Option<(String, String)> = self
            .conn
            .query_row(
                "SELECT dashboard_id, title FROM board_tables WHERE id = ?1;",
                [id.to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((dashboard_text, title)) = row else {
            return Ok(None);
        };
        let dashboard_id = parse_uuid(&dashboard_text, "board_tables.dashboard_id")?;

        let mut stmt = self.conn.prepare(&format!(
            "{CARD_SELECT_SQL}
             WHERE table_id = ?1
             ORDER BY position ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([id.to_string()])?;
        let mut cards = Vec::new();
        while let Some(row) = rows.next()? {
            cards.push(parse_card_row(self.conn, row)?);
        }

        let cards = restore_collection(id, cards, "cards")?;
        debug!(
            "event=store_load module=repo kind=table id={} items={}",
            id,
            cards.len()
        );
        Ok(Some(Table::restore(id, dashboard_id, &title, cards)?))
    }

    fn load_card(&self, id: CardId) -> StoreResult<Option<Card>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{CARD_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            let card = parse_card_row(self.conn, row)?;
            debug!(
                "event=store_load module=repo kind=card id={} items={}",
                id,
                card.checklist().len()
            );
            return Ok(Some(card));
        }
        Ok(None)
    }
}

impl PersistenceGateway for SqliteBoardStore<'_> {
    fn save_all(&self, aggregates: &[Aggregate<'_>]) -> StoreResult<()> {
        let started_at = Instant::now();
        let mut ordered: Vec<&Aggregate<'_>> = aggregates.iter().collect();
        ordered.sort_by_key(|aggregate| aggregate.write_rank());

        let kinds = ordered
            .iter()
            .map(|aggregate| aggregate.kind())
            .collect::<Vec<_>>()
            .join(",");

        match self.write_all(&ordered) {
            Ok(()) => {
                info!(
                    "event=store_save module=repo status=ok aggregates={} kinds={} duration_ms={}",
                    ordered.len(),
                    kinds,
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=store_save module=repo status=error aggregates={} kinds={} duration_ms={} error_code=save_failed error={}",
                    ordered.len(),
                    kinds,
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    fn transaction<T, E, F>(&self, run: F) -> Result<T, E>
    where
        F: FnOnce() -> Result<T, E>,
        E: From<StoreError>,
    {
        if !self.conn.is_autocommit() {
            return run();
        }
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)
            .map_err(StoreError::from)?;
        // Dropping `tx` on the error path rolls the scope back.
        let value = run()?;
        tx.commit().map_err(StoreError::from)?;
        Ok(value)
    }
}

fn write_aggregates(conn: &Connection, ordered: &[&Aggregate<'_>]) -> StoreResult<()> {
    for aggregate in ordered {
        match aggregate {
            Aggregate::Dashboard(dashboard) => upsert_dashboard(conn, dashboard)?,
            Aggregate::Table(table) => upsert_table(conn, table)?,
            Aggregate::Card(card) => update_card(conn, card)?,
        }
    }
    for aggregate in ordered {
        match aggregate {
            Aggregate::Dashboard(dashboard) => {
                prune_children(
                    conn,
                    "board_tables",
                    "dashboard_id",
                    dashboard.id(),
                    dashboard.tables().ids(),
                )?;
            }
            Aggregate::Table(table) => {
                prune_children(conn, "cards", "table_id", table.id(), table.cards().ids())?;
                for card in table.cards().iter() {
                    prune_checklist(conn, card)?;
                }
            }
            Aggregate::Card(card) => prune_checklist(conn, card)?,
        }
    }
    Ok(())
}

fn upsert_dashboard(conn: &Connection, dashboard: &Dashboard) -> StoreResult<()> {
    conn.execute(
        "INSERT INTO dashboards (id, title)
         VALUES (?1, ?2)
         ON CONFLICT (id) DO UPDATE SET
            title = excluded.title,
            updated_at = (strftime('%s', 'now') * 1000);",
        params![dashboard.id().to_string(), dashboard.title()],
    )?;

    for header in dashboard.tables().iter() {
        conn.execute(
            "INSERT INTO board_tables (id, dashboard_id, title, position)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (id) DO UPDATE SET
                dashboard_id = excluded.dashboard_id,
                position = excluded.position,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                header.id().to_string(),
                dashboard.id().to_string(),
                header.title(),
                to_db_position(header.position())?,
            ],
        )?;
    }
    Ok(())
}

fn upsert_table(conn: &Connection, table: &Table) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE board_tables
         SET title = ?2,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![table.id().to_string(), table.title()],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            kind: "table",
            id: table.id(),
        });
    }

    for card in table.cards().iter() {
        conn.execute(
            "INSERT INTO cards (id, table_id, title, description, due_at, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (id) DO UPDATE SET
                table_id = excluded.table_id,
                title = excluded.title,
                description = excluded.description,
                due_at = excluded.due_at,
                position = excluded.position,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                card.id().to_string(),
                table.id().to_string(),
                card.title(),
                card.description.as_deref(),
                card.due_at,
                to_db_position(card.position())?,
            ],
        )?;
        write_card_contents(conn, card)?;
    }
    Ok(())
}

fn update_card(conn: &Connection, card: &Card) -> StoreResult<()> {
    let changed = conn.execute(
        "UPDATE cards
         SET title = ?2,
             description = ?3,
             due_at = ?4,
             updated_at = (strftime('%s', 'now') * 1000)
         WHERE id = ?1;",
        params![
            card.id().to_string(),
            card.title(),
            card.description.as_deref(),
            card.due_at,
        ],
    )?;
    if changed == 0 {
        return Err(StoreError::NotFound {
            kind: "card",
            id: card.id(),
        });
    }
    write_card_contents(conn, card)
}

fn write_card_contents(conn: &Connection, card: &Card) -> StoreResult<()> {
    let card_id = card.id().to_string();
    for item in card.checklist().iter() {
        conn.execute(
            "INSERT INTO checklist_items (id, card_id, text, is_checked, position)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (id) DO UPDATE SET
                card_id = excluded.card_id,
                text = excluded.text,
                is_checked = excluded.is_checked,
                position = excluded.position,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![
                item.id().to_string(),
                card_id.as_str(),
                item.text(),
                bool_to_int(item.is_checked),
                to_db_position(item.position())?,
            ],
        )?;
    }

    conn.execute(
        "DELETE FROM card_tags WHERE card_id = ?1;",
        [card_id.as_str()],
    )?;
    for tag_id in &card.tag_ids {
        conn.execute(
            "INSERT INTO card_tags (card_id, tag_id) VALUES (?1, ?2);",
            params![card_id.as_str(), tag_id.to_string()],
        )?;
    }
    Ok(())
}

fn prune_checklist(conn: &Connection, card: &Card) -> StoreResult<()> {
    prune_children(
        conn,
        "checklist_items",
        "card_id",
        card.id(),
        card.checklist().ids(),
    )?;
    Ok(())
}

fn prune_children(
    conn: &Connection,
    table: &'static str,
    owner_column: &'static str,
    owner: OwnerId,
    keep: &[Uuid],
) -> StoreResult<usize> {
    let keep: HashSet<String> = keep.iter().map(Uuid::to_string).collect();
    let mut stmt = conn.prepare(&format!(
        "SELECT id FROM {table} WHERE {owner_column} = ?1;"
    ))?;
    let mut rows = stmt.query([owner.to_string()])?;
    let mut stale = Vec::new();
    while let Some(row) = rows.next()? {
        let id: String = row.get(0)?;
        if !keep.contains(&id) {
            stale.push(id);
        }
    }

    for id in &stale {
        conn.execute(&format!("DELETE FROM {table} WHERE id = ?1;"), [id])?;
    }
    if !stale.is_empty() {
        debug!(
            "event=store_prune module=repo table={} owner={} removed={}",
            table,
            owner,
            stale.len()
        );
    }
    Ok(stale.len())
}

fn parse_card_row(conn: &Connection, row: &Row<'_>) -> StoreResult<Card> {
    let card_id = parse_uuid(&row.get::<_, String>("id")?, "cards.id")?;
    let position = parse_position(row.get("position")?, "cards.position")?;
    let title: String = row.get("title")?;

    let checklist = restore_collection(card_id, load_checklist(conn, card_id)?, "checklist_items")?;
    let mut card = Card::restore(card_id, &title, position, checklist)?;
    card.description = row.get("description")?;
    card.due_at = row.get("due_at")?;
    card.tag_ids = load_tag_ids(conn, card_id)?;
    Ok(card)
}

fn load_checklist(conn: &Connection, card_id: CardId) -> StoreResult<Vec<ChecklistItem>> {
    let mut stmt = conn.prepare(
        "SELECT
            id,
            text,
            is_checked,
            position
         FROM checklist_items
         WHERE card_id = ?1
         ORDER BY position ASC, id ASC;",
    )?;
    let mut rows = stmt.query([card_id.to_string()])?;
    let mut items = Vec::new();
    while let Some(row) = rows.next()? {
        let id = parse_uuid(&row.get::<_, String>("id")?, "checklist_items.id")?;
        let position = parse_position(row.get("position")?, "checklist_items.position")?;
        let is_checked = match row.get::<_, i64>("is_checked")? {
            0 => false,
            1 => true,
            other => {
                return Err(StoreError::InvalidData(format!(
                    "invalid is_checked value `{other}` in checklist_items.is_checked"
                )));
            }
        };
        let text: String = row.get("text")?;
        items.push(ChecklistItem::restore(id, &text, is_checked, position)?);
    }
    Ok(items)
}

fn load_tag_ids(conn: &Connection, card_id: CardId) -> StoreResult<BTreeSet<TagId>> {
    let mut stmt = conn.prepare(
        "SELECT tag_id
         FROM card_tags
         WHERE card_id = ?1;",
    )?;
    let mut rows = stmt.query([card_id.to_string()])?;
    let mut tags = BTreeSet::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.insert(parse_uuid(&value, "card_tags.tag_id")?);
    }
    Ok(tags)
}

fn restore_collection<T: Positioned>(
    owner: OwnerId,
    items: Vec<T>,
    table: &'static str,
) -> StoreResult<PositionedCollection<T>> {
    PositionedCollection::from_positioned(owner, items).map_err(|err| {
        StoreError::InvalidData(format!("corrupt ordering in {table}: {err}"))
    })
}

fn parse_uuid(value: &str, column: &'static str) -> StoreResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_position(value: i64, column: &'static str) -> StoreResult<usize> {
    usize::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("invalid position `{value}` in {column}")))
}

fn to_db_position(position: usize) -> StoreResult<i64> {
    i64::try_from(position)
        .map_err(|_| StoreError::InvalidData(format!("position {position} exceeds storage range")))
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

fn ensure_board_connection_ready(conn: &Connection) -> StoreResult<()> {
    let expected_version = latest_version();
    let actual_version: u32 = conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
    if actual_version != expected_version {
        return Err(StoreError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    for table in REQUIRED_TABLES {
        if !table_exists(conn, table)? {
            return Err(StoreError::MissingRequiredTable(table));
        }
    }
    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> StoreResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
