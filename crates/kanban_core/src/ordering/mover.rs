//! Moves and copies between collections of different owners.
//!
//! # Responsibility
//! - Transfer one item, or a whole list, from a source collection to a
//!   destination collection while keeping both orderings contiguous.
//! - Validate everything before the first mutation so a failure leaves both
//!   collections exactly as they were.
//!
//! # Invariants
//! - `move_one` retires the moved identity: the destination receives a
//!   structural clone with a fresh identity.
//! - `move_all` keeps every identity; `copy_all` never touches the source.
//! - Persisting both owners together is the caller's job.

use super::collection::{
    ItemId, OwnerId, PositionError, Positioned, PositionedCollection, StructuralClone,
};
use log::debug;
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Errors from cross-collection operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveError {
    /// Membership, range or identity collision failure on either side.
    Position(PositionError),
    /// Source and destination are two handles on the same owner and the
    /// requested change is not the idempotent no-op.
    SameOwner(OwnerId),
}

impl Display for MoveError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Position(err) => write!(f, "{err}"),
            Self::SameOwner(owner) => write!(
                f,
                "source and destination both refer to owner {owner}; reorder within the collection instead"
            ),
        }
    }
}

impl Error for MoveError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Position(err) => Some(err),
            Self::SameOwner(_) => None,
        }
    }
}

impl From<PositionError> for MoveError {
    fn from(value: PositionError) -> Self {
        Self::Position(value)
    }
}

/// Result of a single-item move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Nothing changed.
    Unchanged,
    /// The item was reordered inside its own collection.
    Reordered { item: ItemId, position: usize },
    /// The item left its source; a clone now sits in the destination.
    Transferred {
        retired: ItemId,
        created: ItemId,
        position: usize,
    },
}

/// Moves one item from `source` into `dest` at `dest_position`.
///
/// The destination receives a structural clone under a fresh identity; the
/// original identity is retired with the source entry.
///
/// Reordering inside one collection is `PositionedCollection::update_position`;
/// this function only transfers between two owners.
///
/// # Errors
/// - `NotAMember` when `item` is not in `source`.
/// - `InvalidPosition` when `dest_position > dest.len()`.
/// - `SameOwner` when both handles share an owner and the call is not the
///   no-movement case.
pub fn move_one<T: StructuralClone>(
    source: &mut PositionedCollection<T>,
    dest: &mut PositionedCollection<T>,
    item: ItemId,
    dest_position: usize,
) -> Result<MoveOutcome, MoveError> {
    let original = source.get(item).ok_or(PositionError::NotAMember {
        owner: source.owner(),
        item,
    })?;

    if source.owner() == dest.owner() {
        if original.position() == dest_position {
            return Ok(MoveOutcome::Unchanged);
        }
        return Err(MoveError::SameOwner(source.owner()));
    }

    let slots_after_insert = dest.len() + 1;
    if dest_position >= slots_after_insert {
        return Err(PositionError::InvalidPosition {
            owner: dest.owner(),
            requested: dest_position,
            len: slots_after_insert,
        }
        .into());
    }

    let clone = original.structural_clone();
    let created = clone.id();
    dest.ensure_absent(created)?;

    let retired = source.remove_and_reindex(item)?;
    let appended_at = dest.append(clone)?;
    if appended_at != dest_position {
        dest.update_position(created, dest_position)?;
    }

    debug!(
        "event=collection_move_one module=ordering status=ok source={} destination={} retired={} created={} position={}",
        source.owner(),
        dest.owner(),
        retired.id(),
        created,
        dest_position
    );
    Ok(MoveOutcome::Transferred {
        retired: retired.id(),
        created,
        position: dest_position,
    })
}

/// Appends every item of `source` to `dest` in order, keeping identities,
/// then leaves `source` empty. Returns the number of moved items.
///
/// Two handles on the same owner already hold the same list, so that case
/// moves nothing.
///
/// # Errors
/// - `DuplicateMember` when `dest` already references a source identity.
pub fn move_all<T: Positioned>(
    source: &mut PositionedCollection<T>,
    dest: &mut PositionedCollection<T>,
) -> Result<usize, MoveError> {
    if source.owner() == dest.owner() {
        return Ok(0);
    }
    for id in source.ids() {
        dest.ensure_absent(*id)?;
    }

    let items = source.drain();
    let moved = items.len();
    for entry in items {
        dest.append(entry)?;
    }

    debug!(
        "event=collection_move_all module=ordering status=ok source={} destination={} moved={}",
        source.owner(),
        dest.owner(),
        moved
    );
    Ok(moved)
}

/// Appends a fresh-identity copy of every `source` item to `dest`, in
/// source order. Returns the identities of the copies.
///
/// # Errors
/// - `SameOwner` when both handles share an owner.
/// - `DuplicateMember` when a generated identity collides in `dest`.
pub fn copy_all<T: StructuralClone>(
    source: &PositionedCollection<T>,
    dest: &mut PositionedCollection<T>,
) -> Result<Vec<ItemId>, MoveError> {
    if source.owner() == dest.owner() {
        return Err(MoveError::SameOwner(source.owner()));
    }

    let copies = source.copy_snapshot();
    let mut seen = HashSet::with_capacity(copies.len());
    for copy in &copies {
        let id = copy.id();
        if !seen.insert(id) {
            return Err(PositionError::DuplicateMember {
                owner: dest.owner(),
                item: id,
            }
            .into());
        }
        dest.ensure_absent(id)?;
    }

    let mut created = Vec::with_capacity(copies.len());
    for copy in copies {
        created.push(copy.id());
        dest.append(copy)?;
    }

    debug!(
        "event=collection_copy_all module=ordering status=ok source={} destination={} copied={}",
        source.owner(),
        dest.owner(),
        created.len()
    );
    Ok(created)
}
