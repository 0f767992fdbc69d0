//! Positioned collection with a contiguous zero-based ordering.
//!
//! # Responsibility
//! - Keep one owner's ordered list consistent across every mutation.
//! - Provide the append/remove/reorder/sort primitives the mover composes.
//!
//! # Invariants
//! - After every public call, item positions are exactly `{0, .., len - 1}`.
//! - Items live once in a map keyed by identity; `order` only holds keys.
//! - `position` on an item is a projection of `order`, rewritten by the
//!   collection after each structural change.
//! - A call that returns an error leaves the collection untouched.

use log::trace;
use serde::ser::{Serialize, SerializeSeq, Serializer};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Identity of an item held by a positioned collection.
pub type ItemId = Uuid;

/// Identity of the aggregate that owns a positioned collection.
pub type OwnerId = Uuid;

/// A value with a stable identity and a position inside its owner's list.
pub trait Positioned {
    /// Stable identity used for membership checks.
    fn id(&self) -> ItemId;
    /// Zero-based slot inside the owning collection.
    fn position(&self) -> usize;
    /// Overwrites the projected position. Only collections should call this.
    fn set_position(&mut self, position: usize);
}

/// Items that can produce an independent copy under a fresh identity.
pub trait StructuralClone: Positioned {
    /// Returns a copy with a newly generated identity and the same position.
    fn structural_clone(&self) -> Self;
}

/// Failures reported by positioned collection mutators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// The item is not referenced by the collection of `owner`.
    NotAMember { owner: OwnerId, item: ItemId },
    /// Requested slot is outside `[0, len - 1]` for the collection of `owner`.
    InvalidPosition {
        owner: OwnerId,
        requested: usize,
        len: usize,
    },
    /// The collection of `owner` already references an item with this identity.
    DuplicateMember { owner: OwnerId, item: ItemId },
}

impl Display for PositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAMember { owner, item } => {
                write!(f, "item {item} is not a member of owner {owner}")
            }
            Self::InvalidPosition {
                owner,
                requested,
                len,
            } => write!(
                f,
                "position {requested} is out of range for owner {owner} with {len} item(s)"
            ),
            Self::DuplicateMember { owner, item } => {
                write!(f, "item {item} is already a member of owner {owner}")
            }
        }
    }
}

impl Error for PositionError {}

/// Externally observable shape of a collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionState {
    /// No items.
    Empty,
    /// `n >= 1` items at positions `0..n`.
    Consistent(usize),
}

/// Ordered list of items owned by one aggregate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionedCollection<T> {
    owner: OwnerId,
    order: Vec<ItemId>,
    items: HashMap<ItemId, T>,
}

impl<T: Positioned> PositionedCollection<T> {
    /// Creates an empty collection for `owner`.
    pub fn new(owner: OwnerId) -> Self {
        Self {
            owner,
            order: Vec::new(),
            items: HashMap::new(),
        }
    }

    /// Builds a collection by appending `items` in iteration order.
    ///
    /// Incoming positions are ignored and reassigned from the iteration order.
    pub fn from_ordered(
        owner: OwnerId,
        items: impl IntoIterator<Item = T>,
    ) -> Result<Self, PositionError> {
        let mut collection = Self::new(owner);
        for item in items {
            collection.append(item)?;
        }
        Ok(collection)
    }

    /// Rebuilds a collection from items that already carry their positions.
    ///
    /// Used by load paths: the stored positions must already form
    /// `{0, .., n - 1}` without duplicates, otherwise the persisted ordering
    /// is rejected instead of silently repaired.
    pub fn from_positioned(owner: OwnerId, items: Vec<T>) -> Result<Self, PositionError> {
        let len = items.len();
        let mut slots: Vec<Option<ItemId>> = vec![None; len];
        let mut arena = HashMap::with_capacity(len);

        for item in items {
            let id = item.id();
            let position = item.position();
            if arena.contains_key(&id) {
                return Err(PositionError::DuplicateMember { owner, item: id });
            }
            match slots.get_mut(position) {
                Some(slot) if slot.is_none() => *slot = Some(id),
                _ => {
                    return Err(PositionError::InvalidPosition {
                        owner,
                        requested: position,
                        len,
                    })
                }
            }
            arena.insert(id, item);
        }

        Ok(Self {
            owner,
            order: slots.into_iter().flatten().collect(),
            items: arena,
        })
    }

    /// Returns the owning aggregate identity.
    pub fn owner(&self) -> OwnerId {
        self.owner
    }

    /// Number of members.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` in the `Empty` state.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Returns the current state-machine state.
    pub fn state(&self) -> CollectionState {
        match self.order.len() {
            0 => CollectionState::Empty,
            n => CollectionState::Consistent(n),
        }
    }

    /// Returns `true` when `id` is a member.
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Borrows the member with identity `id`.
    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.items.get(&id)
    }

    /// Returns the current position of `id`, if it is a member.
    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.get(&id).map(Positioned::position)
    }

    /// Member identities in position order.
    pub fn ids(&self) -> &[ItemId] {
        &self.order
    }

    /// Iterates members in position order.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.order.iter().filter_map(|id| self.items.get(id))
    }

    /// Returns whether stored positions match the key order exactly.
    pub fn is_consistent(&self) -> bool {
        self.order.len() == self.items.len()
            && self.order.iter().enumerate().all(|(index, id)| {
                self.items
                    .get(id)
                    .is_some_and(|item| item.position() == index && item.id() == *id)
            })
    }

    /// Appends `item` at the end and returns its position.
    ///
    /// # Errors
    /// - `DuplicateMember` when an item with the same identity is present.
    pub fn append(&mut self, mut item: T) -> Result<usize, PositionError> {
        let id = item.id();
        self.ensure_absent(id)?;

        let position = self.order.len();
        item.set_position(position);
        self.order.push(id);
        self.items.insert(id, item);
        trace!(
            "event=collection_append module=ordering owner={} item={} position={}",
            self.owner,
            id,
            position
        );
        Ok(position)
    }

    /// Removes `id` and closes the gap it leaves behind.
    ///
    /// Returns the removed item; its `position` still reports the slot it
    /// occupied before removal.
    ///
    /// # Errors
    /// - `NotAMember` when `id` is not referenced by this collection.
    pub fn remove_and_reindex(&mut self, id: ItemId) -> Result<T, PositionError> {
        let removed_at = self.require_position(id)?;
        let item = self
            .items
            .remove(&id)
            .ok_or(PositionError::NotAMember {
                owner: self.owner,
                item: id,
            })?;
        self.order.remove(removed_at);
        self.reproject(removed_at, self.order.len());
        trace!(
            "event=collection_remove module=ordering owner={} item={} position={}",
            self.owner,
            id,
            removed_at
        );
        Ok(item)
    }

    /// Moves `id` to `new_position`, shifting the items in between by one.
    ///
    /// Moving an item to the slot it already occupies is a no-op.
    ///
    /// # Errors
    /// - `NotAMember` when `id` is not referenced by this collection.
    /// - `InvalidPosition` when `new_position >= len`.
    pub fn update_position(&mut self, id: ItemId, new_position: usize) -> Result<(), PositionError> {
        let current = self.require_position(id)?;
        if new_position == current {
            return Ok(());
        }
        if new_position >= self.order.len() {
            return Err(PositionError::InvalidPosition {
                owner: self.owner,
                requested: new_position,
                len: self.order.len(),
            });
        }

        if current < new_position {
            self.order[current..=new_position].rotate_left(1);
            self.reproject(current, new_position + 1);
        } else {
            self.order[new_position..=current].rotate_right(1);
            self.reproject(new_position, current + 1);
        }
        trace!(
            "event=collection_reorder module=ordering owner={} item={} from={} to={}",
            self.owner,
            id,
            current,
            new_position
        );
        Ok(())
    }

    /// Reorders every member by `compare`, then renumbers positions.
    ///
    /// The sort is stable, so items comparing equal keep their relative order.
    pub fn sort_by<F>(&mut self, mut compare: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let items = &self.items;
        self.order
            .sort_by(|left, right| match (items.get(left), items.get(right)) {
                (Some(left), Some(right)) => compare(left, right),
                _ => Ordering::Equal,
            });
        self.reproject(0, self.order.len());
    }

    /// Removes every member.
    pub fn clear(&mut self) {
        self.order.clear();
        self.items.clear();
    }

    /// Removes and returns every member in position order.
    pub fn drain(&mut self) -> Vec<T> {
        let order = std::mem::take(&mut self.order);
        let mut items = std::mem::take(&mut self.items);
        order
            .into_iter()
            .filter_map(|id| items.remove(&id))
            .collect()
    }

    /// Runs `edit` against one member's payload.
    ///
    /// The member keeps its slot whatever the closure does to its position.
    ///
    /// # Errors
    /// - `NotAMember` when `id` is not referenced by this collection.
    pub fn edit<R>(&mut self, id: ItemId, edit: impl FnOnce(&mut T) -> R) -> Result<R, PositionError> {
        let owner = self.owner;
        let item = self
            .items
            .get_mut(&id)
            .ok_or(PositionError::NotAMember { owner, item: id })?;
        let position = item.position();
        let result = edit(item);
        item.set_position(position);
        Ok(result)
    }

    /// Fails with `DuplicateMember` when `id` is already present.
    pub fn ensure_absent(&self, id: ItemId) -> Result<(), PositionError> {
        if self.items.contains_key(&id) {
            return Err(PositionError::DuplicateMember {
                owner: self.owner,
                item: id,
            });
        }
        Ok(())
    }

    fn require_position(&self, id: ItemId) -> Result<usize, PositionError> {
        self.position_of(id).ok_or(PositionError::NotAMember {
            owner: self.owner,
            item: id,
        })
    }

    fn reproject(&mut self, start: usize, end: usize) {
        for index in start..end {
            if let Some(item) = self.order.get(index).and_then(|id| self.items.get_mut(id)) {
                item.set_position(index);
            }
        }
    }
}

impl<T: StructuralClone> PositionedCollection<T> {
    /// Returns independent copies of every member in position order.
    ///
    /// Copies carry fresh identities and their source positions; none of them
    /// is added to this collection.
    pub fn copy_snapshot(&self) -> Vec<T> {
        self.iter().map(StructuralClone::structural_clone).collect()
    }

    /// Builds a new collection for `owner` holding copies of every member.
    pub fn copy_into(&self, owner: OwnerId) -> Self {
        let mut copy = Self::new(owner);
        for item in self.copy_snapshot() {
            let id = item.id();
            copy.order.push(id);
            copy.items.insert(id, item);
        }
        copy
    }
}

impl<T: Positioned + Serialize> Serialize for PositionedCollection<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.order.len()))?;
        for item in self.iter() {
            seq.serialize_element(item)?;
        }
        seq.end()
    }
}
