//! Typed move requests parsed at the system boundary.
//!
//! # Invariants
//! - A `MoveRequest` never holds nil identities.
//! - Raw signed positions are rejected when negative; range checks against a
//!   concrete collection happen in the ordering engine.

use super::board::BoardValidationError;
use crate::ordering::collection::{ItemId, OwnerId};
use uuid::Uuid;

/// Transient description of one move: not persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MoveRequest {
    source: OwnerId,
    destination: OwnerId,
    item: ItemId,
    position: usize,
}

impl MoveRequest {
    /// Builds a request from typed values.
    pub fn new(
        source: OwnerId,
        destination: OwnerId,
        item: ItemId,
        position: usize,
    ) -> Result<Self, BoardValidationError> {
        for (field, id) in [
            ("source owner id", source),
            ("destination owner id", destination),
            ("item id", item),
        ] {
            if id.is_nil() {
                return Err(BoardValidationError::NilId(field));
            }
        }
        Ok(Self {
            source,
            destination,
            item,
            position,
        })
    }

    /// Parses raw text identities and a signed position.
    pub fn parse(
        source: &str,
        destination: &str,
        item: &str,
        position: i64,
    ) -> Result<Self, BoardValidationError> {
        let source = parse_id("source owner id", source)?;
        let destination = parse_id("destination owner id", destination)?;
        let item = parse_id("item id", item)?;
        let position =
            usize::try_from(position).map_err(|_| BoardValidationError::NegativePosition(position))?;
        Self::new(source, destination, item, position)
    }

    pub fn source(&self) -> OwnerId {
        self.source
    }

    pub fn destination(&self) -> OwnerId {
        self.destination
    }

    pub fn item(&self) -> ItemId {
        self.item
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Whether the request reorders inside a single owner.
    pub fn is_within_owner(&self) -> bool {
        self.source == self.destination
    }
}

fn parse_id(field: &'static str, value: &str) -> Result<Uuid, BoardValidationError> {
    Uuid::parse_str(value.trim()).map_err(|_| BoardValidationError::MalformedId {
        field,
        value: value.to_string(),
    })
}
