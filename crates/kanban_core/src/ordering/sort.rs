//! Bulk sort strategies for positioned collections.
//!
//! # Invariants
//! - Every policy is a total order: label ties fall back to identity.
//! - Labels compare ordinally (byte-wise), never by locale collation.

use super::collection::{Positioned, PositionedCollection};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Items exposing a textual label for label-based sorting.
pub trait Labeled: Positioned {
    fn label(&self) -> &str;
}

/// Whole-list ordering strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortPolicy {
    /// Identity ascending. Identities are time-ordered, so this is creation order.
    IdAscending,
    /// Identity descending.
    IdDescending,
    /// Label ascending, byte-wise.
    LabelAscending,
    /// Label descending, byte-wise.
    LabelDescending,
}

impl SortPolicy {
    /// All policies, in declaration order.
    pub const ALL: [SortPolicy; 4] = [
        Self::IdAscending,
        Self::IdDescending,
        Self::LabelAscending,
        Self::LabelDescending,
    ];

    /// Compares two items under this policy.
    pub fn compare<T: Labeled>(self, left: &T, right: &T) -> Ordering {
        match self {
            Self::IdAscending => left.id().cmp(&right.id()),
            Self::IdDescending => right.id().cmp(&left.id()),
            Self::LabelAscending => left
                .label()
                .as_bytes()
                .cmp(right.label().as_bytes())
                .then_with(|| left.id().cmp(&right.id())),
            Self::LabelDescending => right
                .label()
                .as_bytes()
                .cmp(left.label().as_bytes())
                .then_with(|| left.id().cmp(&right.id())),
        }
    }

    /// Sorts `collection` in place and renumbers its positions.
    pub fn apply<T: Labeled>(self, collection: &mut PositionedCollection<T>) {
        collection.sort_by(|left, right| self.compare(left, right));
    }

    /// Stable wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::IdAscending => "id_ascending",
            Self::IdDescending => "id_descending",
            Self::LabelAscending => "label_ascending",
            Self::LabelDescending => "label_descending",
        }
    }
}

impl Display for SortPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown sort policy name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSortPolicy(pub String);

impl Display for UnknownSortPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown sort policy `{}`; expected id_ascending|id_descending|label_ascending|label_descending",
            self.0
        )
    }
}

impl Error for UnknownSortPolicy {}

impl FromStr for SortPolicy {
    type Err = UnknownSortPolicy;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "id_ascending" | "id_asc" => Ok(Self::IdAscending),
            "id_descending" | "id_desc" => Ok(Self::IdDescending),
            "label_ascending" | "label_asc" => Ok(Self::LabelAscending),
            "label_descending" | "label_desc" => Ok(Self::LabelDescending),
            other => Err(UnknownSortPolicy(other.to_string())),
        }
    }
}
