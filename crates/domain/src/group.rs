//! Light groups and the targets a message can address.
//!
//! On the wire a group is a small integer where `0` means "every group".
//! That sentinel is decoded exactly once into [`GroupTarget`] so that service
//! logic only ever handles a concrete [`GroupId`].

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Number of groups a controller drives when nothing else is configured.
pub const DEFAULT_GROUP_COUNT: u8 = 4;

/// Wire value addressing every group at once.
pub const ALL_GROUPS: u8 = 0;

/// Identifier of one addressable light group, always in `1..=count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u8);

impl GroupId {
    /// Validate a raw id against the configured group count.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::GroupOutOfRange`] when `id` is `0` or
    /// greater than `count`.
    pub fn new(id: u8, count: u8) -> Result<Self, ValidationError> {
        if id == ALL_GROUPS || id > count {
            return Err(ValidationError::GroupOutOfRange { id, count });
        }
        Ok(Self(id))
    }

    /// Every group id from `1` to `count`, in ascending order.
    pub fn all(count: u8) -> impl Iterator<Item = Self> {
        (1..=count).map(Self)
    }

    /// The raw wire value.
    #[must_use]
    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// What a command or timer request is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupTarget {
    /// Fan out to every configured group.
    All,
    /// A single group.
    Single(GroupId),
}

impl GroupTarget {
    /// Decode the wire value, where `0` means every group.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::GroupOutOfRange`] when a non-zero id is
    /// greater than `count`.
    pub fn decode(raw: u8, count: u8) -> Result<Self, ValidationError> {
        if raw == ALL_GROUPS {
            return Ok(Self::All);
        }
        GroupId::new(raw, count).map(Self::Single)
    }

    /// Expand the target into the concrete groups it covers.
    #[must_use]
    pub fn groups(self, count: u8) -> Vec<GroupId> {
        match self {
            Self::All => GroupId::all(count).collect(),
            Self::Single(id) => vec![id],
        }
    }

    /// Encode back to the wire value.
    #[must_use]
    pub fn to_wire(self) -> u8 {
        match self {
            Self::All => ALL_GROUPS,
            Self::Single(id) => id.get(),
        }
    }
}

impl fmt::Display for GroupTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Single(id) => id.fmt(f),
        }
    }
}
