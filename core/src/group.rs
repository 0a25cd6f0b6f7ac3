use std::collections::BTreeSet;
use std::fmt;

use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// Group identity: the founding piece id plus a generation that is never
/// reused within a puzzle, so an id captured before a merge stops resolving
/// once its group is absorbed.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
pub struct GroupId {
    pub anchor: u32,
    pub generation: u32,
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.anchor, self.generation)
    }
}

/// Canonical member list of a connected cluster. Always holds two or more
/// pieces.
#[derive(Clone, Debug, PartialEq)]
pub struct Group {
    id: GroupId,
    members: BTreeSet<usize>,
}

impl Group {
    pub(crate) fn pair(id: GroupId, first: usize, second: usize) -> Self {
        let mut members = BTreeSet::new();
        members.insert(first);
        members.insert(second);
        Self { id, members }
    }

    pub(crate) fn from_members(id: GroupId, members: BTreeSet<usize>) -> Self {
        Self { id, members }
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, piece: usize) -> bool {
        self.members.contains(&piece)
    }

    pub fn members(&self) -> impl Iterator<Item = usize> + '_ {
        self.members.iter().copied()
    }

    /// Returns false when the piece was already a member.
    pub(crate) fn insert(&mut self, piece: usize) -> bool {
        self.members.insert(piece)
    }

    pub(crate) fn into_members(self) -> BTreeSet<usize> {
        self.members
    }
}
