//! Membership sets and the delta between two snapshots of a segment.
//!
//! A [`MembershipSet`] is the full set of members observed at one point in
//! time. Diffing a freshly fetched set against the previously persisted one
//! yields a [`MembershipDelta`]:
//!
//! ```text
//! added   = fetched − prior
//! removed = prior   − fetched
//! prior.apply(delta) == fetched
//! ```

use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unordered set of members, duplicates collapsed.
///
/// Backed by a `BTreeSet` so iteration (and therefore the on-disk record and
/// log output) is stable. Callers must not rely on notification order.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MembershipSet {
    members: BTreeSet<Identity>,
}

impl MembershipSet {
    pub fn new() -> Self {
        Self {
            members: BTreeSet::new(),
        }
    }

    /// Add a member. Returns `false` if it was already present.
    pub fn insert(&mut self, identity: Identity) -> bool {
        self.members.insert(identity)
    }

    pub fn remove(&mut self, identity: &Identity) -> bool {
        self.members.remove(identity)
    }

    pub fn contains(&self, identity: &Identity) -> bool {
        self.members.contains(identity)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Identity> {
        self.members.iter()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members of `self` that are not in `other`.
    pub fn difference(&self, other: &MembershipSet) -> MembershipSet {
        self.members.difference(&other.members).cloned().collect()
    }

    /// Members present in both sets.
    pub fn intersection(&self, other: &MembershipSet) -> MembershipSet {
        self.members.intersection(&other.members).cloned().collect()
    }

    /// Apply a delta: `self ∪ added − removed`.
    pub fn apply(&self, delta: &MembershipDelta) -> MembershipSet {
        let mut next = self.clone();
        for identity in delta.added.iter() {
            next.insert(identity.clone());
        }
        for identity in delta.removed.iter() {
            next.remove(identity);
        }
        next
    }
}

impl FromIterator<Identity> for MembershipSet {
    fn from_iter<I: IntoIterator<Item = Identity>>(iter: I) -> Self {
        Self {
            members: iter.into_iter().collect(),
        }
    }
}

impl Extend<Identity> for MembershipSet {
    fn extend<I: IntoIterator<Item = Identity>>(&mut self, iter: I) {
        self.members.extend(iter);
    }
}

impl IntoIterator for MembershipSet {
    type Item = Identity;
    type IntoIter = std::collections::btree_set::IntoIter<Identity>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.into_iter()
    }
}

impl<'a> IntoIterator for &'a MembershipSet {
    type Item = &'a Identity;
    type IntoIter = std::collections::btree_set::Iter<'a, Identity>;

    fn into_iter(self) -> Self::IntoIter {
        self.members.iter()
    }
}

/// Who joined and who left between two snapshots.
///
/// `added` and `removed` are always disjoint.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MembershipDelta {
    pub added: MembershipSet,
    pub removed: MembershipSet,
}

impl MembershipDelta {
    /// Diff a freshly fetched set against the prior snapshot.
    pub fn between(prior: &MembershipSet, fetched: &MembershipSet) -> Self {
        Self {
            added: fetched.difference(prior),
            removed: prior.difference(fetched),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }

    /// Total number of membership transitions.
    pub fn len(&self) -> usize {
        self.added.len() + self.removed.len()
    }
}
