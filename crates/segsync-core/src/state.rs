//! The durable record of the last reconciled membership.

use crate::membership::{MembershipDelta, MembershipSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Membership as of the last successful reconciliation.
///
/// On disk:
///
/// ```json
/// {
///     "profiles": ["a@example.com", "b@example.com"],
///     "last_updated": "2025-01-15T09:30:00Z"
/// }
/// ```
///
/// `members` is stored under `profiles` so cache files written by earlier
/// tooling load unchanged; `members` is accepted as well. A record carrying
/// both keys loads their union.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "StoredRecord")]
pub struct PersistedState {
    #[serde(rename = "profiles")]
    pub members: MembershipSet,

    /// UTC time of the last mutation of `members`; `None` before the first run.
    pub last_updated: Option<DateTime<Utc>>,
}

/// On-disk shape accepted when reading a record.
#[derive(Deserialize)]
struct StoredRecord {
    #[serde(default)]
    profiles: MembershipSet,
    #[serde(default)]
    members: MembershipSet,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

impl From<StoredRecord> for PersistedState {
    fn from(record: StoredRecord) -> Self {
        let mut members = record.profiles;
        members.extend(record.members);
        Self {
            members,
            last_updated: record.last_updated,
        }
    }
}

impl PersistedState {
    pub fn new(members: MembershipSet, last_updated: Option<DateTime<Utc>>) -> Self {
        Self {
            members,
            last_updated,
        }
    }

    /// The state after applying `delta` at time `now`.
    ///
    /// An empty delta returns an identical state. `last_updated` never moves
    /// backwards, even if the wall clock does.
    pub fn transition(&self, delta: &MembershipDelta, now: DateTime<Utc>) -> PersistedState {
        if delta.is_empty() {
            return self.clone();
        }

        let last_updated = match self.last_updated {
            Some(prev) if prev > now => prev,
            _ => now,
        };

        PersistedState {
            members: self.members.apply(delta),
            last_updated: Some(last_updated),
        }
    }
}
