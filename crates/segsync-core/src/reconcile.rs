//! Reconciliation: diff the fetched membership against the persisted record,
//! notify every transition, and derive the next record.
//!
//! # Algorithm
//!
//! ```text
//! added   = fetched − prior.members      → notify(joined) for each
//! removed = prior.members − fetched      → notify(left)   for each
//! next    = prior.members ∪ added − removed
//! stamp   = now  iff added ∪ removed ≠ ∅
//! ```
//!
//! A failed delivery is logged and counted but never retried, and the
//! identity still moves in the next record: the record mirrors the segment,
//! not the notification history.

use crate::event::{EventKind, NotificationContext, SegmentInfo};
use crate::membership::{MembershipDelta, MembershipSet};
use crate::notifier::Notifier;
use crate::state::PersistedState;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Delivery outcome counts for one reconciliation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub joined_sent: usize,
    pub joined_failed: usize,
    pub left_sent: usize,
    pub left_failed: usize,
}

impl DeliveryReport {
    fn record(&mut self, kind: EventKind, delivered: bool) {
        match (kind, delivered) {
            (EventKind::Joined, true) => self.joined_sent += 1,
            (EventKind::Joined, false) => self.joined_failed += 1,
            (EventKind::Left, true) => self.left_sent += 1,
            (EventKind::Left, false) => self.left_failed += 1,
        }
    }

    pub fn attempts(&self) -> usize {
        self.joined_sent + self.joined_failed + self.left_sent + self.left_failed
    }

    pub fn failures(&self) -> usize {
        self.joined_failed + self.left_failed
    }
}

/// Result of reconciling one fetched snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Reconciliation {
    pub delta: MembershipDelta,
    pub next: PersistedState,
    pub report: DeliveryReport,
}

impl Reconciliation {
    /// Whether the record changed and must be written back.
    pub fn changed(&self) -> bool {
        !self.delta.is_empty()
    }
}

/// Drives notifications for membership transitions of a single segment.
pub struct Reconciler<N: Notifier> {
    notifier: Arc<N>,
    segment: SegmentInfo,
}

impl<N: Notifier> Reconciler<N> {
    pub fn new(notifier: Arc<N>, segment: SegmentInfo) -> Self {
        Self { notifier, segment }
    }

    pub fn segment(&self) -> &SegmentInfo {
        &self.segment
    }

    pub fn notifier(&self) -> &Arc<N> {
        &self.notifier
    }

    /// Reconcile `fetched` against `prior`, stamping changes with the current time.
    pub async fn reconcile(
        &self,
        fetched: &MembershipSet,
        prior: &PersistedState,
    ) -> Reconciliation {
        self.reconcile_at(fetched, prior, Utc::now()).await
    }

    /// Reconcile with an explicit mutation timestamp.
    pub async fn reconcile_at(
        &self,
        fetched: &MembershipSet,
        prior: &PersistedState,
        now: DateTime<Utc>,
    ) -> Reconciliation {
        let delta = MembershipDelta::between(&prior.members, fetched);
        let mut report = DeliveryReport::default();

        if delta.added.is_empty() {
            tracing::info!(segment_id = %self.segment.id, "No new members to add");
        } else {
            tracing::info!(
                segment_id = %self.segment.id,
                count = delta.added.len(),
                "New members joined"
            );
            self.deliver_all(&delta.added, EventKind::Joined, &mut report)
                .await;
        }

        if delta.removed.is_empty() {
            tracing::info!(segment_id = %self.segment.id, "No stale members to remove");
        } else {
            tracing::info!(
                segment_id = %self.segment.id,
                count = delta.removed.len(),
                "Stale members left"
            );
            self.deliver_all(&delta.removed, EventKind::Left, &mut report)
                .await;
        }

        let next = prior.transition(&delta, now);

        Reconciliation {
            delta,
            next,
            report,
        }
    }

    async fn deliver_all(
        &self,
        identities: &MembershipSet,
        kind: EventKind,
        report: &mut DeliveryReport,
    ) {
        for identity in identities {
            let ctx = NotificationContext::for_segment(&self.segment, Utc::now());
            match self.notifier.notify(identity, kind, &ctx).await {
                Ok(()) => {
                    tracing::debug!(%identity, %kind, "Lifecycle event delivered");
                    report.record(kind, true);
                }
                Err(e) => {
                    tracing::error!(
                        %identity,
                        %kind,
                        error = %e,
                        "Failed to deliver lifecycle event"
                    );
                    report.record(kind, false);
                }
            }
        }
    }
}
