//! The notification seam: delivering lifecycle events for one member.

use crate::event::{EventKind, NotificationContext};
use crate::identity::Identity;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashSet;
use thiserror::Error;

/// Why a single lifecycle event could not be delivered.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Event rejected with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Delivers a lifecycle event for one member.
///
/// Delivery is best-effort and independent per identity. Implementations do
/// not retry; the caller decides what a failure means.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        identity: &Identity,
        kind: EventKind,
        ctx: &NotificationContext,
    ) -> Result<(), NotifyError>;
}

/// One recorded delivery attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryAttempt {
    pub identity: Identity,
    pub kind: EventKind,
    pub segment_id: String,
}

/// In-memory notifier for testing and simulation.
///
/// Records every attempt; identities listed via [`RecordingNotifier::fail_for`]
/// are recorded and then rejected.
#[derive(Default)]
pub struct RecordingNotifier {
    attempts: RwLock<Vec<DeliveryAttempt>>,
    failing: RwLock<HashSet<Identity>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every delivery for `identity` fail.
    pub fn fail_for(&self, identity: impl Into<Identity>) {
        self.failing.write().insert(identity.into());
    }

    pub fn attempts(&self) -> Vec<DeliveryAttempt> {
        self.attempts.read().clone()
    }

    pub fn attempts_of(&self, kind: EventKind) -> Vec<Identity> {
        self.attempts
            .read()
            .iter()
            .filter(|a| a.kind == kind)
            .map(|a| a.identity.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.attempts.write().clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        identity: &Identity,
        kind: EventKind,
        ctx: &NotificationContext,
    ) -> Result<(), NotifyError> {
        self.attempts.write().push(DeliveryAttempt {
            identity: identity.clone(),
            kind,
            segment_id: ctx.segment_id.clone(),
        });

        if self.failing.read().contains(identity) {
            return Err(NotifyError::Rejected {
                status: 500,
                body: "simulated failure".to_string(),
            });
        }
        Ok(())
    }
}
