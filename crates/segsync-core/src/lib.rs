//! Segsync core - membership diffing and reconciliation
//!
//! Mirrors the membership of a remote audience segment into a local record
//! and emits a lifecycle event for every member who joined or left since the
//! previous run.
//!
//! - [`identity`] - opaque, case-sensitive member keys
//! - [`membership`] - membership sets and the delta between two snapshots
//! - [`state`] - the persisted record and its transition rule
//! - [`event`] - lifecycle event kinds and notification context
//! - [`notifier`] - the delivery seam
//! - [`reconcile`] - the reconciler that ties them together

pub mod event;
pub mod identity;
pub mod membership;
pub mod notifier;
pub mod reconcile;
pub mod state;

pub use event::{EventKind, MetricNames, NotificationContext, SegmentInfo};
pub use identity::Identity;
pub use membership::{MembershipDelta, MembershipSet};
pub use notifier::{DeliveryAttempt, Notifier, NotifyError, RecordingNotifier};
pub use reconcile::{DeliveryReport, Reconciler, Reconciliation};
pub use state::PersistedState;
