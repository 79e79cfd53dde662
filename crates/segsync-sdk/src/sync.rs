//! The sync cycle: fetch → reconcile → persist.

use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::http::{ApiClient, HttpMembershipSource, HttpNotifier};
use crate::source::{fetch_membership, MembershipSource};
use segsync_core::{DeliveryReport, MembershipSet, Notifier, Reconciler};
use segsync_store::{JsonFileStore, StateStore};
use std::sync::Arc;

/// What a completed cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// The segment came back empty and reconciliation was skipped.
    SkippedEmpty,
    /// Membership matched the record; nothing was sent or written.
    Unchanged { members: usize },
    /// Transitions were notified and the record was replaced.
    Applied(RunSummary),
}

/// Counts for a cycle that changed the record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunSummary {
    pub added: MembershipSet,
    pub removed: MembershipSet,
    pub members: usize,
    pub report: DeliveryReport,
}

/// Mirrors one segment into one persisted record.
///
/// A cycle runs sequentially on the caller's task. At most one process
/// should run against a given record at a time.
pub struct SegmentSync<S, N, St>
where
    S: MembershipSource,
    N: Notifier,
    St: StateStore,
{
    source: Arc<S>,
    reconciler: Reconciler<N>,
    store: Arc<St>,
    config: SyncConfig,
}

impl SegmentSync<HttpMembershipSource, HttpNotifier, JsonFileStore> {
    /// Wire the REST collaborators and the JSON file store from `config`.
    pub fn from_config(config: SyncConfig) -> Result<Self> {
        config.validate()?;
        let api = ApiClient::new(&config)?;
        let source = HttpMembershipSource::new(api.clone(), config.segment_id.clone());
        let notifier = HttpNotifier::new(api, config.metrics.clone());
        let store = JsonFileStore::new(config.state_path.clone());

        Ok(Self::new(
            Arc::new(source),
            Arc::new(notifier),
            Arc::new(store),
            config,
        ))
    }
}

impl<S, N, St> SegmentSync<S, N, St>
where
    S: MembershipSource,
    N: Notifier,
    St: StateStore,
{
    pub fn new(source: Arc<S>, notifier: Arc<N>, store: Arc<St>, config: SyncConfig) -> Self {
        let reconciler = Reconciler::new(notifier, config.segment_info());
        Self {
            source,
            reconciler,
            store,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<St> {
        &self.store
    }

    pub fn source(&self) -> &Arc<S> {
        &self.source
    }

    pub fn notifier(&self) -> &Arc<N> {
        self.reconciler.notifier()
    }

    /// Run one cycle.
    ///
    /// A fetch failure aborts before anything is sent or written. Delivery
    /// failures are logged per member and do not abort. A failed write of
    /// the record is returned as [`SyncError::Store`].
    pub async fn run_once(&self) -> Result<RunOutcome> {
        let segment_id = self.config.segment_id.as_str();
        tracing::info!(segment_id, "Fetching segment membership");

        let fetched = match fetch_membership(self.source.as_ref(), self.config.page_size).await {
            Ok(fetched) => fetched,
            Err(e) => {
                tracing::error!(segment_id, error = %e, "Failed to fetch segment membership");
                return Err(SyncError::Fetch(e));
            }
        };

        if fetched.is_empty() && !self.config.allow_empty_segment {
            tracing::warn!(segment_id, "No members fetched, skipping reconciliation");
            return Ok(RunOutcome::SkippedEmpty);
        }

        let prior = self.store.load();
        let reconciliation = self.reconciler.reconcile(&fetched, &prior).await;

        if !reconciliation.changed() {
            tracing::info!(segment_id, members = fetched.len(), "Membership unchanged");
            return Ok(RunOutcome::Unchanged {
                members: fetched.len(),
            });
        }

        self.store.save(&reconciliation.next)?;

        let report = reconciliation.report;
        tracing::info!(
            segment_id,
            added = reconciliation.delta.added.len(),
            removed = reconciliation.delta.removed.len(),
            failed = report.failures(),
            members = reconciliation.next.members.len(),
            "Sync cycle applied"
        );

        Ok(RunOutcome::Applied(RunSummary {
            members: reconciliation.next.members.len(),
            added: reconciliation.delta.added,
            removed: reconciliation.delta.removed,
            report,
        }))
    }
}
