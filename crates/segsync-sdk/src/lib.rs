//! Segsync SDK - keep a local record of a marketing segment and announce
//! every member who joins or leaves it
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use segsync_sdk::{SegmentSync, SyncConfig};
//!
//! # async fn run() -> segsync_sdk::Result<()> {
//! let config = SyncConfig::from_env()?;
//! let sync = SegmentSync::from_config(config)?;
//! let outcome = sync.run_once().await?;
//! println!("{:?}", outcome);
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - [`source`] - paged membership sources and the lazy page stream
//! - [`http`] - REST implementations of the source and the notifier
//! - [`config`] - explicit configuration, builder and environment loading
//! - [`sync`] - the fetch → reconcile → persist cycle
//! - [`error`] - error types

pub mod config;
pub mod error;
pub mod http;
pub mod source;
pub mod sync;

// Re-exports for convenience
pub use config::{SyncConfig, SyncConfigBuilder};
pub use error::{ConfigError, Result, SourceError, SyncError};
pub use http::{ApiClient, HttpMembershipSource, HttpNotifier};
pub use source::{fetch_membership, pages, MemorySource, MembershipSource, Page, PageCursor};
pub use sync::{RunOutcome, RunSummary, SegmentSync};

pub use segsync_core::{
    DeliveryReport, EventKind, Identity, MembershipSet, Notifier, NotifyError, PersistedState,
    RecordingNotifier,
};
pub use segsync_store::{JsonFileStore, MemoryStore, StateStore, StoreError};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::SyncConfig;
    pub use crate::error::SyncError;
    pub use crate::source::MembershipSource;
    pub use crate::sync::{RunOutcome, SegmentSync};
    pub use segsync_core::{Identity, MembershipSet, Notifier};
    pub use segsync_store::StateStore;
}
