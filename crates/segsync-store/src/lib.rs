//! Segsync store - the durable membership record
//!
//! Holds exactly one [`PersistedState`] per segment. Reads are forgiving:
//! a missing, unreadable or malformed record loads as the empty default and
//! logs a warning. Writes replace the whole record atomically and surface
//! every failure.

pub mod error;
pub mod file;
pub mod memory;

pub use error::{Result, StoreError};
pub use file::JsonFileStore;
pub use memory::MemoryStore;

use segsync_core::PersistedState;

/// Load/replace access to the single persisted record.
pub trait StateStore: Send + Sync {
    /// Read the record, falling back to [`PersistedState::default`].
    fn load(&self) -> PersistedState;

    /// Replace the record with `state`.
    fn save(&self, state: &PersistedState) -> Result<()>;
}
