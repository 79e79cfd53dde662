//! In-memory record for testing and simulation.

use crate::error::{Result, StoreError};
use crate::StateStore;
use parking_lot::RwLock;
use segsync_core::PersistedState;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Keeps the record in memory and counts writes.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<Option<PersistedState>>,
    saves: AtomicUsize,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `state`.
    pub fn with_state(state: PersistedState) -> Self {
        Self {
            state: RwLock::new(Some(state)),
            ..Default::default()
        }
    }

    /// Number of successful `save` calls.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    /// Make subsequent writes fail (or succeed again).
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// The stored record, if one was ever written or seeded.
    pub fn snapshot(&self) -> Option<PersistedState> {
        self.state.read().clone()
    }
}

impl StateStore for MemoryStore {
    fn load(&self) -> PersistedState {
        match self.state.read().as_ref() {
            Some(state) => state.clone(),
            None => {
                tracing::warn!("No stored record, starting from an empty record");
                PersistedState::default()
            }
        }
    }

    fn save(&self, state: &PersistedState) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::WriteRejected("memory store is read-only".to_string()));
        }
        *self.state.write() = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use segsync_core::{Identity, MembershipSet};

    #[test]
    fn test_empty_store_loads_default() {
        let store = MemoryStore::new();
        assert_eq!(store.load(), PersistedState::default());
        assert!(store.snapshot().is_none());
    }

    #[test]
    fn test_save_and_reload() {
        let store = MemoryStore::new();
        let members: MembershipSet = [Identity::from("a")].into_iter().collect();
        let state = PersistedState::new(members, None);

        store.save(&state).unwrap();

        assert_eq!(store.load(), state);
        assert_eq!(store.save_count(), 1);
    }

    #[test]
    fn test_failing_writes_surface() {
        let store = MemoryStore::with_state(PersistedState::default());
        store.fail_writes(true);

        assert!(matches!(
            store.save(&PersistedState::default()),
            Err(StoreError::WriteRejected(_))
        ));
        assert_eq!(store.save_count(), 0);
    }
}
