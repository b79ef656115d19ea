use std::{
    collections::HashSet,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use crate::{
    gateway::ports::BanStore,
    ledger::types::ProviderId,
    reputation::types::{ReputationEntry, ResetOutcome},
};

#[derive(Debug, Default)]
struct ReputationInner {
    entries: Vec<ReputationEntry>,
    index: HashSet<ProviderId>,
}

/// Persistent ban-list of providers excluded from future admission. Entries
/// are written through the `BanStore` port before they become visible, so a
/// ban that returned `Ok` survives a restart.
pub struct ReputationStore {
    store: Arc<dyn BanStore>,
    inner: RwLock<ReputationInner>,
}

impl ReputationStore {
    pub fn new(store: Arc<dyn BanStore>) -> Self {
        Self {
            store,
            inner: RwLock::new(ReputationInner::default()),
        }
    }

    /// Rebuilds the in-memory set from the ban table.
    pub fn recover(store: Arc<dyn BanStore>) -> Result<Self, crate::gateway::error::ReconcileError> {
        let persisted = store.load()?;
        let reputation = Self::new(store);
        {
            let mut inner = reputation.write_inner();
            for entry in persisted {
                if inner.index.insert(entry.provider_id.clone()) {
                    inner.entries.push(entry);
                }
            }
        }
        Ok(reputation)
    }

    pub fn is_banned(&self, provider_id: &str) -> bool {
        self.read_inner().index.contains(provider_id)
    }

    /// Idempotent: the first ban wins and a duplicate is a no-op. A
    /// persistence failure propagates; a ban that silently fails to persist
    /// would leave a malicious provider admissible after restart.
    pub fn ban(&self, entry: ReputationEntry) -> Result<(), crate::gateway::error::ReconcileError> {
        let mut inner = self.write_inner();
        if inner.index.contains(&entry.provider_id) {
            tracing::debug!(
                target: "reputation",
                provider_id = %entry.provider_id,
                "provider already banned"
            );
            return Ok(());
        }

        self.store.append(&entry)?;
        tracing::warn!(
            target: "reputation",
            provider_id = %entry.provider_id,
            provider_name = %entry.provider_name,
            reason = %entry.reason,
            "provider banned"
        );
        inner.index.insert(entry.provider_id.clone());
        inner.entries.push(entry);
        Ok(())
    }

    /// Insertion-ordered view of all banned providers.
    pub fn list(&self) -> Vec<ReputationEntry> {
        self.read_inner().entries.clone()
    }

    pub fn count(&self) -> usize {
        self.read_inner().entries.len()
    }

    /// Administrative bulk reset. Distinguishes "nothing to reset" so the
    /// operator surface can report it without treating it as a change.
    pub fn reset(&self) -> Result<ResetOutcome, crate::gateway::error::ReconcileError> {
        let mut inner = self.write_inner();
        if inner.entries.is_empty() {
            tracing::info!(target: "reputation", "no banned providers to reset");
            return Ok(ResetOutcome::NothingToReset);
        }

        self.store.clear()?;
        let removed = inner.entries.len();
        inner.entries.clear();
        inner.index.clear();
        tracing::info!(target: "reputation", removed, "banned providers reset");
        Ok(ResetOutcome::Cleared { removed })
    }

    fn read_inner(&self) -> RwLockReadGuard<'_, ReputationInner> {
        match self.inner.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write_inner(&self) -> RwLockWriteGuard<'_, ReputationInner> {
        match self.inner.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
