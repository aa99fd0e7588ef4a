use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::types::{PersistedPreference, PreferenceUpsert, SemanticNote};
use crate::error::StoreError;
use crate::facts::Cluster;

/// Best-effort narrative context store. Append only.
#[async_trait]
pub trait SemanticStore: Send + Sync {
    /// Make sure the owner exists before the first append. Stores without a
    /// notion of owners accept everything.
    async fn ensure_owner(&self, _owner_id: &str) -> Result<(), StoreError> {
        Ok(())
    }

    async fn append(&self, note: &SemanticNote) -> Result<(), StoreError>;
}

/// Authoritative system-of-record with upsert-by-identity semantics.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Insert, or merge into the existing row with the same
    /// `(owner, cluster, normalized_value)`. Atomic per row.
    async fn upsert(&self, record: &PreferenceUpsert) -> Result<PersistedPreference, StoreError>;

    async fn list(&self, owner_id: &str) -> Result<Vec<PersistedPreference>, StoreError>;

    async fn list_grouped(&self, owner_id: &str) -> Result<BTreeMap<Cluster, Vec<PersistedPreference>>, StoreError> {
        let mut grouped: BTreeMap<Cluster, Vec<PersistedPreference>> = BTreeMap::new();
        for pref in self.list(owner_id).await? {
            grouped.entry(pref.cluster).or_default().push(pref);
        }
        Ok(grouped)
    }
}

/// Process-local semantic store, used when no endpoint is configured.
#[derive(Debug, Default)]
pub struct InMemorySemanticStore {
    notes: Mutex<Vec<SemanticNote>>,
}

impl InMemorySemanticStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notes_for(&self, owner_id: &str) -> Vec<SemanticNote> {
        match self.notes.lock() {
            Ok(notes) => notes.iter().filter(|n| n.owner_id == owner_id).cloned().collect(),
            Err(_) => Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.notes.lock().map(|n| n.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SemanticStore for InMemorySemanticStore {
    async fn append(&self, note: &SemanticNote) -> Result<(), StoreError> {
        let mut notes = self.notes.lock().map_err(|_| StoreError::LockPoisoned)?;
        notes.push(note.clone());
        Ok(())
    }
}
