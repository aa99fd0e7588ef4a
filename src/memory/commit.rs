use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::task::TaskTracker;
use tracing::{debug, error};

use super::store::{PreferenceStore, SemanticStore};
use super::types::{PreferenceUpsert, SemanticNote};
use crate::facts::{CandidateFact, ContentKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreKind {
    Semantic,
    Relational,
}

/// Outcome of one store write, delivered after the fact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CommitReport {
    Written { store: StoreKind, key: ContentKey },
    Failed { store: StoreKind, key: ContentKey, error: String },
}

impl CommitReport {
    pub fn store(&self) -> StoreKind {
        match self {
            CommitReport::Written { store, .. } | CommitReport::Failed { store, .. } => *store,
        }
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, CommitReport::Written { .. })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub owner_id: String,
    pub fact: CandidateFact,
    pub validated: bool,
    pub allow_downgrade: bool,
    pub extra: Map<String, Value>,
}

impl CommitRequest {
    pub fn new(owner_id: impl Into<String>, fact: CandidateFact, validated: bool) -> Self {
        Self {
            owner_id: owner_id.into(),
            fact,
            validated,
            allow_downgrade: false,
            extra: Map::new(),
        }
    }

    pub fn allow_downgrade(mut self, allow: bool) -> Self {
        self.allow_downgrade = allow;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Fans one fact out to both stores.
///
/// Invariants:
/// - `commit` never blocks and never reports failure to the caller
/// - the two writes are independent: one failing does not stop the other
/// - no cross-store atomicity, no retry (at-least-once via idempotent upsert)
#[derive(Clone)]
pub struct DualStoreCommit {
    semantic: Arc<dyn SemanticStore>,
    preferences: Arc<dyn PreferenceStore>,
    reports: Option<mpsc::UnboundedSender<CommitReport>>,
    tracker: TaskTracker,
}

impl DualStoreCommit {
    pub fn new(semantic: Arc<dyn SemanticStore>, preferences: Arc<dyn PreferenceStore>) -> Self {
        Self {
            semantic,
            preferences,
            reports: None,
            tracker: TaskTracker::new(),
        }
    }

    /// Same as `new`, plus a channel carrying one report per store write.
    pub fn with_reports(
        semantic: Arc<dyn SemanticStore>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> (Self, mpsc::UnboundedReceiver<CommitReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut commit = Self::new(semantic, preferences);
        commit.reports = Some(tx);
        (commit, rx)
    }

    /// Fire-and-forget. Must be called from within a tokio runtime.
    pub fn commit(&self, request: CommitRequest) {
        let key = request.fact.content_key();
        debug!("committing {} (validated={})", key, request.validated);

        let note = SemanticNote::from_fact(&request.owner_id, &request.fact);
        let semantic = Arc::clone(&self.semantic);
        let reports = self.reports.clone();
        let semantic_key = key.clone();
        self.tracker.spawn(async move {
            let report = match semantic.append(&note).await {
                Ok(()) => CommitReport::Written { store: StoreKind::Semantic, key: semantic_key },
                Err(e) => {
                    error!("semantic write failed for {}: {}", semantic_key, e);
                    CommitReport::Failed { store: StoreKind::Semantic, key: semantic_key, error: e.to_string() }
                }
            };
            send_report(&reports, report);
        });

        let upsert = PreferenceUpsert::from_fact(
            &request.owner_id,
            &request.fact,
            request.validated,
            request.allow_downgrade,
            &request.extra,
        );
        let preferences = Arc::clone(&self.preferences);
        let reports = self.reports.clone();
        self.tracker.spawn(async move {
            let report = match preferences.upsert(&upsert).await {
                Ok(_) => CommitReport::Written { store: StoreKind::Relational, key },
                Err(e) => {
                    error!("relational write failed for {}: {}", key, e);
                    CommitReport::Failed { store: StoreKind::Relational, key, error: e.to_string() }
                }
            };
            send_report(&reports, report);
        });
    }

    /// Fire-and-forget owner provisioning on the semantic side.
    pub fn ensure_owner(&self, owner_id: &str) {
        let semantic = Arc::clone(&self.semantic);
        let owner_id = owner_id.to_string();
        self.tracker.spawn(async move {
            if let Err(e) = semantic.ensure_owner(&owner_id).await {
                error!("could not ensure semantic owner {}: {}", owner_id, e);
            }
        });
    }

    /// Wait for every write spawned so far. The committer stays usable.
    pub async fn drain(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Writes still in flight.
    pub fn pending(&self) -> usize {
        self.tracker.len()
    }
}

fn send_report(reports: &Option<mpsc::UnboundedSender<CommitReport>>, report: CommitReport) {
    if let Some(tx) = reports {
        // Receiver gone means nobody is listening any more.
        let _ = tx.send(report);
    }
}
