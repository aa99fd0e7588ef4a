use std::collections::VecDeque;

use super::event::TelemetryEvent;
use crate::kernel::confirm::ItemOutcome;
use crate::kernel::router::Lane;
use crate::memory::commit::StoreKind;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TelemetrySnapshot {
    pub extraction: ExtractionStats,
    pub routing: RoutingStats,
    pub items: ItemStats,
    pub storage: StorageStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionStats {
    pub requested: u64,
    pub completed: u64,
    pub failed: u64,
    pub facts: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingStats {
    pub auto_commit: u64,
    pub soft_confirm: u64,
    pub hard_confirm: u64,
    pub discard: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemStats {
    pub surfaced: u64,
    pub confirmed: u64,
    pub auto_saved: u64,
    pub dismissed: u64,
    pub suppressed: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageStats {
    pub commits_validated: u64,
    pub commits_unvalidated: u64,
    pub semantic_ok: u64,
    pub semantic_failed: u64,
    pub relational_ok: u64,
    pub relational_failed: u64,
}

impl StorageStats {
    /// The one failure class worth alerting on.
    pub fn failed_writes(&self) -> u64 {
        self.semantic_failed + self.relational_failed
    }
}

/// Pure fold over the event buffer.
pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::ExtractionRequested => snap.extraction.requested += 1,
            TelemetryEvent::ExtractionCompleted { facts } => {
                snap.extraction.completed += 1;
                snap.extraction.facts += *facts as u64;
            }
            TelemetryEvent::ExtractionFailed => snap.extraction.failed += 1,
            TelemetryEvent::FactRouted { lane } => match lane {
                Lane::AutoCommit => snap.routing.auto_commit += 1,
                Lane::SoftConfirm => snap.routing.soft_confirm += 1,
                Lane::HardConfirm => snap.routing.hard_confirm += 1,
                Lane::Discard => snap.routing.discard += 1,
            },
            TelemetryEvent::ItemSurfaced { .. } => snap.items.surfaced += 1,
            TelemetryEvent::ItemResolved { outcome } => match outcome {
                ItemOutcome::Confirmed => snap.items.confirmed += 1,
                ItemOutcome::AutoSaved => snap.items.auto_saved += 1,
                ItemOutcome::Dismissed => snap.items.dismissed += 1,
            },
            TelemetryEvent::DuplicateSuppressed => snap.items.suppressed += 1,
            TelemetryEvent::CommitIssued { validated } => {
                if *validated {
                    snap.storage.commits_validated += 1;
                } else {
                    snap.storage.commits_unvalidated += 1;
                }
            }
            TelemetryEvent::StoreWrite { store, ok } => match (store, ok) {
                (StoreKind::Semantic, true) => snap.storage.semantic_ok += 1,
                (StoreKind::Semantic, false) => snap.storage.semantic_failed += 1,
                (StoreKind::Relational, true) => snap.storage.relational_ok += 1,
                (StoreKind::Relational, false) => snap.storage.relational_failed += 1,
            },
        }
    }

    snap
}
