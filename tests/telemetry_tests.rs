use repo_capture::kernel::confirm::{ItemOutcome, ItemState};
use repo_capture::kernel::router::Lane;
use repo_capture::kernel::telemetry::event::TelemetryEvent;
use repo_capture::kernel::telemetry::recorder::TelemetryRecorder;
use repo_capture::memory::commit::StoreKind;

#[test]
fn test_snapshot_counts_by_category() {
    let mut recorder = TelemetryRecorder::new();
    recorder.record(TelemetryEvent::ExtractionRequested);
    recorder.record(TelemetryEvent::ExtractionCompleted { facts: 3 });
    recorder.record(TelemetryEvent::FactRouted { lane: Lane::AutoCommit });
    recorder.record(TelemetryEvent::FactRouted { lane: Lane::HardConfirm });
    recorder.record(TelemetryEvent::FactRouted { lane: Lane::Discard });
    recorder.record(TelemetryEvent::ItemSurfaced { state: ItemState::Hard });
    recorder.record(TelemetryEvent::ItemResolved { outcome: ItemOutcome::Dismissed });
    recorder.record(TelemetryEvent::CommitIssued { validated: false });
    recorder.record(TelemetryEvent::StoreWrite { store: StoreKind::Semantic, ok: false });
    recorder.record(TelemetryEvent::StoreWrite { store: StoreKind::Relational, ok: true });

    let snap = recorder.snapshot();
    assert_eq!(snap.extraction.requested, 1);
    assert_eq!(snap.extraction.facts, 3);
    assert_eq!(snap.routing.auto_commit, 1);
    assert_eq!(snap.routing.hard_confirm, 1);
    assert_eq!(snap.routing.discard, 1);
    assert_eq!(snap.items.surfaced, 1);
    assert_eq!(snap.items.dismissed, 1);
    assert_eq!(snap.storage.commits_unvalidated, 1);
    assert_eq!(snap.storage.semantic_failed, 1);
    assert_eq!(snap.storage.relational_ok, 1);
    assert_eq!(snap.storage.failed_writes(), 1);
}

#[test]
fn test_window_is_bounded() {
    let mut recorder = TelemetryRecorder::new();
    for _ in 0..10_050 {
        recorder.record(TelemetryEvent::ExtractionRequested);
    }
    assert_eq!(recorder.snapshot().extraction.requested, 10_000);
    assert_eq!(recorder.evicted(), 50);
}

#[test]
fn test_small_window_keeps_latest_events() {
    let mut recorder = TelemetryRecorder::with_capacity(2);
    recorder.record(TelemetryEvent::ExtractionRequested);
    recorder.record(TelemetryEvent::ExtractionFailed);
    recorder.record(TelemetryEvent::ExtractionFailed);

    let snap = recorder.snapshot();
    assert_eq!(snap.extraction.requested, 0);
    assert_eq!(snap.extraction.failed, 2);
    assert_eq!(recorder.evicted(), 1);
}
