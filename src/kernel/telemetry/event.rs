use serde::{Deserialize, Serialize};

use crate::kernel::confirm::{ItemOutcome, ItemState};
use crate::kernel::router::Lane;
use crate::memory::commit::StoreKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    ExtractionRequested,
    ExtractionCompleted { facts: usize },
    ExtractionFailed,
    FactRouted { lane: Lane },
    ItemSurfaced { state: ItemState },
    ItemResolved { outcome: ItemOutcome },
    DuplicateSuppressed,
    CommitIssued { validated: bool },
    StoreWrite { store: StoreKind, ok: bool },
}
