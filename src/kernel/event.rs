use serde::{Deserialize, Serialize};

use super::confirm::ItemId;
use super::router::RoutedFact;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    Voice,
    Typed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    /// New words to append.
    Fragment,
    /// Full running transcript for the source; replaces what came before.
    Snapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptUpdate {
    pub source: TranscriptSource,
    pub kind: UpdateKind,
    pub text: String,
}

impl TranscriptUpdate {
    pub fn fragment(source: TranscriptSource, text: &str) -> Self {
        Self { source, kind: UpdateKind::Fragment, text: text.to_string() }
    }

    pub fn snapshot(source: TranscriptSource, text: &str) -> Self {
        Self { source, kind: UpdateKind::Snapshot, text: text.to_string() }
    }

    pub fn typed(text: &str) -> Self {
        Self::fragment(TranscriptSource::Typed, text)
    }

    pub fn voice(text: &str) -> Self {
        Self::fragment(TranscriptSource::Voice, text)
    }
}

/// Everything that can happen to a session. Applied in order by `Session::tick_step`.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Transcript(TranscriptUpdate),
    /// The pipeline answered for `transcript`. `routed` holds the facts the
    /// session still has to handle (pending lanes, or all lanes when routing
    /// happens client side).
    ExtractionCompleted {
        transcript: String,
        acknowledgment: String,
        routed: Vec<RoutedFact>,
    },
    /// Transport failure. The turn is still acknowledged.
    ExtractionFailed { transcript: String, acknowledgment: String },
    Confirm(ItemId),
    Dismiss(ItemId),
}
