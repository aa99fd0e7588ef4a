use std::time::Duration;
use tracing::debug;

use super::event::{TranscriptSource, TranscriptUpdate, UpdateKind};
use super::scheduler::{TimerId, TimerQueue};
use super::time::Tick;

/// Coalesces bursts of transcript updates into one extraction call.
///
/// Each update restarts a single quiet-period timer. When it expires the
/// combined transcript is released exactly once. Voice and typed input keep
/// separate buffers and are joined with a newline. Fragments append to their
/// buffer; snapshots (a speech engine's running transcript) replace it.
#[derive(Debug)]
pub struct Debouncer {
    quiet_period: Duration,
    voice: String,
    typed: String,
    timers: TimerQueue<()>,
    pending: Option<TimerId>,
    last_extracted: Option<String>,
}

impl Debouncer {
    pub fn new(quiet_period: Duration) -> Self {
        Self {
            quiet_period,
            voice: String::new(),
            typed: String::new(),
            timers: TimerQueue::new(),
            pending: None,
            last_extracted: None,
        }
    }

    /// Apply an update and restart the quiet-period timer.
    pub fn record(&mut self, update: &TranscriptUpdate, now: Tick) {
        let text = update.text.trim();
        let buffer = match update.source {
            TranscriptSource::Voice => &mut self.voice,
            TranscriptSource::Typed => &mut self.typed,
        };
        match update.kind {
            UpdateKind::Fragment => {
                if text.is_empty() {
                    return;
                }
                if !buffer.is_empty() {
                    buffer.push(' ');
                }
                buffer.push_str(text);
            }
            UpdateKind::Snapshot => {
                buffer.clear();
                buffer.push_str(text);
            }
        }

        if let Some(id) = self.pending.take() {
            self.timers.cancel(id);
        }
        self.pending = Some(self.timers.schedule(now.after(self.quiet_period), ()));
    }

    /// Combined transcript so far.
    pub fn transcript(&self) -> String {
        [self.voice.as_str(), self.typed.as_str()]
            .iter()
            .filter(|s| !s.is_empty())
            .copied()
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Returns the transcript to extract if the quiet period has elapsed.
    /// Skips the call when nothing changed since the last successful extraction.
    pub fn poll(&mut self, now: Tick) -> Option<String> {
        if self.timers.pop_due(now).is_empty() {
            return None;
        }
        self.pending = None;

        let transcript = self.transcript();
        if transcript.is_empty() || self.last_extracted.as_deref() == Some(transcript.as_str()) {
            debug!("debounce fired with unchanged transcript, skipping extraction");
            return None;
        }
        Some(transcript)
    }

    pub fn mark_extracted(&mut self, transcript: &str) {
        self.last_extracted = Some(transcript.to_string());
    }

    pub fn is_waiting(&self) -> bool {
        self.pending.map(|id| self.timers.is_pending(id)).unwrap_or(false)
    }

    pub fn deadline(&self) -> Option<Tick> {
        self.timers.next_deadline()
    }
}
