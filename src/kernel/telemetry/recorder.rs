use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};

/// Session-length bound. A long conversation keeps its most recent events.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Bounded window of content-free pipeline events for one session.
#[derive(Debug)]
pub struct TelemetryRecorder {
    window: VecDeque<TelemetryEvent>,
    capacity: usize,
    evicted: u64,
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self { window: VecDeque::with_capacity(capacity.min(DEFAULT_CAPACITY)), capacity, evicted: 0 }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        while self.window.len() >= self.capacity {
            self.window.pop_front();
            self.evicted += 1;
        }
        self.window.push_back(event);
    }

    /// Aggregate over the retained window only.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.window)
    }

    /// Events that fell out of the window; a non-zero value means the
    /// snapshot undercounts.
    pub fn evicted(&self) -> u64 {
        self.evicted
    }
}
