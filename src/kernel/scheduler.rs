use std::collections::{BTreeMap, HashMap};

use super::confirm::{ItemId, ItemOutcome, ItemView};
use super::time::Tick;
use crate::facts::{CandidateFact, ContentKey};

/// Effects produced by the pure kernel. The driver executes them.
/// Invariant: nothing in the kernel performs I/O; every store write leaves
/// the kernel as a `Commit`.
#[derive(Debug, Clone, PartialEq)]
pub enum SideEffect {
    /// Run the extraction pipeline over the combined transcript.
    RequestExtraction { transcript: String },
    /// Hand an accepted fact to the dual-store commit.
    Commit {
        item_id: Option<ItemId>,
        fact: CandidateFact,
        validated: bool,
    },
    /// A new confirmation item became visible.
    ItemSurfaced(ItemView),
    /// A visible item changed state (e.g. Soft -> Fading).
    ItemUpdated(ItemView),
    /// An item left the list.
    ItemRemoved { id: ItemId, outcome: ItemOutcome },
    /// A re-extraction of content that is already live was dropped.
    Suppressed { key: ContentKey },
    /// Text to speak/show back to the user.
    Acknowledge(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerId(u64);

/// Deadline-ordered set of cancelable one-shot timers.
///
/// Cancelled timers are removed from the queue, so a cancelled timer can never
/// fire later. Cancelling twice, or cancelling a timer that already fired, is a
/// no-op.
#[derive(Debug)]
pub struct TimerQueue<T> {
    next_id: u64,
    queue: BTreeMap<(Tick, TimerId), T>,
    deadlines: HashMap<TimerId, Tick>,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            queue: BTreeMap::new(),
            deadlines: HashMap::new(),
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at: Tick, payload: T) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.queue.insert((at, id), payload);
        self.deadlines.insert(id, at);
        id
    }

    /// Returns true only if the timer was still pending.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.deadlines.remove(&id) {
            Some(at) => self.queue.remove(&(at, id)).is_some(),
            None => false,
        }
    }

    pub fn is_pending(&self, id: TimerId) -> bool {
        self.deadlines.contains_key(&id)
    }

    pub fn next_deadline(&self) -> Option<Tick> {
        self.queue.keys().next().map(|(at, _)| *at)
    }

    /// Pop every timer due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: Tick) -> Vec<(TimerId, T)> {
        let mut fired = Vec::new();
        while let Some(entry) = self.queue.first_entry() {
            let (at, id) = *entry.key();
            if at > now {
                break;
            }
            let payload = entry.remove();
            self.deadlines.remove(&id);
            fired.push((id, payload));
        }
        fired
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
