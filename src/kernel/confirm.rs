use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use super::router::Lane;
use super::scheduler::{SideEffect, TimerId, TimerQueue};
use super::time::Tick;
use crate::config::TimingConfig;
use crate::facts::{CandidateFact, ContentKey};

pub type ItemId = String;

/// Visible lifecycle states. Terminal outcomes are not states: the item is
/// removed from the list when it reaches one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemState {
    /// Waiting for the user, fades on its own.
    Soft,
    /// Reduced opacity, still cancelable, auto-saves on the next timeout.
    Fading,
    /// Waiting indefinitely for an explicit action.
    Hard,
    /// Committed as validated, shown briefly before removal.
    Confirmed,
}

/// How an item left the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    /// User acknowledged; committed with validated = true.
    Confirmed,
    /// Soft item timed out; committed with validated = false.
    AutoSaved,
    /// User dismissed; nothing written.
    Dismissed,
}

/// UI-facing copy of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemView {
    pub id: ItemId,
    pub fact: CandidateFact,
    pub state: ItemState,
    pub created_at: Tick,
    pub fade_at: Option<Tick>,
    /// 1.0 normally, 0.6 while fading.
    pub opacity: f32,
}

#[derive(Debug, Clone)]
struct ConfirmationItem {
    id: ItemId,
    fact: CandidateFact,
    key: ContentKey,
    state: ItemState,
    created_at: Tick,
    fade_at: Option<Tick>,
    timer: Option<TimerId>,
}

impl ConfirmationItem {
    fn view(&self) -> ItemView {
        ItemView {
            id: self.id.clone(),
            fact: self.fact.clone(),
            state: self.state,
            created_at: self.created_at,
            fade_at: self.fade_at,
            opacity: if self.state == ItemState::Fading { 0.6 } else { 1.0 },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TimerKind {
    StartFade,
    AutoSave,
    ClearConfirmed,
}

/// Per-session lifecycle manager for pending facts.
///
/// Invariants:
/// - at most one live item per content key
/// - every committed item emits exactly one `SideEffect::Commit`
/// - dismissed items emit none
pub struct ConfirmationMachine {
    soft_fade: Duration,
    auto_save: Duration,
    confirmed_display: Duration,
    items: HashMap<ItemId, ConfirmationItem>,
    /// Insertion order for stable UI listing.
    order: Vec<ItemId>,
    timers: TimerQueue<(ItemId, TimerKind)>,
}

impl ConfirmationMachine {
    pub fn new(timing: &TimingConfig) -> Self {
        Self {
            soft_fade: timing.soft_fade(),
            auto_save: timing.auto_save(),
            confirmed_display: timing.confirmed_display(),
            items: HashMap::new(),
            order: Vec::new(),
            timers: TimerQueue::new(),
        }
    }

    /// Entry point from the router.
    pub fn admit(&mut self, fact: CandidateFact, lane: Lane, now: Tick) -> Vec<SideEffect> {
        let state = match lane {
            Lane::Discard => return vec![],
            Lane::AutoCommit => {
                // Pseudo-state: committed on the spot, never listed.
                return vec![SideEffect::Commit { item_id: None, fact, validated: false }];
            }
            Lane::SoftConfirm => ItemState::Soft,
            Lane::HardConfirm => ItemState::Hard,
        };

        let key = fact.content_key();
        if self.items.values().any(|item| item.key == key) {
            debug!("suppressing duplicate pending fact {}", key);
            return vec![SideEffect::Suppressed { key }];
        }

        let id = Uuid::new_v4().to_string();
        let mut item = ConfirmationItem {
            id: id.clone(),
            fact,
            key,
            state,
            created_at: now,
            fade_at: None,
            timer: None,
        };

        if state == ItemState::Soft {
            let fade_at = now.after(self.soft_fade);
            item.fade_at = Some(fade_at);
            item.timer = Some(self.timers.schedule(fade_at, (id.clone(), TimerKind::StartFade)));
        }

        let view = item.view();
        self.items.insert(id.clone(), item);
        self.order.push(id);
        vec![SideEffect::ItemSurfaced(view)]
    }

    /// Explicit user acknowledgment. No-op for unknown or already confirmed items.
    pub fn confirm(&mut self, id: &str, now: Tick) -> Vec<SideEffect> {
        let Some(item) = self.items.get_mut(id) else {
            return vec![];
        };
        if item.state == ItemState::Confirmed {
            return vec![];
        }
        if let Some(timer) = item.timer.take() {
            self.timers.cancel(timer);
        }

        item.state = ItemState::Confirmed;
        item.fade_at = None;
        item.timer = Some(self.timers.schedule(
            now.after(self.confirmed_display),
            (item.id.clone(), TimerKind::ClearConfirmed),
        ));
        info!("confirmation item {} confirmed", item.id);

        vec![
            SideEffect::Commit { item_id: Some(item.id.clone()), fact: item.fact.clone(), validated: true },
            SideEffect::ItemUpdated(item.view()),
        ]
    }

    /// Explicit dismissal. Drops the item without any store write.
    /// A confirmed item is already committed and is left alone.
    pub fn dismiss(&mut self, id: &str, _now: Tick) -> Vec<SideEffect> {
        match self.items.get(id) {
            Some(item) if item.state != ItemState::Confirmed => {}
            _ => return vec![],
        }
        match self.remove(id) {
            Some(item) => {
                info!("confirmation item {} dismissed", item.id);
                vec![SideEffect::ItemRemoved { id: item.id, outcome: ItemOutcome::Dismissed }]
            }
            None => vec![],
        }
    }

    /// Fire every timer due at `now`, including ones scheduled by timers
    /// fired in this same call (a long gap can carry Soft -> Fading -> saved).
    pub fn advance(&mut self, now: Tick) -> Vec<SideEffect> {
        let mut effects = Vec::new();
        loop {
            let due = self.timers.pop_due(now);
            if due.is_empty() {
                break;
            }
            for (timer, (id, kind)) in due {
                self.fire(timer, id, kind, now, &mut effects);
            }
        }
        effects
    }

    fn fire(&mut self, timer: TimerId, id: ItemId, kind: TimerKind, now: Tick, effects: &mut Vec<SideEffect>) {
        let Some(item) = self.items.get_mut(&id) else {
            return;
        };
        // Stale timer: the item moved on under a different timer.
        if item.timer != Some(timer) {
            return;
        }
        item.timer = None;

        match (kind, item.state) {
            (TimerKind::StartFade, ItemState::Soft) => {
                item.state = ItemState::Fading;
                let deadline = item.fade_at.unwrap_or(now).after(self.auto_save);
                item.timer = Some(self.timers.schedule(deadline, (id.clone(), TimerKind::AutoSave)));
                effects.push(SideEffect::ItemUpdated(item.view()));
            }
            (TimerKind::AutoSave, ItemState::Fading) => {
                if let Some(item) = self.remove(&id) {
                    info!("confirmation item {} auto-saved", item.id);
                    effects.push(SideEffect::Commit {
                        item_id: Some(item.id.clone()),
                        fact: item.fact,
                        validated: false,
                    });
                    effects.push(SideEffect::ItemRemoved { id: item.id, outcome: ItemOutcome::AutoSaved });
                }
            }
            (TimerKind::ClearConfirmed, ItemState::Confirmed) => {
                if let Some(item) = self.remove(&id) {
                    effects.push(SideEffect::ItemRemoved { id: item.id, outcome: ItemOutcome::Confirmed });
                }
            }
            _ => {}
        }
    }

    fn remove(&mut self, id: &str) -> Option<ConfirmationItem> {
        let item = self.items.remove(id)?;
        if let Some(timer) = item.timer {
            self.timers.cancel(timer);
        }
        self.order.retain(|i| i != id);
        Some(item)
    }

    pub fn get(&self, id: &str) -> Option<ItemView> {
        self.items.get(id).map(|i| i.view())
    }

    /// Live items in arrival order.
    pub fn items(&self) -> Vec<ItemView> {
        self.order.iter().filter_map(|id| self.items.get(id)).map(|i| i.view()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Tick> {
        self.timers.next_deadline()
    }
}
