use tracing::debug;

use super::confirm::{ConfirmationMachine, ItemView};
use super::debounce::Debouncer;
use super::event::SessionEvent;
use super::scheduler::SideEffect;
use super::telemetry::event::TelemetryEvent;
use super::telemetry::recorder::TelemetryRecorder;
use super::time::Tick;
use crate::config::{PipelineConfig, RoutingThresholds};

/// One conversation's client-side core: debounced trigger plus confirmation
/// list. Single-threaded; owned by exactly one driver.
pub struct Session {
    pub routing: RoutingThresholds,
    pub debouncer: Debouncer,
    pub machine: ConfirmationMachine,
    pub telemetry: TelemetryRecorder,
    pub now: Tick,
}

impl Session {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            routing: config.routing,
            debouncer: Debouncer::new(config.timing.debounce_quiet()),
            machine: ConfirmationMachine::new(&config.timing),
            telemetry: TelemetryRecorder::new(),
            now: Tick::ZERO,
        }
    }

    /// Pure step: apply events at `now`, fire due timers, return effects.
    /// MUST NOT await I/O. Time never runs backwards.
    pub fn tick_step(&mut self, now: Tick, events: Vec<SessionEvent>) -> Vec<SideEffect> {
        self.now = self.now.max(now);
        let now = self.now;
        let mut effects = Vec::new();

        // === 1. INGEST ===
        for event in events {
            match event {
                SessionEvent::Transcript(update) => {
                    self.debouncer.record(&update, now);
                }
                SessionEvent::ExtractionCompleted { transcript, acknowledgment, routed } => {
                    self.debouncer.mark_extracted(&transcript);
                    self.telemetry.record(TelemetryEvent::ExtractionCompleted { facts: routed.len() });
                    effects.push(SideEffect::Acknowledge(acknowledgment));

                    for routed_fact in routed {
                        self.telemetry.record(TelemetryEvent::FactRouted { lane: routed_fact.lane });
                        effects.extend(self.machine.admit(routed_fact.fact, routed_fact.lane, now));
                    }
                }
                SessionEvent::ExtractionFailed { transcript, acknowledgment } => {
                    debug!("extraction failed for {} chars of transcript", transcript.len());
                    self.telemetry.record(TelemetryEvent::ExtractionFailed);
                    effects.push(SideEffect::Acknowledge(acknowledgment));
                }
                SessionEvent::Confirm(id) => effects.extend(self.machine.confirm(&id, now)),
                SessionEvent::Dismiss(id) => effects.extend(self.machine.dismiss(&id, now)),
            }
        }

        // === 2. TIMERS ===
        effects.extend(self.machine.advance(now));

        // === 3. DEBOUNCE ===
        if let Some(transcript) = self.debouncer.poll(now) {
            self.telemetry.record(TelemetryEvent::ExtractionRequested);
            effects.push(SideEffect::RequestExtraction { transcript });
        }

        // === 4. OBSERVE ===
        for effect in &effects {
            self.observe(effect);
        }

        effects
    }

    fn observe(&mut self, effect: &SideEffect) {
        let event = match effect {
            SideEffect::ItemSurfaced(view) => TelemetryEvent::ItemSurfaced { state: view.state },
            SideEffect::ItemRemoved { outcome, .. } => TelemetryEvent::ItemResolved { outcome: *outcome },
            SideEffect::Suppressed { .. } => TelemetryEvent::DuplicateSuppressed,
            SideEffect::Commit { validated, .. } => TelemetryEvent::CommitIssued { validated: *validated },
            _ => return,
        };
        self.telemetry.record(event);
    }

    pub fn pending(&self) -> Vec<ItemView> {
        self.machine.items()
    }
}
