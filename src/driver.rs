use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::PipelineConfig;
use crate::kernel::event::SessionEvent;
use crate::kernel::scheduler::SideEffect;
use crate::kernel::session::Session;
use crate::kernel::telemetry::event::TelemetryEvent;
use crate::kernel::time::Tick;
use crate::memory::commit::{CommitReport, CommitRequest};
use crate::services::trigger::{PreferencePipeline, TriggerRequest};

/// Runs one `Session` against real time and real services.
///
/// The session itself never awaits. Everything async happens here: pipeline
/// calls are spawned and their results come back as events on a later tick.
pub struct SessionDriver {
    session: Session,
    pipeline: PreferencePipeline,
    owner_id: Option<String>,
    context_tag: String,
    tick: Duration,
    started: Instant,
    inbound: mpsc::Receiver<SessionEvent>,
    feedback_tx: mpsc::UnboundedSender<SessionEvent>,
    feedback_rx: mpsc::UnboundedReceiver<SessionEvent>,
    reports: Option<mpsc::UnboundedReceiver<CommitReport>>,
    observers: Vec<mpsc::UnboundedSender<SideEffect>>,
}

impl SessionDriver {
    /// Returns the driver and the sender used to feed it events.
    pub fn new(
        config: &PipelineConfig,
        pipeline: PreferencePipeline,
        owner_id: Option<String>,
    ) -> (Self, mpsc::Sender<SessionEvent>) {
        let (tx, inbound) = mpsc::channel(100);
        let (feedback_tx, feedback_rx) = mpsc::unbounded_channel();
        let driver = Self {
            session: Session::new(config),
            pipeline,
            owner_id,
            context_tag: "candidate".to_string(),
            tick: config.timing.tick(),
            started: Instant::now(),
            inbound,
            feedback_tx,
            feedback_rx,
            reports: None,
            observers: Vec::new(),
        };
        (driver, tx)
    }

    /// Store write outcomes to fold into session telemetry.
    pub fn with_reports(mut self, reports: mpsc::UnboundedReceiver<CommitReport>) -> Self {
        self.reports = Some(reports);
        self
    }

    /// Every effect the session produces is copied to the returned receiver.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<SideEffect> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.observers.push(tx);
        rx
    }

    pub fn now(&self) -> Tick {
        Tick::from_millis(self.started.elapsed().as_millis() as u64)
    }

    /// Main loop. Exits when `cancel` fires, after letting in-flight store
    /// writes finish.
    pub async fn run(mut self, cancel: CancellationToken) -> Session {
        let mut cadence = tokio::time::interval(self.tick);
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!("session driver active (tick {:?})", self.tick);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {
                    let now = self.now();
                    self.step(now);
                }
            }
        }

        self.pipeline.committer().drain().await;
        self.collect_reports();
        info!("session driver stopped with {} items pending", self.session.machine.len());
        self.session
    }

    /// One driver iteration at `now`: drain inputs, step the kernel, execute.
    pub fn step(&mut self, now: Tick) -> Vec<SideEffect> {
        // === 1. DRAIN ===
        let mut events = Vec::new();
        while let Ok(event) = self.inbound.try_recv() {
            events.push(event);
        }
        while let Ok(event) = self.feedback_rx.try_recv() {
            events.push(event);
        }
        self.collect_reports();

        // === 2. KERNEL STEP ===
        let effects = self.session.tick_step(now, events);

        // === 3. EXECUTE ===
        for effect in &effects {
            self.execute(effect);
        }
        self.observers.retain(|tx| effects.iter().all(|e| tx.send(e.clone()).is_ok()));

        effects
    }

    fn execute(&self, effect: &SideEffect) {
        match effect {
            SideEffect::RequestExtraction { transcript } => {
                let pipeline = self.pipeline.clone();
                let feedback = self.feedback_tx.clone();
                let transcript = transcript.clone();
                let mut request = TriggerRequest::new(transcript.clone());
                request.owner_id = self.owner_id.clone();
                request.context_tag = self.context_tag.clone();

                tokio::spawn(async move {
                    let response = pipeline.handle(request).await;
                    let event = if response.is_degraded() {
                        SessionEvent::ExtractionFailed { transcript, acknowledgment: response.acknowledgment }
                    } else {
                        SessionEvent::ExtractionCompleted {
                            transcript,
                            routed: response.routed_pending(),
                            acknowledgment: response.acknowledgment,
                        }
                    };
                    // Driver gone: the result has nowhere to go.
                    let _ = feedback.send(event);
                });
            }
            SideEffect::Commit { item_id, fact, validated } => match &self.owner_id {
                Some(owner) => {
                    let mut request = CommitRequest::new(owner.clone(), fact.clone(), *validated);
                    if let Some(id) = item_id {
                        request = request.with_extra("confirmationItemId", id.clone().into());
                    }
                    self.pipeline.committer().commit(request);
                }
                None => debug!("no owner, dropping commit for {}", fact.content_key()),
            },
            SideEffect::Acknowledge(text) => info!("ack: {}", text),
            SideEffect::ItemSurfaced(view) => {
                info!("pending {:?} {} [{}]", view.state, view.fact.label(), view.id)
            }
            SideEffect::ItemUpdated(view) => debug!("item {} now {:?}", view.id, view.state),
            SideEffect::ItemRemoved { id, outcome } => info!("item {} removed ({:?})", id, outcome),
            SideEffect::Suppressed { key } => debug!("suppressed duplicate {}", key),
        }
    }

    fn collect_reports(&mut self) {
        let Some(reports) = self.reports.as_mut() else {
            return;
        };
        while let Ok(report) = reports.try_recv() {
            self.session.telemetry.record(TelemetryEvent::StoreWrite {
                store: report.store(),
                ok: report.is_ok(),
            });
        }
    }
}
