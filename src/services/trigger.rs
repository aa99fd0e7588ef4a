use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{PipelineConfig, RoutingThresholds};
use crate::facts::CandidateFact;
use crate::kernel::router::{Lane, RoutedFact};
use crate::memory::commit::{CommitRequest, DualStoreCommit};
use crate::services::llm::ExtractionClient;

pub const ACK_TOO_SHORT: &str = "I'll keep that in mind.";
pub const ACK_NOTHING_FOUND: &str = "Got it, tell me more.";
pub const ACK_DEGRADED: &str = "I'll remember that. Keep going.";
pub const ACK_CONTINUE: &str = "Got it, continue.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRequest {
    pub transcript_fragment: String,
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default = "default_context_tag")]
    pub context_tag: String,
    #[serde(default)]
    pub hints: Vec<String>,
}

fn default_context_tag() -> String {
    "candidate".to_string()
}

impl TriggerRequest {
    pub fn new(fragment: impl Into<String>) -> Self {
        Self {
            transcript_fragment: fragment.into(),
            owner_id: None,
            context_tag: default_context_tag(),
            hints: Vec::new(),
        }
    }

    pub fn owner(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingConfirmation {
    pub fact: CandidateFact,
    pub lane: Lane,
    pub reasoning: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerStats {
    pub extracted: usize,
    pub auto_added: usize,
    pub needs_confirmation: usize,
    pub discarded: usize,
    pub processing_time_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerResponse {
    /// Short text a voice agent can speak back.
    pub acknowledgment: String,
    pub committed_facts: Vec<CandidateFact>,
    pub pending_confirmations: Vec<PendingConfirmation>,
    pub stats: TriggerStats,
    /// Set when extraction degraded; the acknowledgment is still usable.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TriggerResponse {
    fn empty(acknowledgment: &str, started: Instant) -> Self {
        Self {
            acknowledgment: acknowledgment.to_string(),
            committed_facts: Vec::new(),
            pending_confirmations: Vec::new(),
            stats: TriggerStats {
                processing_time_ms: started.elapsed().as_millis() as u64,
                ..TriggerStats::default()
            },
            error: None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.error.is_some()
    }

    /// Pending confirmations with their lane, ready for a session.
    pub fn routed_pending(&self) -> Vec<RoutedFact> {
        self.pending_confirmations
            .iter()
            .map(|p| RoutedFact { fact: p.fact.clone(), lane: p.lane })
            .collect()
    }
}

/// Extraction, routing and auto-commit for one inbound fragment.
#[derive(Clone)]
pub struct PreferencePipeline {
    extractor: ExtractionClient,
    committer: DualStoreCommit,
    routing: RoutingThresholds,
    min_fragment_chars: usize,
}

impl PreferencePipeline {
    pub fn new(extractor: ExtractionClient, committer: DualStoreCommit, config: &PipelineConfig) -> Self {
        Self {
            extractor,
            committer,
            routing: config.routing,
            min_fragment_chars: config.extraction.min_fragment_chars,
        }
    }

    pub fn committer(&self) -> &DualStoreCommit {
        &self.committer
    }

    /// Never fails. Store writes for auto-committed facts are spawned, not
    /// awaited.
    pub async fn handle(&self, request: TriggerRequest) -> TriggerResponse {
        let started = Instant::now();
        let fragment = request.transcript_fragment.trim();

        if fragment.chars().count() < self.min_fragment_chars {
            debug!("fragment below {} chars, skipping extraction", self.min_fragment_chars);
            return TriggerResponse::empty(ACK_TOO_SHORT, started);
        }

        let facts = match self.extractor.extract(fragment, &request.context_tag, &request.hints).await {
            Ok(facts) => facts,
            Err(e) => {
                warn!("extraction failed: {}", e);
                let mut response = TriggerResponse::empty(ACK_DEGRADED, started);
                response.error = Some(e.to_string());
                return response;
            }
        };

        if facts.is_empty() {
            return TriggerResponse::empty(ACK_NOTHING_FOUND, started);
        }

        let owner_id = request.owner_id.as_deref().filter(|o| !o.is_empty());
        if let Some(owner) = owner_id {
            self.committer.ensure_owner(owner);
        }

        let extracted = facts.len();
        let mut committed = Vec::new();
        let mut pending = Vec::new();
        let mut discarded = 0;

        for fact in facts {
            let routed = RoutedFact::new(fact, &self.routing);
            match routed.lane {
                Lane::AutoCommit => {
                    if let Some(owner) = owner_id {
                        self.committer.commit(CommitRequest::new(owner, routed.fact.clone(), false));
                    }
                    committed.push(routed.fact);
                }
                Lane::SoftConfirm | Lane::HardConfirm => {
                    let reasoning = reasoning_for(&routed.fact, routed.lane);
                    pending.push(PendingConfirmation { fact: routed.fact, lane: routed.lane, reasoning });
                }
                Lane::Discard => {
                    debug!("discarding low confidence {} ({:.2})", routed.fact.fact_type.slug(), routed.fact.confidence);
                    discarded += 1;
                }
            }
        }

        let stats = TriggerStats {
            extracted,
            auto_added: committed.len(),
            needs_confirmation: pending.len(),
            discarded,
            processing_time_ms: started.elapsed().as_millis() as u64,
        };
        info!(
            "trigger handled in {}ms: extracted={} auto_added={} needs_confirmation={}",
            stats.processing_time_ms, stats.extracted, stats.auto_added, stats.needs_confirmation
        );

        TriggerResponse {
            acknowledgment: acknowledgment(&committed, pending.len()),
            committed_facts: committed,
            pending_confirmations: pending,
            stats,
            error: None,
        }
    }
}

/// "I've noted a, b, c and N more. " for commits, then a nudge to check the
/// screen when anything is pending.
pub fn acknowledgment(committed: &[CandidateFact], pending: usize) -> String {
    let mut text = String::new();

    if !committed.is_empty() {
        let labels: Vec<String> = committed.iter().take(3).map(|f| f.label()).collect();
        text.push_str(&format!("I've noted {}", labels.join(", ")));
        if committed.len() > 3 {
            text.push_str(&format!(" and {} more", committed.len() - 3));
        }
        text.push_str(". ");
    }

    if pending > 0 {
        let what = if pending == 1 { "something" } else { "a few things" };
        text.push_str(&format!("Please check the screen to confirm {} I picked up.", what));
    }

    if text.is_empty() {
        return ACK_CONTINUE.to_string();
    }
    text
}

pub fn reasoning_for(fact: &CandidateFact, lane: Lane) -> String {
    match lane {
        Lane::HardConfirm => {
            let quote: String = fact.raw_quote.chars().take(50).collect();
            format!("You said \"{}...\" - confirming this is a strict requirement", quote)
        }
        _ => format!(
            "Detected \"{}\" ({}% confidence) - please verify",
            fact.label(),
            (fact.confidence * 100.0).round() as u32
        ),
    }
}
