use serde::{Deserialize, Serialize};

use crate::config::RoutingThresholds;
use crate::facts::CandidateFact;

/// Routing outcome for a candidate fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Lane {
    /// Trusted immediately, committed unvalidated, never shown as pending.
    AutoCommit,
    /// Shown, auto-saves unvalidated after a timeout.
    SoftConfirm,
    /// Shown until the user explicitly acts.
    HardConfirm,
    /// Never surfaced, never persisted.
    Discard,
}

impl Lane {
    pub fn is_pending(&self) -> bool {
        matches!(self, Lane::SoftConfirm | Lane::HardConfirm)
    }
}

/// PURE FUNCTION: (fact, thresholds) -> lane. First match wins:
/// 1. strict marker -> HardConfirm, whatever the confidence
/// 2. confidence >= auto_commit -> AutoCommit
/// 3. confidence >= soft_confirm -> SoftConfirm
/// 4. Discard
pub fn route(fact: &CandidateFact, thresholds: &RoutingThresholds) -> Lane {
    if fact.strict {
        return Lane::HardConfirm;
    }
    if fact.confidence >= thresholds.auto_commit {
        return Lane::AutoCommit;
    }
    if fact.confidence >= thresholds.soft_confirm {
        return Lane::SoftConfirm;
    }
    // NaN lands here too.
    Lane::Discard
}

/// A fact together with the lane the router assigned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutedFact {
    pub fact: CandidateFact,
    pub lane: Lane,
}

impl RoutedFact {
    pub fn new(fact: CandidateFact, thresholds: &RoutingThresholds) -> Self {
        let lane = route(&fact, thresholds);
        Self { fact, lane }
    }
}
