use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::facts::{CandidateFact, Cluster, FactType};

/// Durable row in the relational system-of-record.
/// Identity: `(owner_id, cluster, normalized_value)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedPreference {
    pub id: i64,
    pub owner_id: String,
    pub cluster: Cluster,
    pub fact_type: FactType,
    pub normalized_value: String,
    pub label: String,
    /// True only when a human explicitly confirmed the fact.
    pub validated: bool,
    pub metadata: Map<String, Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-merge request for the system-of-record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceUpsert {
    pub owner_id: String,
    pub cluster: Cluster,
    pub fact_type: FactType,
    pub normalized_value: String,
    pub label: String,
    pub validated: bool,
    /// Allow a `validated = false` write to clear an existing `true`.
    pub allow_downgrade: bool,
    pub metadata: Map<String, Value>,
}

impl PreferenceUpsert {
    /// Metadata layering, later wins: extraction fields, backend metadata,
    /// caller extras.
    pub fn from_fact(
        owner_id: &str,
        fact: &CandidateFact,
        validated: bool,
        allow_downgrade: bool,
        extra: &Map<String, Value>,
    ) -> Self {
        let mut metadata = Map::new();
        metadata.insert("extractionType".to_string(), json!(fact.fact_type.slug()));
        metadata.insert("confidence".to_string(), json!(stored_confidence(fact.confidence)));
        metadata.insert("rawText".to_string(), json!(fact.raw_quote));
        if let Some(backend) = &fact.metadata {
            metadata.extend(backend.clone());
        }
        metadata.extend(extra.clone());

        let key = fact.content_key();
        Self {
            owner_id: owner_id.to_string(),
            cluster: fact.cluster(),
            fact_type: fact.fact_type,
            normalized_value: key.normalized_value,
            label: fact.label(),
            validated,
            allow_downgrade,
            metadata,
        }
    }
}

/// Three decimals, so `0.85` is written as `0.85` and not as the widened f32.
fn stored_confidence(confidence: f32) -> f64 {
    (f64::from(confidence) * 1000.0).round() / 1000.0
}

/// Narrative append for the semantic store. No identity, additive only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticNote {
    pub owner_id: String,
    pub fact_type: FactType,
    pub text: String,
}

impl SemanticNote {
    pub fn from_fact(owner_id: &str, fact: &CandidateFact) -> Self {
        Self {
            owner_id: owner_id.to_string(),
            fact_type: fact.fact_type,
            text: fact.narrative(),
        }
    }
}
