use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::normalize;

/// Closed set of career facts the extractor may report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactType {
    Skill,
    Employer,
    RoleInterest,
    Location,
    Rate,
    Industry,
    Availability,
    /// Catch-all for anything the lookup does not recognise.
    Preference,
}

impl FactType {
    /// Fixed lookup from backend `entity_type` strings. Unknown types land in
    /// the catch-all.
    pub fn from_entity_type(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "skill" | "skills" => FactType::Skill,
            "company" | "employer" => FactType::Employer,
            "role" | "role_interest" => FactType::RoleInterest,
            "location" => FactType::Location,
            "day_rate" | "rate" => FactType::Rate,
            "industry" => FactType::Industry,
            "availability" => FactType::Availability,
            _ => FactType::Preference,
        }
    }

    pub fn slug(&self) -> &'static str {
        match self {
            FactType::Skill => "skill",
            FactType::Employer => "employer",
            FactType::RoleInterest => "role_interest",
            FactType::Location => "location",
            FactType::Rate => "rate",
            FactType::Industry => "industry",
            FactType::Availability => "availability",
            FactType::Preference => "preference",
        }
    }

    pub fn cluster(&self) -> Cluster {
        match self {
            FactType::Skill => Cluster::Skills,
            FactType::Employer => Cluster::Experience,
            FactType::RoleInterest => Cluster::CareerInterests,
            _ => Cluster::Preferences,
        }
    }

    /// Narrative template for the semantic store.
    pub fn narrate(&self, label: &str) -> String {
        match self {
            FactType::Skill => format!("User has {} skill", label),
            FactType::Employer => format!("User worked at {}", label),
            FactType::RoleInterest => format!("User is interested in {} roles", label),
            FactType::Location => format!("User prefers {} location", label),
            FactType::Rate => format!("User's day rate is {}", label),
            FactType::Industry => format!("User is interested in the {} industry", label),
            FactType::Availability => format!("User's availability is {}", label),
            FactType::Preference => format!("User mentioned: {}", label),
        }
    }
}

/// Coarse storage partition derived from the fact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cluster {
    Skills,
    Experience,
    CareerInterests,
    Preferences,
}

impl Cluster {
    pub fn as_str(&self) -> &'static str {
        match self {
            Cluster::Skills => "skills",
            Cluster::Experience => "experience",
            Cluster::CareerInterests => "career_interests",
            Cluster::Preferences => "preferences",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "skills" => Some(Cluster::Skills),
            "experience" => Some(Cluster::Experience),
            "career_interests" => Some(Cluster::CareerInterests),
            "preferences" => Some(Cluster::Preferences),
            _ => None,
        }
    }
}

impl fmt::Display for Cluster {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalized `(fact_type, values)` identity. Two facts with equal keys are
/// the same content regardless of when they were extracted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ContentKey {
    pub fact_type: FactType,
    pub normalized_value: String,
}

impl fmt::Display for ContentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.fact_type.slug(), self.normalized_value)
    }
}

/// An unconfirmed claim extracted from a transcript fragment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateFact {
    pub fact_type: FactType,
    pub values: Vec<String>,
    /// 0.0 to 1.0
    pub confidence: f32,
    pub raw_quote: String,
    /// Source contained "only", "must", "exclusively" or similar.
    pub strict: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
}

impl CandidateFact {
    pub fn new(fact_type: FactType, values: Vec<String>, confidence: f32, raw_quote: impl Into<String>) -> Self {
        Self {
            fact_type,
            values,
            confidence,
            raw_quote: raw_quote.into(),
            strict: false,
            metadata: None,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn cluster(&self) -> Cluster {
        self.fact_type.cluster()
    }

    pub fn content_key(&self) -> ContentKey {
        normalize::content_key(self.fact_type, &self.values)
    }

    /// Display form: trimmed values joined with ", ".
    pub fn label(&self) -> String {
        let parts: Vec<&str> = self.values.iter().map(|v| v.trim()).filter(|v| !v.is_empty()).collect();
        if parts.is_empty() {
            self.content_key().normalized_value
        } else {
            parts.join(", ")
        }
    }

    pub fn narrative(&self) -> String {
        self.fact_type.narrate(&self.label())
    }
}
