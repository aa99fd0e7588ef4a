use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use super::parse::parse_candidates;
use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::facts::CandidateFact;

/// Raw text completion. Implementations only move bytes; all decoding lives
/// in the extraction client.
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError>;
}

/// llama-server `/completion` endpoint.
#[derive(Clone)]
pub struct LlamaCompletionBackend {
    client: Client,
    base_url: String,
    n_predict: usize,
    temperature: f32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    prompt: &'a str,
    stream: bool,
    n_predict: usize,
    temperature: f32,
    stop: Vec<String>,
}

#[derive(Deserialize)]
struct CompletionResponse {
    content: String,
}

impl LlamaCompletionBackend {
    pub fn new(config: &ExtractionConfig) -> Self {
        Self {
            client: Client::builder()
                .timeout(config.timeout()) // network-level bound
                .build()
                .unwrap_or_default(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            n_predict: config.n_predict,
            temperature: config.temperature,
        }
    }
}

#[async_trait]
impl InferenceBackend for LlamaCompletionBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        let request_body = CompletionRequest {
            prompt,
            stream: false,
            n_predict: self.n_predict,
            temperature: self.temperature,
            stop: vec!["User:".to_string(), "Transcript:".to_string()],
        };

        let response = self
            .client
            .post(format!("{}/completion", self.base_url))
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ExtractionError::Backend(response.status()));
        }

        let resp_json: CompletionResponse = response.json().await?;
        Ok(resp_json.content)
    }
}

/// Turns one transcript fragment into candidate facts.
#[derive(Clone)]
pub struct ExtractionClient {
    backend: Arc<dyn InferenceBackend>,
    config: ExtractionConfig,
}

impl ExtractionClient {
    pub fn new(backend: Arc<dyn InferenceBackend>, config: ExtractionConfig) -> Self {
        Self { backend, config }
    }

    pub fn llama(config: ExtractionConfig) -> Self {
        let backend = Arc::new(LlamaCompletionBackend::new(&config));
        Self::new(backend, config)
    }

    /// Only transport failures are errors. Malformed output is zero facts.
    pub async fn extract(
        &self,
        fragment: &str,
        context_tag: &str,
        hints: &[String],
    ) -> Result<Vec<CandidateFact>, ExtractionError> {
        let prompt = build_prompt(fragment, context_tag, hints);
        let timeout = self.config.timeout();

        let text = match tokio::time::timeout(timeout, self.backend.complete(&prompt)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("extraction timed out after {:?}", timeout);
                return Err(ExtractionError::Timeout(timeout));
            }
        };

        let facts = parse_candidates(&text, fragment, self.config.default_confidence);
        debug!("extracted {} candidate facts", facts.len());
        Ok(facts)
    }
}

pub fn build_prompt(fragment: &str, context_tag: &str, hints: &[String]) -> String {
    let hints_line = if hints.is_empty() {
        String::new()
    } else {
        format!("Hints: {}\n", hints.join(", "))
    };

    format!(
        "Extract career entities from this transcript. Return JSON array.\n\
         \n\
         Transcript: \"{fragment}\"\n\
         User type: {context_tag}\n\
         {hints_line}\
         \n\
         For each entity found, return:\n\
         {{\n  \
           \"entity_type\": \"skill\" | \"company\" | \"role\" | \"location\" | \"day_rate\" | \"industry\" | \"availability\" | \"preference\",\n  \
           \"value\": \"extracted value\",\n  \
           \"confidence\": 0.0-1.0,\n  \
           \"raw_text\": \"quote from transcript\",\n  \
           \"requires_hard_validation\": true if user said \"only\", \"must\", \"exclusively\"\n\
         }}\n\
         \n\
         Only extract clear, specific entities. Skip vague statements.\n\
         Return empty array [] if nothing concrete found.\n\
         Return ONLY valid JSON array, no markdown or explanation.\n"
    )
}
