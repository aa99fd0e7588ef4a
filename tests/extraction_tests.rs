use async_trait::async_trait;
use reqwest::StatusCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use repo_capture::config::ExtractionConfig;
use repo_capture::error::ExtractionError;
use repo_capture::facts::FactType;
use repo_capture::services::llm::{ExtractionClient, InferenceBackend};

/// Replays a canned completion and remembers the prompt it was given.
struct StubBackend {
    reply: Result<String, StatusCode>,
    delay: Duration,
    prompts: Mutex<Vec<String>>,
}

impl StubBackend {
    fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self { reply: Ok(text.to_string()), delay: Duration::ZERO, prompts: Mutex::new(Vec::new()) })
    }

    fn failing(status: StatusCode) -> Arc<Self> {
        Arc::new(Self { reply: Err(status), delay: Duration::ZERO, prompts: Mutex::new(Vec::new()) })
    }

    fn slow(text: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self { reply: Ok(text.to_string()), delay, prompts: Mutex::new(Vec::new()) })
    }
}

#[async_trait]
impl InferenceBackend for StubBackend {
    async fn complete(&self, prompt: &str) -> Result<String, ExtractionError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.reply.clone().map_err(ExtractionError::Backend)
    }
}

fn client(backend: Arc<StubBackend>) -> ExtractionClient {
    ExtractionClient::new(backend, ExtractionConfig::default())
}

#[tokio::test]
async fn test_prose_wrapped_payload_is_parsed() {
    let reply = r#"Here is what I found:
```json
[
  {"entity_type": "skill", "value": "Python", "confidence": 0.92, "raw_text": "I use Python daily", "requires_hard_validation": false},
  {"entity_type": "company", "value": "Acme Ltd", "confidence": 0.7, "raw_text": "I was at Acme"}
]
```
Let me know if you need more."#;
    let backend = StubBackend::replying(reply);
    let facts = client(backend.clone()).extract("I use Python daily, I was at Acme", "candidate", &[]).await.unwrap();

    assert_eq!(facts.len(), 2);
    assert_eq!(facts[0].fact_type, FactType::Skill);
    assert_eq!(facts[0].values, vec!["Python".to_string()]);
    assert!((facts[0].confidence - 0.92).abs() < 1e-6);
    assert_eq!(facts[1].fact_type, FactType::Employer);
    assert_eq!(facts[1].raw_quote, "I was at Acme");

    let prompts = backend.prompts.lock().unwrap();
    assert!(prompts[0].contains("Transcript: \"I use Python daily, I was at Acme\""));
    assert!(prompts[0].contains("User type: candidate"));
}

#[tokio::test]
async fn test_garbage_yields_zero_facts_not_errors() {
    for reply in ["", "I couldn't find anything.", "[{\"entity_type\": \"skill\", \"value\": ", "{\"value\": \"x\"}", "[]"] {
        let facts = client(StubBackend::replying(reply)).extract("some fragment", "candidate", &[]).await.unwrap();
        assert!(facts.is_empty(), "reply {:?} should give no facts", reply);
    }
}

#[tokio::test]
async fn test_missing_confidence_defaults_and_quote_falls_back() {
    let reply = r#"[{"entity_type": "day_rate", "value": "£650"}]"#;
    let facts = client(StubBackend::replying(reply)).extract("my rate is £650 a day", "candidate", &[]).await.unwrap();

    assert_eq!(facts.len(), 1);
    assert_eq!(facts[0].fact_type, FactType::Rate);
    assert!((facts[0].confidence - 0.7).abs() < 1e-6);
    assert_eq!(facts[0].raw_quote, "my rate is £650 a day");
}

#[tokio::test]
async fn test_strict_statement_is_flagged() {
    let reply = r#"[{"entity_type": "location", "value": "remote", "confidence": 0.85,
                     "raw_text": "I only want remote", "requires_hard_validation": true}]"#;
    let facts = client(StubBackend::replying(reply)).extract("I only want remote", "candidate", &[]).await.unwrap();

    assert_eq!(facts.len(), 1);
    assert!(facts[0].strict);
    assert_eq!(facts[0].fact_type, FactType::Location);
}

#[tokio::test]
async fn test_unknown_entity_type_lands_in_catch_all() {
    let reply = r#"[{"entity_type": "hobby", "value": "climbing", "confidence": "high"}]"#;
    let facts = client(StubBackend::replying(reply)).extract("I like climbing", "candidate", &[]).await.unwrap();

    assert_eq!(facts[0].fact_type, FactType::Preference);
    assert!((facts[0].confidence - 0.9).abs() < 1e-6);
}

#[tokio::test]
async fn test_transport_failure_is_an_error() {
    let result = client(StubBackend::failing(StatusCode::BAD_GATEWAY)).extract("I know Rust", "candidate", &[]).await;
    assert!(matches!(result, Err(ExtractionError::Backend(StatusCode::BAD_GATEWAY))));
}

#[tokio::test(start_paused = true)]
async fn test_slow_backend_times_out() {
    let backend = StubBackend::slow("[]", Duration::from_secs(10));
    let result = client(backend).extract("I know Rust", "candidate", &[]).await;

    match result {
        Err(ExtractionError::Timeout(after)) => assert_eq!(after, Duration::from_millis(2000)),
        other => panic!("expected timeout, got {:?}", other),
    }
}

#[tokio::test]
async fn test_hints_reach_the_prompt() {
    let backend = StubBackend::replying("[]");
    let hints = vec!["fintech".to_string(), "contract".to_string()];
    client(backend.clone()).extract("looking for contract work", "candidate", &hints).await.unwrap();

    assert!(backend.prompts.lock().unwrap()[0].contains("Hints: fintech, contract"));
}
