use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, warn};

use super::store::SemanticStore;
use super::types::SemanticNote;
use crate::error::StoreError;

/// Graph-memory service reached over HTTP.
///
/// Notes are posted as plain text episodes; the service does its own entity
/// extraction. Owners are created lazily.
pub struct HttpSemanticStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpSemanticStore {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_default();
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let request = self.client.post(format!("{}{}", self.base_url, path));
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Api-Key {}", key)),
            None => request,
        }
    }
}

#[async_trait]
impl SemanticStore for HttpSemanticStore {
    async fn ensure_owner(&self, owner_id: &str) -> Result<(), StoreError> {
        let response = self.post("/api/v2/users").json(&json!({ "user_id": owner_id })).send().await?;

        match response.status() {
            status if status.is_success() => {
                debug!("semantic owner {} created", owner_id);
                Ok(())
            }
            // Already exists.
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT => Ok(()),
            status => {
                warn!("semantic owner {} could not be ensured: {}", owner_id, status);
                Err(StoreError::Status(status.as_u16()))
            }
        }
    }

    async fn append(&self, note: &SemanticNote) -> Result<(), StoreError> {
        let body = json!({
            "user_id": note.owner_id,
            "type": "text",
            "data": note.text,
        });
        let response = self.post("/api/v2/graph").json(&body).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Status(status.as_u16()));
        }
        Ok(())
    }
}
