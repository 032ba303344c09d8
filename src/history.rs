//! Chat history collaborator
//!
//! History is seeded once from the dashboard's HTTP endpoint and can be
//! cleared server-side. The session only consumes the entries; it never
//! writes history back.

use crate::session::Side;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// One stored exchange line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub side: Side,
    #[serde(default)]
    pub brain: Option<String>,
    pub content: String,
    pub knowledge_base: String,
}

#[derive(Debug, Deserialize)]
struct HistoryResponse {
    #[serde(default)]
    result: Vec<HistoryEntry>,
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("history endpoint returned status {0}")]
    Status(u16),
}

/// Source of previously stored conversation lines
#[async_trait]
pub trait HistoryClient: Send + Sync {
    /// Fetch stored entries in display order
    async fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError>;

    /// Ask the backend to forget stored history
    async fn clear(&self) -> Result<(), HistoryError>;
}

#[async_trait]
impl<T: HistoryClient + ?Sized> HistoryClient for Arc<T> {
    async fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        (**self).load().await
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        (**self).clear().await
    }
}

/// History over the dashboard's JSON endpoints
pub struct HttpHistoryClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpHistoryClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }
}

#[async_trait]
impl HistoryClient for HttpHistoryClient {
    async fn load(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let response = self.client.get(self.endpoint("history")).send().await?;
        if !response.status().is_success() {
            return Err(HistoryError::Status(response.status().as_u16()));
        }
        let body: HistoryResponse = response.json().await?;
        tracing::debug!(entries = body.result.len(), "Loaded chat history");
        Ok(body.result)
    }

    async fn clear(&self) -> Result<(), HistoryError> {
        let response = self
            .client
            .post(self.endpoint("clear-history"))
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(HistoryError::Status(response.status().as_u16()));
        }
        Ok(())
    }
}
