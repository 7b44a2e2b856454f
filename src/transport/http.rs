use crate::config::EngineConfig;
use crate::error::{Result, SearchError};
use crate::transport::{SearchTarget, SearchTransport};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// JSON over HTTP transport
#[derive(Clone)]
pub struct HttpTransport {
    pub(crate) client: Client,
    pub(crate) base_url: Url,
    pub(crate) timeout_secs: u64,
}

impl HttpTransport {
    /// Create a new transport towards `base_url`
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self> {
        let base_url = Url::parse(base_url).map_err(|e| {
            SearchError::Configuration(format!("Invalid engine url '{}': {}", base_url, e))
        })?;

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| {
                SearchError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            base_url,
            timeout_secs,
        })
    }

    pub fn from_config(config: &EngineConfig) -> Result<Self> {
        Self::new(&config.url, config.timeout_secs)
    }

    /// POST a JSON body and decode the JSON answer
    async fn post(&self, path: &str, body: &Value) -> Result<Value> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| SearchError::Configuration(format!("Invalid request path '{}': {}", path, e)))?;

        let response = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .header("User-Agent", "catalog-search/0.4")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SearchError::Timeout(format!(
                        "Search request timed out after {} seconds",
                        self.timeout_secs
                    ))
                } else if e.is_connect() {
                    SearchError::Transport(format!("Failed to connect to search engine: {}", e))
                } else {
                    SearchError::Transport(format!("Search request failed: {}", e))
                }
            })?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let reason = serde_json::from_str::<Value>(&text)
                .ok()
                .and_then(|doc| error_reason(&doc))
                .unwrap_or(text);
            warn!(path, status = status.as_u16(), reason = %reason, "Search engine rejected request");
            return Err(SearchError::Engine {
                status: Some(status.as_u16()),
                reason,
            });
        }

        debug!(path, status = status.as_u16(), bytes = text.len(), "Search engine answered");

        serde_json::from_str(&text).map_err(|e| {
            SearchError::MalformedResponse(format!("Response is not a JSON document: {}", e))
        })
    }
}

/// Human readable reason of an engine error document
pub(crate) fn error_reason(document: &Value) -> Option<String> {
    match document.get("error")? {
        Value::String(reason) => Some(reason.clone()),
        error => error
            .get("reason")
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(error.to_string())),
    }
}

#[async_trait]
impl SearchTransport for HttpTransport {
    async fn search(&self, target: &SearchTarget, body: &Value) -> Result<Value> {
        self.post(&target.path("_search"), body).await
    }

    async fn term_vectors(&self, target: &SearchTarget, body: &Value) -> Result<Value> {
        self.post(&target.path("_termvectors"), body).await
    }

    async fn count(&self, target: &SearchTarget, body: &Value) -> Result<u64> {
        let response = self.post(&target.path("_count"), body).await?;
        response
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| SearchError::MalformedResponse("Count response has no count".into()))
    }
}
