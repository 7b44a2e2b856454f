//! Wire transport to the search cluster.
//!
//! The core never retries; a transport makes one attempt per call and maps
//! timeouts, connection failures and non-success statuses onto
//! [`SearchError`](crate::error::SearchError).

mod http;

pub use http::HttpTransport;
pub(crate) use http::error_reason;

use crate::config::EngineConfig;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Index (and legacy document type) a request is addressed to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchTarget {
    pub index: String,
    pub document_type: Option<String>,
}

impl SearchTarget {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            document_type: None,
        }
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            index: config.index.clone(),
            document_type: config.document_type.clone(),
        }
    }

    /// `/{index}[/{type}]/{endpoint}`
    pub fn path(&self, endpoint: &str) -> String {
        match &self.document_type {
            Some(document_type) => format!("/{}/{}/{}", self.index, document_type, endpoint),
            None => format!("/{}/{}", self.index, endpoint),
        }
    }
}

/// Search cluster client
#[async_trait]
pub trait SearchTransport: Send + Sync {
    /// Run a search request body and return the raw response document
    async fn search(&self, target: &SearchTarget, body: &Value) -> Result<Value>;

    /// Term statistics of an artificial document
    async fn term_vectors(&self, target: &SearchTarget, body: &Value) -> Result<Value>;

    /// Number of documents matching a query body
    async fn count(&self, target: &SearchTarget, body: &Value) -> Result<u64>;
}
