use thiserror::Error;

/// Search layer error types
#[derive(Error, Debug, Clone)]
pub enum SearchError {
    /// Missing or invalid facet, filter, optimizer or configuration option
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network errors and connection failures towards the search cluster
    #[error("Transport error: {0}")]
    Transport(String),

    /// Timeout errors
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// The engine answered with an error document or a non-success status
    #[error("Engine error{}: {reason}", status.map(|s| format!(" ({})", s)).unwrap_or_default())]
    Engine { status: Option<u16>, reason: String },

    /// The engine answered with a document of unexpected shape
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// The spelling statistics probe failed
    #[error("Classification probe failed: {0}")]
    ClassificationProbe(String),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Catalog storage lookups
    #[error("Storage error: {0}")]
    Storage(String),
}

impl SearchError {
    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            SearchError::Configuration(_) => "CONFIGURATION_ERROR",
            SearchError::Transport(_) => "TRANSPORT_ERROR",
            SearchError::Timeout(_) => "TIMEOUT",
            SearchError::Engine { .. } => "ENGINE_ERROR",
            SearchError::MalformedResponse(_) => "MALFORMED_RESPONSE",
            SearchError::ClassificationProbe(_) => "CLASSIFICATION_PROBE_ERROR",
            SearchError::Serialization(_) => "SERIALIZATION_ERROR",
            SearchError::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Configuration errors are the only ones that always reach the caller.
    pub fn is_configuration(&self) -> bool {
        matches!(self, SearchError::Configuration(_))
    }

    pub(crate) fn config(message: impl Into<String>) -> Self {
        SearchError::Configuration(message.into())
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for SearchError {
    fn from(err: validator::ValidationErrors) -> Self {
        SearchError::Configuration(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for SearchError {
    fn from(err: config::ConfigError) -> Self {
        SearchError::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for SearchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            SearchError::Timeout(err.to_string())
        } else if err.is_decode() {
            SearchError::MalformedResponse(err.to_string())
        } else {
            SearchError::Transport(err.to_string())
        }
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, SearchError>;
