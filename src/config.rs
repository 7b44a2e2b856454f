use crate::error::{Result, SearchError};
use crate::relevance::OptimizerDefinition;
use serde::{Deserialize, Serialize};
use std::path::Path;
use validator::Validate;

/// Environment variable naming an optional configuration file
pub const CONFIG_PATH_ENV: &str = "CATALOG_SEARCH_CONFIG";

/// Prefix of environment overrides, e.g. `CATALOG_SEARCH_ENGINE__URL`
pub const ENV_PREFIX: &str = "CATALOG_SEARCH";

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Main search layer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    /// Search cluster endpoint configuration
    #[serde(default)]
    #[validate(nested)]
    pub engine: EngineConfig,

    /// Fulltext matching and spelling configuration
    #[serde(default)]
    #[validate(nested)]
    pub relevance: RelevanceConfig,

    /// Memoization caches
    #[serde(default)]
    #[validate(nested)]
    pub cache: CacheConfig,

    /// Pagination defaults
    #[serde(default)]
    #[validate(nested)]
    pub pagination: PaginationConfig,

    /// Product collection filters
    #[serde(default)]
    #[validate(nested)]
    pub collection: CollectionConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Admin-defined score optimizers
    #[serde(default)]
    pub optimizers: Vec<OptimizerDefinition>,
}

impl Config {
    /// Load configuration from the embedded defaults, an optional file and the environment
    pub fn load() -> Result<Self> {
        let config_path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| "config/catalog-search.toml".to_string());

        let config: Config = config::Config::builder()
            // Start with default values
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            // Override with config file if it exists
            .add_source(config::File::with_name(&config_path).required(false))
            // Override with environment variables (prefix: CATALOG_SEARCH_)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    /// Load configuration from an explicit file layered over the embedded defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .add_source(config::File::from(path).required(true))
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    /// Load configuration from a TOML document layered over the embedded defaults
    pub fn from_toml_str(document: &str) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(
                DEFAULT_CONFIG,
                config::FileFormat::Toml,
            ))
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?
            .try_deserialize()?;

        config.check()?;
        Ok(config)
    }

    /// Run derived validation plus the cross-field checks
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        reqwest::Url::parse(&self.engine.url).map_err(|e| {
            SearchError::Configuration(format!("Invalid engine url '{}': {}", self.engine.url, e))
        })?;

        for optimizer in &self.optimizers {
            optimizer.check()?;
        }

        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EngineConfig {
    /// Base URL of the search cluster
    #[serde(default = "default_engine_url")]
    #[validate(length(min = 1))]
    pub url: String,

    /// Catalog index (or alias) name
    #[serde(default = "default_index")]
    #[validate(length(min = 1))]
    pub index: String,

    /// Legacy document type, appended to the request path when set
    #[serde(default)]
    pub document_type: Option<String>,

    /// HTTP client timeout (seconds)
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1))]
    pub timeout_secs: u64,

    /// Surface runtime errors to the caller instead of degrading to empty results
    #[serde(default)]
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: default_engine_url(),
            index: default_index(),
            document_type: None,
            timeout_secs: default_timeout_secs(),
            debug: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RelevanceConfig {
    /// Relative document frequency above which a term counts as a stop word
    #[serde(default = "default_cutoff_frequency")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub cutoff_frequency: f64,

    /// Minimum should match applied to the weighted search query
    #[serde(default = "default_minimum_should_match")]
    #[validate(length(min = 1))]
    pub minimum_should_match: String,

    /// Tie breaker of the multi-field matches
    #[serde(default = "default_tie_breaker")]
    #[validate(range(min = 0.0, max = 1.0))]
    pub tie_breaker: f64,

    /// Weight of the shingle (phrase) fields; disabled when absent
    #[serde(default)]
    pub phrase_match_boost: Option<f64>,

    #[serde(default)]
    #[validate(nested)]
    pub fuzziness: FuzzinessConfig,

    #[serde(default)]
    pub phonetic: PhoneticConfig,

    /// Ask the engine for "did you mean" suggestions on spellchecked queries
    #[serde(default = "default_true")]
    pub enable_suggestions: bool,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            cutoff_frequency: default_cutoff_frequency(),
            minimum_should_match: default_minimum_should_match(),
            tie_breaker: default_tie_breaker(),
            phrase_match_boost: None,
            fuzziness: FuzzinessConfig::default(),
            phonetic: PhoneticConfig::default(),
            enable_suggestions: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct FuzzinessConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Engine fuzziness value ("AUTO", "1", "2")
    #[serde(default = "default_fuzziness_value")]
    #[validate(length(min = 1))]
    pub value: String,

    #[serde(default = "default_prefix_length")]
    pub prefix_length: u32,

    #[serde(default = "default_max_expansions")]
    #[validate(range(min = 1))]
    pub max_expansions: u32,
}

impl Default for FuzzinessConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            value: default_fuzziness_value(),
            prefix_length: default_prefix_length(),
            max_expansions: default_max_expansions(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhoneticConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for PhoneticConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CacheConfig {
    /// Maximum cached spelling classifications
    #[serde(default = "default_cache_capacity")]
    #[validate(range(min = 1))]
    pub spelling_capacity: u64,

    /// Maximum cached fulltext sub-queries
    #[serde(default = "default_cache_capacity")]
    #[validate(range(min = 1))]
    pub fulltext_capacity: u64,

    /// Entry time to live (seconds)
    #[serde(default = "default_cache_ttl_secs")]
    #[validate(range(min = 1))]
    pub ttl_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            spelling_capacity: default_cache_capacity(),
            fulltext_capacity: default_cache_capacity(),
            ttl_secs: default_cache_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PaginationConfig {
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1))]
    pub default_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CollectionConfig {
    /// Visibility values shown on search result pages
    #[serde(default = "default_search_visibility")]
    #[validate(length(min = 1))]
    pub search_visibility: Vec<u32>,

    /// Visibility values shown on category pages
    #[serde(default = "default_catalog_visibility")]
    #[validate(length(min = 1))]
    pub catalog_visibility: Vec<u32>,

    /// Hide out of stock products
    #[serde(default = "default_true")]
    pub in_stock_only: bool,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            search_visibility: default_search_visibility(),
            catalog_visibility: default_catalog_visibility(),
            in_stock_only: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default)]
    pub json_logs: bool,

    /// Enable Prometheus metrics
    #[serde(default = "default_true")]
    pub prometheus_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logs: false,
            prometheus_enabled: true,
        }
    }
}

fn default_engine_url() -> String {
    "http://localhost:9200".to_string()
}

fn default_index() -> String {
    "catalog".to_string()
}

fn default_timeout_secs() -> u64 {
    5
}

fn default_cutoff_frequency() -> f64 {
    0.15
}

fn default_minimum_should_match() -> String {
    "100%".to_string()
}

fn default_tie_breaker() -> f64 {
    1.0
}

fn default_fuzziness_value() -> String {
    "AUTO".to_string()
}

fn default_prefix_length() -> u32 {
    1
}

fn default_max_expansions() -> u32 {
    10
}

fn default_cache_capacity() -> u64 {
    10_000
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_page_size() -> u64 {
    20
}

fn default_search_visibility() -> Vec<u32> {
    vec![3, 4]
}

fn default_catalog_visibility() -> Vec<u32> {
    vec![2, 4]
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}
