//! Catalog search relevance layer.
//!
//! Turns storefront search, filter, facet and sort requests into search
//! engine documents, dispatches them, and parses the responses into ranked
//! entity ids, facet buckets and spelling signals.
//!
//! ```no_run
//! use catalog_search::{
//!     Config, FacetKind, FilterClause, SearchService, StaticAttributeCatalog, StaticStoreContext,
//! };
//! use std::sync::Arc;
//!
//! # async fn run() -> catalog_search::Result<()> {
//! let config = Config::load()?;
//! let service = SearchService::from_config(config, Arc::new(StaticAttributeCatalog::default()))?;
//!
//! let mut builder = service.query_builder(&StaticStoreContext::default())?;
//! builder
//!     .set_fulltext_query("red shoes")
//!     .add_global_filter(FilterClause::term("category", 12))
//!     .add_facet("color", FacetKind::terms("color"));
//!
//! let response = builder.search().await?;
//! println!("{} products", response.total_count);
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod catalog;
pub mod collection;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod query;
pub mod relevance;
pub mod service;
pub mod spelling;
pub mod telemetry;
pub mod transport;

pub use catalog::{
    AttributeDefinition, AttributeMetadata, FieldName, FieldUsage, LanguageCode,
    StaticAttributeCatalog, StaticStoreContext, StoreContext,
};
pub use collection::{CatalogEntity, CollectionMode, EntityStore, ProductCollection};
pub use config::Config;
pub use error::{Result, SearchError};
pub use models::{
    EntityId, FacetResult, FacetScope, FulltextQuery, PageParams, QueryType, SearchResponse,
    SortDirection,
};
pub use query::{FacetKind, FilterClause, QueryBuilder, QueryState, SearchRequest};
pub use relevance::{OptimizerDefinition, Rule};
pub use service::SearchService;
pub use spelling::SpellingType;
pub use transport::{HttpTransport, SearchTarget, SearchTransport};
