//! Process wide search components shared by every request.

use crate::catalog::{AttributeMetadata, StoreContext};
use crate::collection::{CollectionMode, EntityStore, ProductCollection};
use crate::config::Config;
use crate::error::Result;
use crate::query::{FulltextQueryFactory, QueryBuilder};
use crate::relevance::{OptimizerMatcher, RelevanceComposer};
use crate::spelling::SpellingAnalyzer;
use crate::transport::{HttpTransport, SearchTarget, SearchTransport};
use std::sync::Arc;
use tracing::info;

/// Collaborators and memo caches a [`QueryBuilder`] works with
pub(crate) struct SearchComponents {
    pub(crate) transport: Arc<dyn SearchTransport>,
    pub(crate) target: SearchTarget,
    pub(crate) metadata: Arc<dyn AttributeMetadata>,
    pub(crate) spelling: SpellingAnalyzer,
    pub(crate) fulltext: FulltextQueryFactory,
    pub(crate) composer: Arc<RelevanceComposer>,
    pub(crate) debug: bool,
    pub(crate) enable_suggestions: bool,
    pub(crate) default_page_size: u64,
}

/// Entry point: one per process, hands out per request builders and collections
pub struct SearchService {
    config: Config,
    components: Arc<SearchComponents>,
}

impl SearchService {
    pub fn new(
        config: Config,
        transport: Arc<dyn SearchTransport>,
        metadata: Arc<dyn AttributeMetadata>,
    ) -> Result<Self> {
        config.check()?;

        let composer = Arc::new(RelevanceComposer::from_definitions(&config.optimizers)?);
        let components = SearchComponents {
            spelling: SpellingAnalyzer::new(transport.clone(), &config.relevance, &config.cache),
            fulltext: FulltextQueryFactory::new(
                metadata.clone(),
                config.relevance.clone(),
                &config.cache,
            ),
            transport,
            target: SearchTarget::from_config(&config.engine),
            metadata,
            composer,
            debug: config.engine.debug,
            enable_suggestions: config.relevance.enable_suggestions,
            default_page_size: config.pagination.default_page_size,
        };

        info!(
            index = %components.target.index,
            optimizers = components.composer.optimizers().len(),
            debug = components.debug,
            "Search service initialized"
        );

        Ok(Self {
            config,
            components: Arc::new(components),
        })
    }

    /// Service talking to the configured cluster over HTTP
    pub fn from_config(config: Config, metadata: Arc<dyn AttributeMetadata>) -> Result<Self> {
        let transport = Arc::new(HttpTransport::from_config(&config.engine)?);
        Self::new(config, transport, metadata)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn target(&self) -> &SearchTarget {
        &self.components.target
    }

    pub fn spelling(&self) -> &SpellingAnalyzer {
        &self.components.spelling
    }

    pub fn composer(&self) -> &RelevanceComposer {
        &self.components.composer
    }

    /// Fresh builder for one search in `store`
    pub fn query_builder(&self, store: &dyn StoreContext) -> Result<QueryBuilder> {
        QueryBuilder::new(self.components.clone(), store)
    }

    /// Fresh product collection for one storefront page
    pub fn collection<S: EntityStore>(
        &self,
        store: &dyn StoreContext,
        entities: S,
        mode: CollectionMode,
    ) -> Result<ProductCollection<S>> {
        Ok(ProductCollection::new(
            self.query_builder(store)?,
            entities,
            mode,
            self.config.collection.clone(),
        ))
    }

    pub fn optimizer_matcher(&self) -> OptimizerMatcher {
        OptimizerMatcher::new(
            self.components.transport.clone(),
            self.components.target.clone(),
            self.components.composer.clone(),
        )
    }
}
