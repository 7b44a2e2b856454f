//! Lazy, paged product collection backed by a search.
//!
//! The first access to the size or the items runs the search once. Entities
//! are then loaded from the catalog store and put back into engine rank order.

use crate::config::CollectionConfig;
use crate::error::Result;
use crate::models::{EntityId, FacetResult, SearchResponse};
use crate::query::{FilterClause, QueryBuilder};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::{AsRefStr, Display, EnumString};
use tracing::debug;

/// Id that no catalog entity carries, used when the search returned nothing
pub const SENTINEL_ENTITY_ID: EntityId = 0;

pub const STORE_FIELD: &str = "store_id";
pub const VISIBILITY_FIELD: &str = "visibility";
pub const STOCK_FIELD: &str = "in_stock";

/// An entity the catalog store can hydrate
pub trait CatalogEntity {
    fn entity_id(&self) -> EntityId;
}

/// Catalog storage collaborator
#[async_trait]
pub trait EntityStore: Send + Sync {
    type Entity: CatalogEntity + Clone + Send + Sync;

    /// Load the entities with the given ids, in any order. Unknown ids are skipped.
    async fn load(&self, ids: &[EntityId]) -> Result<Vec<Self::Entity>>;
}

/// Storefront page a collection serves
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CollectionMode {
    Search,
    Catalog,
}

pub struct ProductCollection<S: EntityStore> {
    builder: QueryBuilder,
    store: S,
    mode: CollectionMode,
    config: CollectionConfig,
    filters_applied: bool,
    response: Option<SearchResponse>,
    items: Option<Vec<S::Entity>>,
}

impl<S: EntityStore> ProductCollection<S> {
    pub fn new(builder: QueryBuilder, store: S, mode: CollectionMode, config: CollectionConfig) -> Self {
        Self {
            builder,
            store,
            mode,
            config,
            filters_applied: false,
            response: None,
            items: None,
        }
    }

    /// Builder access for further configuration; drops any loaded result
    pub fn builder_mut(&mut self) -> &mut QueryBuilder {
        self.invalidate();
        &mut self.builder
    }

    pub fn builder(&self) -> &QueryBuilder {
        &self.builder
    }

    pub fn mode(&self) -> CollectionMode {
        self.mode
    }

    /// Forget the cached response and items, the next access searches again
    pub fn invalidate(&mut self) {
        self.response = None;
        self.items = None;
    }

    /// Total number of matching products
    pub async fn size(&mut self) -> Result<u64> {
        Ok(self.load_response().await?.total_count)
    }

    /// Products of the current page in engine rank order
    pub async fn items(&mut self) -> Result<&[S::Entity]> {
        if self.items.is_none() {
            let ids = self.load_response().await?.entity_ids();
            let items = self.hydrate(ids).await?;
            self.items = Some(items);
        }
        Ok(self.items.as_deref().unwrap_or_default())
    }

    /// Facet of the loaded response, `None` before the first access
    pub fn get_facet(&self, name: &str) -> Option<&FacetResult> {
        self.response.as_ref().and_then(|response| response.facet(name))
    }

    /// Whether the loaded response matched with spelling tolerance
    pub fn is_spellchecked(&self) -> bool {
        self.response
            .as_ref()
            .is_some_and(|response| response.is_spellchecked)
    }

    pub fn response(&self) -> Option<&SearchResponse> {
        self.response.as_ref()
    }

    async fn load_response(&mut self) -> Result<&SearchResponse> {
        if self.response.is_none() {
            self.apply_collection_filters();
            let response = self.builder.search().await?;
            debug!(
                mode = %self.mode,
                total = response.total_count,
                spellchecked = response.is_spellchecked,
                "Collection loaded"
            );
            self.response = Some(response);
        }
        Ok(self.response.get_or_insert_with(SearchResponse::empty))
    }

    fn apply_collection_filters(&mut self) {
        if self.filters_applied {
            return;
        }
        self.filters_applied = true;

        let visibility = match self.mode {
            CollectionMode::Search => &self.config.search_visibility,
            CollectionMode::Catalog => &self.config.catalog_visibility,
        };
        let store_id = self.builder.request().store_id;

        self.builder
            .add_global_filter(FilterClause::term(STORE_FIELD, store_id))
            .add_global_filter(FilterClause::terms(VISIBILITY_FIELD, visibility.clone()));
        if self.config.in_stock_only {
            self.builder
                .add_global_filter(FilterClause::term(STOCK_FIELD, true));
        }
    }

    async fn hydrate(&self, ids: Vec<EntityId>) -> Result<Vec<S::Entity>> {
        let lookup = if ids.is_empty() {
            vec![SENTINEL_ENTITY_ID]
        } else {
            ids.clone()
        };

        let loaded = self.store.load(&lookup).await?;
        Ok(reorder(&ids, loaded))
    }
}

/// Put `entities` into the order of `ids`, dropping anything not listed
pub fn reorder<E: CatalogEntity>(ids: &[EntityId], entities: Vec<E>) -> Vec<E> {
    let mut by_id: HashMap<EntityId, E> = entities
        .into_iter()
        .map(|entity| (entity.entity_id(), entity))
        .collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}
