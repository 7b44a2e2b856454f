use crate::models::request::EntityId;
use crate::spelling::SpellingType;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One facet bucket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetBucket {
    /// Term, histogram lower bound or query label
    pub key: String,
    pub count: u64,
}

/// Statistical summary of a numeric field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetStats {
    pub count: u64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub avg: Option<f64>,
    pub sum: f64,
}

impl FacetStats {
    /// Range bounds snapped to `step`, used to build price range filters
    pub fn bounds(&self, step: f64) -> Option<(f64, f64)> {
        let (min, max) = (self.min?, self.max?);
        if step <= 0.0 {
            return Some((min, max));
        }
        Some(((min / step).floor() * step, (max / step).ceil() * step))
    }
}

/// Parsed facet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetResult {
    /// Buckets in engine order
    pub buckets: Vec<FacetBucket>,

    /// More values exist than the configured size returned
    pub has_others: bool,

    /// Only set for stats facets
    pub stats: Option<FacetStats>,
}

impl FacetResult {
    pub fn count(&self, key: &str) -> Option<u64> {
        self.buckets.iter().find(|b| b.key == key).map(|b| b.count)
    }

    pub fn has_others(&self) -> bool {
        self.has_others
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty() && self.stats.is_none()
    }

    /// `{bucket: count}` view
    pub fn counts(&self) -> HashMap<String, u64> {
        self.buckets
            .iter()
            .map(|b| (b.key.clone(), b.count))
            .collect()
    }
}

/// A ranked hit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub entity_id: EntityId,

    /// Engine score when tracked
    pub score: Option<f64>,

    /// Raw fields returned for the hit, usually empty
    #[serde(default)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

/// Parsed engine response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    /// Total matching documents (before pagination)
    pub total_count: u64,

    /// Hits in engine rank order
    pub hits: Vec<SearchHit>,

    /// Facets keyed by registered facet name
    pub facets: HashMap<String, FacetResult>,

    /// The query text was matched with spelling tolerance
    pub is_spellchecked: bool,

    /// Classification the fulltext clause was built from
    pub spelling_type: Option<SpellingType>,

    /// "Did you mean" suggestions, best first
    #[serde(default)]
    pub suggestions: Vec<String>,

    /// Engine reported execution time
    pub took_ms: u64,
}

impl SearchResponse {
    /// The well formed response a failed search degrades to
    pub fn empty() -> Self {
        Self::default()
    }

    /// Entity ids in engine rank order
    pub fn entity_ids(&self) -> Vec<EntityId> {
        self.hits.iter().map(|hit| hit.entity_id).collect()
    }

    pub fn facet(&self, name: &str) -> Option<&FacetResult> {
        self.facets.get(name)
    }
}
