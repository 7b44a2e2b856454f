use crate::catalog::LanguageCode;
use crate::models::{FacetScope, FulltextQuery, PageParams, QueryType, SortOrder};
use crate::query::facet::FacetKind;
use crate::query::filter::FilterClause;
use serde::{Deserialize, Serialize};

/// Everything a search is configured with before assembly
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Shopper text or structured field map, match-all when absent
    pub fulltext: Option<FulltextQuery>,

    /// Filters keyed by the facet they are excluded from
    pub filters: Vec<(FacetScope, FilterClause)>,

    /// Facets in registration order, names are unique
    pub facets: Vec<(String, FacetKind)>,

    pub sort: Vec<SortOrder>,

    pub page: PageParams,

    /// Category whose merchandising positions drive the `position` sort
    pub category_id: Option<u64>,

    /// Stored fields returned with each hit, none by default
    pub fields: Vec<String>,

    pub language: LanguageCode,

    pub store_id: u32,

    pub query_type: QueryType,
}

impl SearchRequest {
    pub fn new(language: LanguageCode, store_id: u32) -> Self {
        Self {
            fulltext: None,
            filters: Vec::new(),
            facets: Vec::new(),
            sort: Vec::new(),
            page: PageParams::default(),
            category_id: None,
            fields: Vec::new(),
            language,
            store_id,
            query_type: QueryType::LayeredNavigation,
        }
    }

    /// The same search reduced to its total: no hits, no sort, no facets
    pub fn to_count_query(&self) -> SearchRequest {
        SearchRequest {
            facets: Vec::new(),
            sort: Vec::new(),
            page: PageParams::count_only(),
            fields: Vec::new(),
            ..self.clone()
        }
    }

    /// Replace the facet registered under `name`, or append it
    pub fn set_facet(&mut self, name: String, facet: FacetKind) {
        match self.facets.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, kind)) => *kind = facet,
            None => self.facets.push((name, facet)),
        }
    }

    pub fn facet(&self, name: &str) -> Option<&FacetKind> {
        self.facets
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, kind)| kind)
    }

    /// Filters applied to the main query
    pub fn global_filters(&self) -> impl Iterator<Item = &FilterClause> {
        self.filters
            .iter()
            .filter(|(scope, _)| *scope == FacetScope::Global)
            .map(|(_, clause)| clause)
    }

    /// Facet scoped filters, applied to hits after aggregation
    pub fn scoped_filters(&self) -> impl Iterator<Item = (&FacetScope, &FilterClause)> {
        self.filters
            .iter()
            .filter(|(scope, _)| *scope != FacetScope::Global)
            .map(|(scope, clause)| (scope, clause))
    }

    /// Text to classify, when the fulltext query is shopper text
    pub fn text(&self) -> Option<&str> {
        self.fulltext
            .as_ref()
            .filter(|query| !query.is_empty())
            .and_then(FulltextQuery::text)
    }
}
