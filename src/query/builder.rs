use crate::catalog::fields::{spelling_field, Analyzer};
use crate::catalog::{FieldName, FieldUsage, LanguageCode, StoreContext};
use crate::error::{Result, SearchError};
use crate::metrics::record_search;
use crate::models::{
    FacetScope, FulltextQuery, PageParams, QueryType, SearchResponse, SortDirection, SortOrder,
};
use crate::query::assembly::{assemble_document, DocumentParts};
use crate::query::facet::FacetKind;
use crate::query::filter::FilterClause;
use crate::query::parser::parse_response;
use crate::query::request::SearchRequest;
use crate::query::sort::{rewrite_sort, SortContext};
use crate::relevance::OptimizerContext;
use crate::service::SearchComponents;
use crate::spelling::SpellingType;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;
use strum::{AsRefStr, Display};
use tracing::{debug, error};

/// Lifecycle of the search owned by a [`QueryBuilder`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, AsRefStr)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryState {
    /// Filters, facets, sort and paging may change
    Configuring,
    /// The document is built
    Assembled,
    /// Awaiting the engine
    Dispatched,
    /// Results are available
    Parsed,
    /// The search failed, see [`QueryBuilder::last_error`]
    Failed,
}

/// Assembled document plus what is needed to interpret its response
struct PreparedSearch {
    document: Value,
    spelling_type: Option<SpellingType>,
}

/// Builds, dispatches and parses one storefront search.
///
/// Any mutation after a search starts a new lifecycle.
pub struct QueryBuilder {
    components: Arc<SearchComponents>,
    request: SearchRequest,
    website_id: u32,
    customer_group_id: u32,
    state: QueryState,
    last_error: Option<SearchError>,
}

impl QueryBuilder {
    pub(crate) fn new(components: Arc<SearchComponents>, store: &dyn StoreContext) -> Result<Self> {
        let mut request = SearchRequest::new(store.language_code()?, store.store_id());
        request.page = PageParams::from_page(1, components.default_page_size as i64);

        Ok(Self {
            components,
            request,
            website_id: store.website_id(),
            customer_group_id: store.customer_group_id(),
            state: QueryState::Configuring,
            last_error: None,
        })
    }

    /// Shopper text, or a structured `field -> value|range` map
    pub fn set_fulltext_query(&mut self, query: impl Into<FulltextQuery>) -> &mut Self {
        let query = query.into();
        if matches!(query, FulltextQuery::Text(_)) && !query.is_empty() {
            self.request.query_type = QueryType::Fulltext;
        }
        self.request.fulltext = Some(query);
        self.touch()
    }

    /// Add a filter excluded from the facet named by `scope`
    pub fn add_filter(&mut self, scope: FacetScope, clause: FilterClause) -> &mut Self {
        self.request.filters.push((scope, clause));
        self.touch()
    }

    /// Add a filter narrowing hits and every facet
    pub fn add_global_filter(&mut self, clause: FilterClause) -> &mut Self {
        self.add_filter(FacetScope::Global, clause)
    }

    /// Register a facet, replacing any facet of the same name
    pub fn add_facet(&mut self, name: impl Into<String>, facet: FacetKind) -> &mut Self {
        self.request.set_facet(name.into(), facet);
        self.touch()
    }

    pub fn reset_facets(&mut self) -> &mut Self {
        self.request.facets.clear();
        self.touch()
    }

    /// 1-based page; pages and sizes below 1 are floored to 1
    pub fn set_page_params(&mut self, page: i64, size: i64) -> &mut Self {
        self.request.page = PageParams::from_page(page, size);
        self.touch()
    }

    /// Explicit window, `PageParams::count_only()` for totals and facets only
    pub fn set_page(&mut self, page: PageParams) -> &mut Self {
        self.request.page = page;
        self.touch()
    }

    pub fn add_sort_order(&mut self, field: impl Into<String>, direction: SortDirection) -> &mut Self {
        self.request.sort.push(SortOrder::new(field, direction));
        self.touch()
    }

    /// Category whose positions the `position` sort follows
    pub fn set_category(&mut self, category_id: Option<u64>) -> &mut Self {
        self.request.category_id = category_id;
        self.touch()
    }

    /// Stored fields returned with hits
    pub fn set_fields(&mut self, fields: Vec<String>) -> &mut Self {
        self.request.fields = fields;
        self.touch()
    }

    pub fn set_query_type(&mut self, query_type: QueryType) -> &mut Self {
        self.request.query_type = query_type;
        self.touch()
    }

    /// Engine field of an attribute for the current language
    pub fn attribute_field(&self, attribute: &str, usage: FieldUsage) -> Result<FieldName> {
        self.components
            .metadata
            .field_name(attribute, &self.request.language, usage)
    }

    pub fn request(&self) -> &SearchRequest {
        &self.request
    }

    pub fn language(&self) -> &LanguageCode {
        &self.request.language
    }

    pub fn query_type(&self) -> QueryType {
        self.request.query_type
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    /// Error absorbed by the last failed search
    pub fn last_error(&self) -> Option<&SearchError> {
        self.last_error.as_ref()
    }

    /// Build the search document without dispatching it
    pub async fn assemble(&mut self) -> Result<Value> {
        match self.prepare(&self.request).await {
            Ok(prepared) => {
                self.state = QueryState::Assembled;
                Ok(prepared.document)
            }
            Err(e) => {
                self.state = QueryState::Failed;
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Run the search.
    ///
    /// Configuration errors are returned. Runtime failures are logged and
    /// degrade to [`SearchResponse::empty`], unless the engine runs in debug
    /// mode.
    pub async fn search(&mut self) -> Result<SearchResponse> {
        let started = Instant::now();
        self.last_error = None;

        let prepared = match self.prepare(&self.request).await {
            Ok(prepared) => prepared,
            Err(e) => return self.fail(e, started),
        };
        self.state = QueryState::Assembled;
        debug!(
            index = %self.components.target.index,
            document = %prepared.document,
            "Assembled search document"
        );

        self.state = QueryState::Dispatched;
        let raw = match self
            .components
            .transport
            .search(&self.components.target, &prepared.document)
            .await
        {
            Ok(raw) => raw,
            Err(e) => return self.fail(e, started),
        };

        let mut response = match parse_response(&raw, &self.request.facets) {
            Ok(response) => response,
            Err(e) => return self.fail(e, started),
        };
        response.spelling_type = prepared.spelling_type;
        response.is_spellchecked = prepared
            .spelling_type
            .is_some_and(SpellingType::is_spellchecked);

        self.state = QueryState::Parsed;
        record_search("success", started.elapsed());
        debug!(
            index = %self.components.target.index,
            total = response.total_count,
            hits = response.hits.len(),
            took_ms = response.took_ms,
            "Search completed"
        );

        Ok(response)
    }

    /// Total of the current configuration, without hits, sort or facets.
    ///
    /// Follows the same error policy as [`QueryBuilder::search`], degrading to 0.
    pub async fn count(&self) -> Result<u64> {
        let request = self.request.to_count_query();

        let outcome = match self.prepare(&request).await {
            Ok(prepared) => {
                let dispatched = self
                    .components
                    .transport
                    .search(&self.components.target, &prepared.document)
                    .await;
                dispatched.and_then(|raw| parse_response(&raw, &[]))
            }
            Err(e) => Err(e),
        };

        match outcome {
            Ok(response) => Ok(response.total_count),
            Err(e) if e.is_configuration() || self.components.debug => Err(e),
            Err(e) => {
                error!(
                    index = %self.components.target.index,
                    error = %e,
                    code = e.error_code(),
                    "Count failed, reporting no results"
                );
                Ok(0)
            }
        }
    }

    fn touch(&mut self) -> &mut Self {
        self.state = QueryState::Configuring;
        self
    }

    fn fail(&mut self, error: SearchError, started: Instant) -> Result<SearchResponse> {
        self.state = QueryState::Failed;
        self.last_error = Some(error.clone());

        if error.is_configuration() {
            record_search("config_error", started.elapsed());
            return Err(error);
        }

        record_search("degraded", started.elapsed());
        error!(
            index = %self.components.target.index,
            error = %error,
            code = error.error_code(),
            "Search failed, returning no results"
        );

        if self.components.debug {
            Err(error)
        } else {
            Ok(SearchResponse::empty())
        }
    }

    async fn prepare(&self, request: &SearchRequest) -> Result<PreparedSearch> {
        let components = &self.components;
        let language = &request.language;

        let (fulltext, spelling_type) = match &request.fulltext {
            Some(query) if query.is_empty() => (None, None),
            Some(FulltextQuery::Text(text)) => {
                let text = text.trim();
                let spelling_type = components
                    .spelling
                    .classify(&components.target, language, text)
                    .await;
                let clause = components
                    .fulltext
                    .text_query(text, language, spelling_type)
                    .await?;
                (Some(clause), Some(spelling_type))
            }
            Some(FulltextQuery::Structured(fields)) => {
                (Some(components.fulltext.structured_query(fields, language)?), None)
            }
            None => (None, None),
        };

        let count_only = request.page.is_count_only();

        let sort = if count_only {
            Vec::new()
        } else {
            let context = SortContext {
                metadata: components.metadata.as_ref(),
                language,
                category_id: request.category_id,
                customer_group_id: self.customer_group_id,
                website_id: self.website_id,
            };
            rewrite_sort(&request.sort, &context)?
        };

        let suggest = match (spelling_type, request.text()) {
            (Some(spelling_type), Some(text))
                if components.enable_suggestions && !count_only && spelling_type.is_spellchecked() =>
            {
                Some(suggester(text.trim(), language))
            }
            _ => None,
        };

        let mut document = assemble_document(
            request,
            DocumentParts {
                fulltext,
                sort,
                suggest,
            },
        )?;

        let context = OptimizerContext {
            query_type: request.query_type,
            now: Utc::now(),
            count_only,
        };
        components.composer.apply(&mut document, &context)?;

        Ok(PreparedSearch {
            document,
            spelling_type,
        })
    }
}

/// Phrase suggester over the spelling field
fn suggester(text: &str, language: &LanguageCode) -> Value {
    let field = spelling_field(language).with_analyzer(Analyzer::Whitespace);
    json!({
        "text": text,
        "phrase": {
            "field": field.as_str(),
            "size": 3,
            "max_errors": 2,
            "direct_generator": [{ "field": field.as_str(), "suggest_mode": "always" }],
        }
    })
}
