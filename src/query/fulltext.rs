//! Fulltext match clauses selected by spelling quality.

use crate::cache::MemoCache;
use crate::catalog::fields::{search_all_field, spelling_field};
use crate::catalog::{weighted_search_fields, Analyzer, AttributeMetadata, FieldUsage, LanguageCode};
use crate::config::{CacheConfig, RelevanceConfig};
use crate::error::{Result, SearchError};
use crate::models::StructuredValue;
use crate::query::filter::FilterClause;
use crate::spelling::SpellingType;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FulltextKey {
    schema_version: u64,
    language: LanguageCode,
    spelling_type: SpellingType,
    text: String,
}

/// Builds and memoizes the fulltext part of query documents
pub struct FulltextQueryFactory {
    metadata: Arc<dyn AttributeMetadata>,
    relevance: RelevanceConfig,
    cache: MemoCache<FulltextKey, Value>,
}

impl FulltextQueryFactory {
    pub fn new(
        metadata: Arc<dyn AttributeMetadata>,
        relevance: RelevanceConfig,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            metadata,
            relevance,
            cache: MemoCache::new(cache.fulltext_capacity, Duration::from_secs(cache.ttl_secs)),
        }
    }

    /// Match clause for shopper text
    pub async fn text_query(
        &self,
        text: &str,
        language: &LanguageCode,
        spelling_type: SpellingType,
    ) -> Result<Value> {
        let key = FulltextKey {
            schema_version: self.metadata.schema_version(),
            language: language.clone(),
            spelling_type,
            text: text.to_string(),
        };

        self.cache
            .get_or_try_insert_with(key, async { self.compose(text, language, spelling_type) })
            .await
            .map_err(|e| e.as_ref().clone())
    }

    /// Match clause for a `field -> value|range` map, no spelling analysis involved
    pub fn structured_query(
        &self,
        fields: &BTreeMap<String, StructuredValue>,
        language: &LanguageCode,
    ) -> Result<Value> {
        let must = fields
            .iter()
            .map(|(attribute, value)| {
                let field = self
                    .metadata
                    .field_name(attribute, language, FieldUsage::Search)?;
                match value {
                    StructuredValue::Range { from, to } => {
                        FilterClause::range(field.as_str(), from.clone(), to.clone()).render()
                    }
                    StructuredValue::Value(value) => {
                        Ok(json!({ "match": { field.as_str(): value } }))
                    }
                }
            })
            .collect::<Result<Vec<_>>>()?;

        if must.is_empty() {
            return Err(SearchError::config("Structured query has no fields"));
        }

        Ok(json!({ "bool": { "must": must } }))
    }

    fn compose(&self, text: &str, language: &LanguageCode, spelling_type: SpellingType) -> Result<Value> {
        let fuzzy = self.fuzzy_query(text, language);
        let phonetic = self.phonetic_query(text, language);

        let spelling_type = match spelling_type {
            SpellingType::Fuzzy | SpellingType::MostlyFuzzy
                if fuzzy.is_none() && phonetic.is_none() =>
            {
                SpellingType::MostlyExact
            }
            other => other,
        };

        let query = match spelling_type {
            SpellingType::PureStopwords => {
                self.weighted_query(text, language, Analyzer::Whitespace, Some("100%"))?
            }
            SpellingType::Exact => json!({
                "bool": {
                    "must": [self.weighted_query(text, language, Analyzer::Whitespace, None)?],
                    "filter": [self.cutoff_query(text, language)],
                }
            }),
            SpellingType::MostlyExact => json!({
                "bool": {
                    "must": [self.weighted_query(text, language, Analyzer::Standard, None)?],
                    "filter": [self.cutoff_query(text, language)],
                }
            }),
            SpellingType::Fuzzy => {
                let alternatives: Vec<Value> = fuzzy.into_iter().chain(phonetic).collect();
                json!({
                    "bool": {
                        "must": [{ "bool": { "should": alternatives, "minimum_should_match": 1 } }],
                        "should": [self.weighted_query(text, language, Analyzer::Standard, None)?],
                    }
                })
            }
            SpellingType::MostlyFuzzy => {
                let standard = self.weighted_query(text, language, Analyzer::Standard, None)?;
                let alternatives: Vec<Value> = fuzzy
                    .into_iter()
                    .chain(phonetic)
                    .chain(std::iter::once(standard))
                    .collect();
                json!({
                    "bool": {
                        "must": [{ "bool": { "should": alternatives, "minimum_should_match": 1 } }],
                        "should": [self.weighted_query(text, language, Analyzer::Whitespace, None)?],
                    }
                })
            }
        };

        Ok(query)
    }

    /// Multi-field match over the searchable fields of one analyzer
    fn weighted_query(
        &self,
        text: &str,
        language: &LanguageCode,
        analyzer: Analyzer,
        minimum_should_match: Option<&str>,
    ) -> Result<Value> {
        let mut fields = weighted_search_fields(self.metadata.as_ref(), language, analyzer, 1.0)?;
        if let Some(boost) = self.relevance.phrase_match_boost {
            fields.extend(weighted_search_fields(
                self.metadata.as_ref(),
                language,
                Analyzer::Shingle,
                boost,
            )?);
        }

        let fields: Vec<String> = fields
            .iter()
            .map(|(field, weight)| field.weighted(*weight))
            .collect();

        Ok(json!({
            "multi_match": {
                "query": text,
                "fields": fields,
                "type": "best_fields",
                "minimum_should_match": minimum_should_match
                    .unwrap_or(self.relevance.minimum_should_match.as_str()),
                "tie_breaker": self.relevance.tie_breaker,
            }
        }))
    }

    /// Common terms query discarding high frequency tokens from the match requirement
    fn cutoff_query(&self, text: &str, language: &LanguageCode) -> Value {
        let field = search_all_field(language);
        json!({
            "common": {
                field.as_str(): {
                    "query": text,
                    "cutoff_frequency": self.relevance.cutoff_frequency,
                    "low_freq_operator": "and",
                }
            }
        })
    }

    fn fuzzy_query(&self, text: &str, language: &LanguageCode) -> Option<Value> {
        let fuzziness = &self.relevance.fuzziness;
        if !fuzziness.enabled {
            return None;
        }
        let field = spelling_field(language).with_analyzer(Analyzer::Whitespace);
        Some(json!({
            "multi_match": {
                "query": text,
                "fields": [field.as_str()],
                "fuzziness": fuzziness.value,
                "prefix_length": fuzziness.prefix_length,
                "max_expansions": fuzziness.max_expansions,
                "minimum_should_match": self.relevance.minimum_should_match,
            }
        }))
    }

    fn phonetic_query(&self, text: &str, language: &LanguageCode) -> Option<Value> {
        if !self.relevance.phonetic.enabled {
            return None;
        }
        let field = spelling_field(language).with_analyzer(Analyzer::Phonetic);
        Some(json!({
            "multi_match": {
                "query": text,
                "fields": [field.as_str()],
                "minimum_should_match": self.relevance.minimum_should_match,
            }
        }))
    }
}
