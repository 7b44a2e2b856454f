use crate::cache::MemoCache;
use crate::catalog::fields::{spelling_field, Analyzer};
use crate::catalog::LanguageCode;
use crate::config::{CacheConfig, RelevanceConfig};
use crate::error::{Result, SearchError};
use crate::metrics::{SPELLING_CLASSIFICATIONS_TOTAL, SPELLING_PROBES_TOTAL};
use crate::spelling::classification::{absolute_cutoff, parse_term_vectors, SpellingType, TermCounts};
use crate::transport::{SearchTarget, SearchTransport};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SpellingKey {
    index: String,
    language: LanguageCode,
    text: String,
}

/// Classifies query text by probing term statistics of the spelling field.
///
/// Classifications are memoized per index, language and exact text. A failed
/// probe degrades to [`SpellingType::Fuzzy`] and is not memoized.
pub struct SpellingAnalyzer {
    transport: Arc<dyn SearchTransport>,
    cutoff_frequency: f64,
    cache: MemoCache<SpellingKey, SpellingType>,
}

impl SpellingAnalyzer {
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        relevance: &RelevanceConfig,
        cache: &CacheConfig,
    ) -> Self {
        Self {
            transport,
            cutoff_frequency: relevance.cutoff_frequency,
            cache: MemoCache::new(cache.spelling_capacity, Duration::from_secs(cache.ttl_secs)),
        }
    }

    /// Spelling tier of `text` against `target`
    pub async fn classify(
        &self,
        target: &SearchTarget,
        language: &LanguageCode,
        text: &str,
    ) -> SpellingType {
        let key = SpellingKey {
            index: target.index.clone(),
            language: language.clone(),
            text: text.to_string(),
        };

        match self
            .cache
            .get_or_try_insert_with(key, self.probe(target, language, text))
            .await
        {
            Ok(spelling_type) => spelling_type,
            Err(e) => {
                SPELLING_PROBES_TOTAL.with_label_values(&["failure"]).inc();
                warn!(
                    index = %target.index,
                    query_text = text,
                    error = %e,
                    "Spelling probe failed, matching fuzzily"
                );
                SpellingType::Fuzzy
            }
        }
    }

    /// Drop every memoized classification, e.g. after a reindex
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }

    async fn probe(
        &self,
        target: &SearchTarget,
        language: &LanguageCode,
        text: &str,
    ) -> Result<SpellingType> {
        let standard = spelling_field(language);
        let whitespace = standard.with_analyzer(Analyzer::Whitespace);

        let doc_count = self
            .transport
            .count(target, &json!({ "query": { "match_all": {} } }))
            .await
            .map_err(probe_error)?;

        let body = json!({
            "doc": { standard.as_str(): text },
            "fields": [standard.as_str(), whitespace.as_str()],
            "term_statistics": true,
            "field_statistics": false,
            "positions": true,
            "offsets": false,
            "payloads": false,
        });
        let response = self
            .transport
            .term_vectors(target, &body)
            .await
            .map_err(probe_error)?;

        let tokens = parse_term_vectors(&response, standard.as_str(), whitespace.as_str())?;
        let cutoff = absolute_cutoff(self.cutoff_frequency, doc_count);
        let counts = TermCounts::from_tokens(&tokens, cutoff);
        let spelling_type = counts.spelling_type();

        SPELLING_PROBES_TOTAL.with_label_values(&["success"]).inc();
        SPELLING_CLASSIFICATIONS_TOTAL
            .with_label_values(&[spelling_type.as_ref()])
            .inc();
        debug!(
            index = %target.index,
            query_text = text,
            total = counts.total,
            stop = counts.stop,
            exact = counts.exact,
            missing = counts.missing,
            spelling_type = %spelling_type,
            "Classified query text"
        );

        Ok(spelling_type)
    }
}

fn probe_error(err: SearchError) -> SearchError {
    match err {
        SearchError::ClassificationProbe(_) => err,
        other => SearchError::ClassificationProbe(other.to_string()),
    }
}
