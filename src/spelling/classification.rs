//! Spelling quality tiers derived from term statistics.

use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use strum::{AsRefStr, Display, EnumString};

/// How well the literal query text matches the indexed vocabulary
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SpellingType {
    /// Every token is known verbatim (or is a stop term)
    Exact,
    /// Every token is known, some only after stemming
    MostlyExact,
    /// Some tokens are unknown
    MostlyFuzzy,
    /// No token is known
    Fuzzy,
    /// Every token is a high frequency term
    PureStopwords,
}

impl SpellingType {
    /// Matching had to tolerate spelling differences
    pub fn is_spellchecked(self) -> bool {
        !matches!(self, SpellingType::Exact | SpellingType::PureStopwords)
    }
}

/// Statistics of the token found at one position of the query text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenStats {
    pub position: u32,
    /// Document frequency under the stemmed analysis
    pub standard_doc_freq: u64,
    /// Document frequency under the whitespace analysis
    pub exact_doc_freq: u64,
}

/// Class of a single token position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenClass {
    Missing,
    Stop,
    Exact,
    Standard,
}

impl TokenStats {
    fn doc_freq(&self) -> u64 {
        self.standard_doc_freq.max(self.exact_doc_freq)
    }

    /// `cutoff` is the absolute document frequency above which a token is a stop term
    pub fn class(&self, cutoff: f64) -> TokenClass {
        let doc_freq = self.doc_freq();
        if doc_freq == 0 {
            TokenClass::Missing
        } else if doc_freq as f64 > cutoff {
            TokenClass::Stop
        } else if self.exact_doc_freq > 0 {
            TokenClass::Exact
        } else {
            TokenClass::Standard
        }
    }
}

/// Per query token counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TermCounts {
    pub total: usize,
    pub stop: usize,
    pub exact: usize,
    pub standard: usize,
    pub missing: usize,
}

impl TermCounts {
    pub fn from_tokens(tokens: &[TokenStats], cutoff: f64) -> Self {
        tokens.iter().fold(Self::default(), |mut counts, token| {
            counts.total += 1;
            match token.class(cutoff) {
                TokenClass::Missing => counts.missing += 1,
                TokenClass::Stop => counts.stop += 1,
                TokenClass::Exact => counts.exact += 1,
                TokenClass::Standard => counts.standard += 1,
            }
            counts
        })
    }

    /// Spelling tier of the counted query, first matching rule wins
    pub fn spelling_type(&self) -> SpellingType {
        // Nothing survived analysis, e.g. punctuation only
        if self.total == 0 {
            SpellingType::Exact
        } else if self.total == self.stop {
            SpellingType::PureStopwords
        } else if self.stop + self.exact == self.total {
            SpellingType::Exact
        } else if self.missing == 0 {
            SpellingType::MostlyExact
        } else if self.total > self.missing {
            SpellingType::MostlyFuzzy
        } else {
            SpellingType::Fuzzy
        }
    }
}

/// Relative cutoff frequency turned into an absolute document frequency
pub fn absolute_cutoff(cutoff_frequency: f64, doc_count: u64) -> f64 {
    cutoff_frequency * doc_count as f64
}

/// Merge the two analyzed fields of a term vectors response into per position stats
pub fn parse_term_vectors(
    response: &Value,
    standard_field: &str,
    whitespace_field: &str,
) -> Result<Vec<TokenStats>> {
    let vectors = response.get("term_vectors").ok_or_else(|| {
        SearchError::ClassificationProbe("Term vectors response has no term_vectors".into())
    })?;

    let mut positions: BTreeMap<u32, TokenStats> = BTreeMap::new();

    for (field, exact) in [(standard_field, false), (whitespace_field, true)] {
        let terms = match vectors.get(field).and_then(|f| f.get("terms")) {
            Some(Value::Object(terms)) => terms,
            Some(_) => {
                return Err(SearchError::ClassificationProbe(format!(
                    "Terms of '{}' are not an object",
                    field
                )))
            }
            // Nothing analyzed out of the text for this field
            None => continue,
        };

        for stats in terms.values() {
            let doc_freq = stats.get("doc_freq").and_then(Value::as_u64).unwrap_or(0);
            let tokens = stats.get("tokens").and_then(Value::as_array).ok_or_else(|| {
                SearchError::ClassificationProbe(format!(
                    "Term of '{}' carries no token positions",
                    field
                ))
            })?;

            for token in tokens {
                let Some(position) = token.get("position").and_then(Value::as_u64) else {
                    continue;
                };
                let entry = positions.entry(position as u32).or_insert_with(|| TokenStats {
                    position: position as u32,
                    ..TokenStats::default()
                });
                if exact {
                    entry.exact_doc_freq = entry.exact_doc_freq.max(doc_freq);
                } else {
                    entry.standard_doc_freq = entry.standard_doc_freq.max(doc_freq);
                }
            }
        }
    }

    Ok(positions.into_values().collect())
}
