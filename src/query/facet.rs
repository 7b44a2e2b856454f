//! Facet requests: aggregation rendering and bucket parsing.

use crate::catalog::FieldName;
use crate::error::{Result, SearchError};
use crate::models::{FacetBucket, FacetResult, FacetStats};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Separator between a grouped facet's name and its sub-query label
pub const GROUP_SEPARATOR: &str = "__";

const DEFAULT_TERMS_SIZE: u32 = 10;
const DEFAULT_HISTOGRAM_INTERVAL: f64 = 1.0;

/// Bucket ordering of a terms facet
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermsOrder {
    /// Most frequent first
    #[default]
    Count,
    /// Alphabetical
    Term,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsFacet {
    pub field: String,
    #[serde(default = "default_terms_size")]
    pub size: u32,
    #[serde(default)]
    pub order: TermsOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistogramFacet {
    pub field: String,
    #[serde(default)]
    pub interval: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsFacet {
    pub field: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryGroupFacet {
    /// Label -> query string
    pub queries: BTreeMap<String, String>,
}

fn default_terms_size() -> u32 {
    DEFAULT_TERMS_SIZE
}

/// A facet request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FacetKind {
    Terms(TermsFacet),
    Histogram(HistogramFacet),
    Stats(StatsFacet),
    /// Named queries sent as one aggregation each. The parsed response holds
    /// the group under its own name with one bucket per label, plus each
    /// member as a single-bucket facet named `{name}__{label}`.
    QueryGroup(QueryGroupFacet),
}

impl FacetKind {
    pub fn terms(field: impl Into<String>) -> Self {
        FacetKind::Terms(TermsFacet {
            field: field.into(),
            size: DEFAULT_TERMS_SIZE,
            order: TermsOrder::Count,
        })
    }

    pub fn terms_with(field: impl Into<String>, size: u32, order: TermsOrder) -> Self {
        FacetKind::Terms(TermsFacet {
            field: field.into(),
            size,
            order,
        })
    }

    pub fn histogram(field: impl Into<String>, interval: Option<f64>) -> Self {
        FacetKind::Histogram(HistogramFacet {
            field: field.into(),
            interval,
        })
    }

    pub fn stats(field: impl Into<String>) -> Self {
        FacetKind::Stats(StatsFacet {
            field: field.into(),
        })
    }

    pub fn query_group<K: Into<String>, Q: Into<String>>(
        queries: impl IntoIterator<Item = (K, Q)>,
    ) -> Self {
        FacetKind::QueryGroup(QueryGroupFacet {
            queries: queries
                .into_iter()
                .map(|(label, query)| (label.into(), query.into()))
                .collect(),
        })
    }

    /// Grouped facets are flattened into one aggregation per sub-query
    pub fn is_group(&self) -> bool {
        matches!(self, FacetKind::QueryGroup(_))
    }

    /// Render the aggregation(s) of the facet registered as `name`
    pub fn render(&self, name: &str) -> Result<Vec<(String, Value)>> {
        match self {
            FacetKind::Terms(facet) => {
                let field = FieldName::new(facet.field.as_str())?;
                if facet.size == 0 {
                    return Err(SearchError::config(format!(
                        "Terms facet '{}' needs a positive size",
                        name
                    )));
                }
                let order = match facet.order {
                    TermsOrder::Count => json!({ "_count": "desc" }),
                    TermsOrder::Term => json!({ "_key": "asc" }),
                };
                Ok(vec![(
                    name.to_string(),
                    json!({
                        "terms": {
                            "field": field.as_str(),
                            "size": facet.size,
                            "order": order,
                        }
                    }),
                )])
            }
            FacetKind::Histogram(facet) => {
                let field = FieldName::new(facet.field.as_str())?;
                let interval = facet.interval.unwrap_or(DEFAULT_HISTOGRAM_INTERVAL);
                if !(interval > 0.0) {
                    return Err(SearchError::config(format!(
                        "Histogram facet '{}' needs a positive interval",
                        name
                    )));
                }
                Ok(vec![(
                    name.to_string(),
                    json!({
                        "histogram": {
                            "field": field.as_str(),
                            "interval": interval,
                            "min_doc_count": 1,
                        }
                    }),
                )])
            }
            FacetKind::Stats(facet) => {
                let field = FieldName::new(facet.field.as_str())?;
                Ok(vec![(
                    name.to_string(),
                    json!({ "stats": { "field": field.as_str() } }),
                )])
            }
            FacetKind::QueryGroup(facet) => {
                if facet.queries.is_empty() {
                    return Err(SearchError::config(format!(
                        "Query group facet '{}' has no queries",
                        name
                    )));
                }
                facet
                    .queries
                    .iter()
                    .map(|(label, query)| {
                        if query.trim().is_empty() {
                            return Err(SearchError::config(format!(
                                "Query group facet '{}' has an empty query for '{}'",
                                name, label
                            )));
                        }
                        Ok((
                            group_member_name(name, label),
                            json!({ "filter": { "query_string": { "query": query } } }),
                        ))
                    })
                    .collect()
            }
        }
    }

    /// Parse the aggregation results produced by [`FacetKind::render`].
    ///
    /// `aggregation` looks up a rendered aggregation by name.
    pub fn parse<'a>(
        &self,
        name: &str,
        aggregation: impl Fn(&str) -> Option<&'a Value>,
    ) -> Result<FacetResult> {
        match self {
            FacetKind::Terms(_) => {
                let raw = require(name, aggregation(name))?;
                let buckets = parse_buckets(name, raw)?;
                let others = raw
                    .get("sum_other_doc_count")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                Ok(FacetResult {
                    buckets,
                    has_others: others > 0,
                    stats: None,
                })
            }
            FacetKind::Histogram(_) => {
                let raw = require(name, aggregation(name))?;
                Ok(FacetResult {
                    buckets: parse_buckets(name, raw)?,
                    has_others: false,
                    stats: None,
                })
            }
            FacetKind::Stats(_) => {
                let raw = require(name, aggregation(name))?;
                let stats = FacetStats {
                    count: raw.get("count").and_then(Value::as_u64).unwrap_or(0),
                    min: raw.get("min").and_then(Value::as_f64),
                    max: raw.get("max").and_then(Value::as_f64),
                    avg: raw.get("avg").and_then(Value::as_f64),
                    sum: raw.get("sum").and_then(Value::as_f64).unwrap_or(0.0),
                };
                Ok(FacetResult {
                    buckets: Vec::new(),
                    has_others: false,
                    stats: Some(stats),
                })
            }
            FacetKind::QueryGroup(facet) => {
                let mut buckets = Vec::with_capacity(facet.queries.len());
                for label in facet.queries.keys() {
                    let member = group_member_name(name, label);
                    let raw = require(&member, aggregation(&member))?;
                    let count = raw.get("doc_count").and_then(Value::as_u64).ok_or_else(|| {
                        SearchError::MalformedResponse(format!(
                            "Aggregation '{}' has no doc_count",
                            member
                        ))
                    })?;
                    buckets.push(FacetBucket {
                        key: label.clone(),
                        count,
                    });
                }
                Ok(FacetResult {
                    buckets,
                    has_others: false,
                    stats: None,
                })
            }
        }
    }
}

/// Aggregation name of one member of a grouped facet
pub fn group_member_name(facet: &str, label: &str) -> String {
    format!("{}{}{}", facet, GROUP_SEPARATOR, label)
}

fn require<'a>(name: &str, raw: Option<&'a Value>) -> Result<&'a Value> {
    raw.ok_or_else(|| SearchError::MalformedResponse(format!("Missing aggregation '{}'", name)))
}

fn parse_buckets(name: &str, raw: &Value) -> Result<Vec<FacetBucket>> {
    let buckets = raw
        .get("buckets")
        .and_then(Value::as_array)
        .ok_or_else(|| {
            SearchError::MalformedResponse(format!("Aggregation '{}' has no buckets", name))
        })?;

    buckets
        .iter()
        .map(|bucket| {
            let key = bucket
                .get("key_as_string")
                .and_then(Value::as_str)
                .map(str::to_string)
                .or_else(|| bucket.get("key").map(bucket_key))
                .ok_or_else(|| {
                    SearchError::MalformedResponse(format!("Bucket without key in '{}'", name))
                })?;
            let count = bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0);
            Ok(FacetBucket { key, count })
        })
        .collect()
}

fn bucket_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", f as i64),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}
