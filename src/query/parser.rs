//! Engine response parsing.

use crate::error::{Result, SearchError};
use crate::models::{EntityId, FacetResult, SearchHit, SearchResponse};
use crate::query::assembly::SUGGESTER_NAME;
use crate::query::facet::{group_member_name, FacetKind};
use crate::transport::error_reason;
use serde_json::Value;
use std::collections::HashMap;

/// Parse hits, totals, facets and suggestions out of a raw search response
pub fn parse_response(raw: &Value, facets: &[(String, FacetKind)]) -> Result<SearchResponse> {
    if let Some(reason) = error_reason(raw) {
        let status = raw
            .get("status")
            .and_then(Value::as_u64)
            .and_then(|s| u16::try_from(s).ok());
        return Err(SearchError::Engine { status, reason });
    }

    let hits = raw
        .get("hits")
        .ok_or_else(|| SearchError::MalformedResponse("Response has no hits".into()))?;

    let total_count = parse_total(hits.get("total"))?;

    let hits = match hits.get("hits") {
        Some(Value::Array(hits)) => hits.iter().map(parse_hit).collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
        Some(_) => {
            return Err(SearchError::MalformedResponse(
                "hits.hits is not an array".into(),
            ))
        }
    };

    let aggregations = raw.get("aggregations");
    let mut parsed_facets = HashMap::with_capacity(facets.len());
    for (name, facet) in facets {
        let result = facet.parse(name, |aggregation| {
            aggregations
                .and_then(|aggs| aggs.get(aggregation))
                .and_then(|wrapper| wrapper.get(aggregation))
        })?;
        if facet.is_group() {
            for bucket in &result.buckets {
                parsed_facets.insert(
                    group_member_name(name, &bucket.key),
                    FacetResult {
                        buckets: vec![bucket.clone()],
                        ..FacetResult::default()
                    },
                );
            }
        }
        parsed_facets.insert(name.clone(), result);
    }

    Ok(SearchResponse {
        total_count,
        hits,
        facets: parsed_facets,
        suggestions: parse_suggestions(raw),
        took_ms: raw.get("took").and_then(Value::as_u64).unwrap_or(0),
        ..SearchResponse::default()
    })
}

/// `hits.total` is a number on old clusters and `{value, relation}` on recent ones
fn parse_total(total: Option<&Value>) -> Result<u64> {
    match total {
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::Object(total)) => total.get("value").and_then(Value::as_u64),
        _ => None,
    }
    .ok_or_else(|| SearchError::MalformedResponse("Response has no hits total".into()))
}

fn parse_hit(hit: &Value) -> Result<SearchHit> {
    let entity_id = match hit.get("_id") {
        Some(Value::String(id)) => id.parse::<EntityId>().ok(),
        Some(Value::Number(id)) => id.as_u64(),
        _ => None,
    }
    .ok_or_else(|| SearchError::MalformedResponse(format!("Hit without a numeric _id: {}", hit)))?;

    let fields = hit
        .get("_source")
        .or_else(|| hit.get("fields"))
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    Ok(SearchHit {
        entity_id,
        score: hit.get("_score").and_then(Value::as_f64),
        fields,
    })
}

fn parse_suggestions(raw: &Value) -> Vec<String> {
    raw.get("suggest")
        .and_then(|suggest| suggest.get(SUGGESTER_NAME))
        .and_then(Value::as_array)
        .map(|entries| {
            entries
                .iter()
                .filter_map(|entry| entry.get("options").and_then(Value::as_array))
                .flatten()
                .filter_map(|option| option.get("text").and_then(Value::as_str))
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
