//! Pure assembly of the search document from a configured request.
//!
//! Drill-down isolation: global filters join the main query, so hits and every
//! facet see them. Facet scoped filters go to `post_filter`, which narrows hits
//! only, and into the self-filter of every facet except the one they are
//! scoped to.

use crate::error::Result;
use crate::models::FacetScope;
use crate::query::filter::FilterClause;
use crate::query::request::SearchRequest;
use serde_json::{json, Map, Value};

/// Name of the phrase suggester in the assembled document
pub const SUGGESTER_NAME: &str = "did_you_mean";

/// Parts of the document computed outside of the pure assembly
#[derive(Debug, Clone, Default)]
pub struct DocumentParts {
    /// Fulltext clause, match-all when absent
    pub fulltext: Option<Value>,
    /// Rewritten sort clauses
    pub sort: Vec<Value>,
    /// Suggester body, when suggestions are wanted
    pub suggest: Option<Value>,
}

pub fn assemble_document(request: &SearchRequest, parts: DocumentParts) -> Result<Value> {
    let fulltext = parts.fulltext.unwrap_or_else(|| json!({ "match_all": {} }));

    let global = render_all(request.global_filters())?;
    let scoped = request
        .scoped_filters()
        .map(|(scope, clause)| Ok((scope, clause.render()?)))
        .collect::<Result<Vec<(&FacetScope, Value)>>>()?;

    let query = if global.is_empty() {
        fulltext
    } else {
        json!({ "bool": { "must": [fulltext], "filter": global } })
    };

    let mut document = Map::new();
    document.insert("query".into(), query);

    if !scoped.is_empty() {
        let clauses: Vec<Value> = scoped.iter().map(|(_, clause)| clause.clone()).collect();
        document.insert("post_filter".into(), json!({ "bool": { "filter": clauses } }));
    }

    let mut aggregations = Map::new();
    for (name, facet) in &request.facets {
        let self_filter = self_filter(name, &scoped);
        for (aggregation, body) in facet.render(name)? {
            aggregations.insert(
                aggregation.clone(),
                json!({
                    "filter": self_filter,
                    "aggs": { aggregation: body },
                }),
            );
        }
    }
    if !aggregations.is_empty() {
        document.insert("aggs".into(), Value::Object(aggregations));
    }

    document.insert("from".into(), json!(request.page.offset()));
    document.insert("size".into(), json!(request.page.size()));
    document.insert("track_total_hits".into(), json!(true));

    if !request.page.is_count_only() {
        if request.fields.is_empty() {
            document.insert("_source".into(), json!(false));
        } else {
            document.insert("_source".into(), json!(request.fields));
        }
        document.insert("track_scores".into(), json!(true));
        if !parts.sort.is_empty() {
            document.insert("sort".into(), Value::Array(parts.sort));
        }
    }

    if let Some(suggest) = parts.suggest {
        document.insert("suggest".into(), json!({ SUGGESTER_NAME: suggest }));
    }

    Ok(Value::Object(document))
}

/// Filter of facet `name`: every scoped filter except its own
fn self_filter(name: &str, scoped: &[(&FacetScope, Value)]) -> Value {
    let clauses: Vec<&Value> = scoped
        .iter()
        .filter(|(scope, _)| !scope.excludes(name))
        .map(|(_, clause)| clause)
        .collect();

    if clauses.is_empty() {
        json!({ "match_all": {} })
    } else {
        json!({ "bool": { "filter": clauses } })
    }
}

fn render_all<'a>(clauses: impl Iterator<Item = &'a FilterClause>) -> Result<Vec<Value>> {
    clauses.map(FilterClause::render).collect()
}
