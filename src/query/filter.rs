//! Filter clauses and their query document rendering.

use crate::catalog::FieldName;
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Exact value filter on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermsFilter {
    pub field: String,
    pub values: Vec<Value>,
}

/// Open or closed inclusive range on one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    pub field: String,
    #[serde(default)]
    pub from: Option<Value>,
    #[serde(default)]
    pub to: Option<Value>,
}

/// Escaped boolean expression built elsewhere, passed through verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryStringFilter {
    pub query: String,
}

/// A single filter condition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FilterClause {
    Terms(TermsFilter),
    Range(RangeFilter),
    QueryString(QueryStringFilter),
}

impl FilterClause {
    pub fn terms<V: Into<Value>>(
        field: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        FilterClause::Terms(TermsFilter {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        })
    }

    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::terms(field, [value.into()])
    }

    pub fn range(field: impl Into<String>, from: Option<Value>, to: Option<Value>) -> Self {
        FilterClause::Range(RangeFilter {
            field: field.into(),
            from,
            to,
        })
    }

    pub fn query_string(query: impl Into<String>) -> Self {
        FilterClause::QueryString(QueryStringFilter {
            query: query.into(),
        })
    }

    /// Field the clause restricts, if any
    pub fn field(&self) -> Option<&str> {
        match self {
            FilterClause::Terms(filter) => Some(&filter.field),
            FilterClause::Range(filter) => Some(&filter.field),
            FilterClause::QueryString(_) => None,
        }
    }

    /// Render into a query document fragment
    pub fn render(&self) -> Result<Value> {
        match self {
            FilterClause::Terms(filter) => {
                let field = FieldName::new(filter.field.as_str())?;
                if filter.values.is_empty() {
                    return Err(SearchError::config(format!(
                        "Terms filter on '{}' has no values",
                        field
                    )));
                }
                Ok(json!({ "terms": { field.as_str(): filter.values } }))
            }
            FilterClause::Range(filter) => {
                let field = FieldName::new(filter.field.as_str())?;
                let mut bounds = serde_json::Map::new();
                if let Some(from) = non_null(&filter.from) {
                    bounds.insert("gte".to_string(), from.clone());
                }
                if let Some(to) = non_null(&filter.to) {
                    bounds.insert("lte".to_string(), to.clone());
                }
                if bounds.is_empty() {
                    return Err(SearchError::config(format!(
                        "Range filter on '{}' needs a lower or an upper bound",
                        field
                    )));
                }
                Ok(json!({ "range": { field.as_str(): bounds } }))
            }
            FilterClause::QueryString(filter) => {
                if filter.query.trim().is_empty() {
                    return Err(SearchError::config("Query string filter is empty"));
                }
                Ok(json!({ "query_string": { "query": filter.query } }))
            }
        }
    }
}

fn non_null(value: &Option<Value>) -> Option<&Value> {
    value.as_ref().filter(|v| !v.is_null())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terms_filter_render() {
        let rendered = FilterClause::terms("color", [12, 14]).render().unwrap();
        assert_eq!(rendered, json!({ "terms": { "color": [12, 14] } }));
    }

    #[test]
    fn test_empty_terms_is_configuration_error() {
        let filter = FilterClause::terms("color", Vec::<Value>::new());
        assert!(filter.render().unwrap_err().is_configuration());
    }

    #[test]
    fn test_open_ended_range() {
        let rendered = FilterClause::range("price_0_1", Some(json!(10)), None)
            .render()
            .unwrap();
        assert_eq!(rendered, json!({ "range": { "price_0_1": { "gte": 10 } } }));

        let rendered = FilterClause::range("price_0_1", Some(Value::Null), Some(json!(50)))
            .render()
            .unwrap();
        assert_eq!(rendered, json!({ "range": { "price_0_1": { "lte": 50 } } }));
    }

    #[test]
    fn test_range_without_bounds_fails() {
        let filter = FilterClause::range("price_0_1", None, None);
        assert!(filter.render().unwrap_err().is_configuration());
    }

    #[test]
    fn test_query_string_passthrough() {
        let filter = FilterClause::query_string("category:(3 OR 4)");
        assert_eq!(
            filter.render().unwrap(),
            json!({ "query_string": { "query": "category:(3 OR 4)" } })
        );
        assert_eq!(filter.field(), None);
    }

    #[test]
    fn test_invalid_field_is_rejected() {
        let filter = FilterClause::term("Bad Field", 1);
        assert!(filter.render().is_err());
    }
}
