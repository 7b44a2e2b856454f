//! Storefront sort orders rewritten into engine sort clauses.
//!
//! Three storefront fields are virtual:
//!
//! * `relevance` is the engine score. `desc` means most relevant first.
//! * `position` is the merchandising position inside the active category,
//!   stored in the nested `category` documents. Without a category it
//!   degrades to relevance, ascending positions mapping to descending scores.
//! * `price` is the price book of the current customer group and website.
//!
//! Every other field goes through the attribute metadata. When no score sort
//! was requested, a descending score sort is appended as the tiebreaker.

use crate::catalog::fields::{
    price_field, CATEGORY_ID_FIELD, CATEGORY_PATH, CATEGORY_POSITION_FIELD, SCORE_FIELD,
};
use crate::catalog::{AttributeMetadata, LanguageCode};
use crate::error::Result;
use crate::models::{SortDirection, SortOrder};
use serde_json::{json, Value};

pub const RELEVANCE: &str = "relevance";
pub const POSITION: &str = "position";
pub const PRICE: &str = "price";

/// Inputs the sort rewrite depends on
pub struct SortContext<'a> {
    pub metadata: &'a dyn AttributeMetadata,
    pub language: &'a LanguageCode,
    pub category_id: Option<u64>,
    pub customer_group_id: u32,
    pub website_id: u32,
}

pub fn rewrite_sort(orders: &[SortOrder], context: &SortContext<'_>) -> Result<Vec<Value>> {
    let mut clauses = Vec::with_capacity(orders.len() + 1);
    let mut has_score = false;

    for order in orders {
        let clause = match order.field.as_str() {
            RELEVANCE => {
                has_score = true;
                score_sort(order.direction)
            }
            POSITION => match context.category_id {
                Some(category_id) => position_sort(category_id, order.direction),
                None => {
                    has_score = true;
                    score_sort(order.direction.reversed())
                }
            },
            PRICE => {
                let field = price_field(context.customer_group_id, context.website_id);
                json!({ field.as_str(): { "order": order.direction.as_ref(), "missing": "_last" } })
            }
            SCORE_FIELD => {
                has_score = true;
                score_sort(order.direction)
            }
            attribute => {
                let field = context
                    .metadata
                    .sortable_field_name(attribute, context.language)?;
                json!({ field.as_str(): { "order": order.direction.as_ref(), "missing": "_last" } })
            }
        };
        clauses.push(clause);
    }

    if !has_score {
        clauses.push(score_sort(SortDirection::Desc));
    }

    Ok(clauses)
}

/// Whether rendered sort clauses order by anything but the score
pub fn sorts_beyond_score(clauses: &[Value]) -> bool {
    clauses.iter().any(|clause| match clause {
        Value::String(field) => field != SCORE_FIELD,
        Value::Object(map) => map.keys().any(|field| field != SCORE_FIELD),
        _ => true,
    })
}

fn score_sort(direction: SortDirection) -> Value {
    json!({ SCORE_FIELD: { "order": direction.as_ref() } })
}

fn position_sort(category_id: u64, direction: SortDirection) -> Value {
    json!({
        CATEGORY_POSITION_FIELD: {
            "order": direction.as_ref(),
            "nested": {
                "path": CATEGORY_PATH,
                "filter": { "term": { CATEGORY_ID_FIELD: category_id } },
            },
            "missing": "_last",
        }
    })
}
