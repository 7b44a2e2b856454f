//! Popularity rescoring from child event documents.
//!
//! The top `window_size` hits are rescored by the number of behavioral events
//! (views, orders) recorded against them as child documents, scaled by a
//! modifier and decayed by event age.

use crate::error::{Result, SearchError};
use crate::models::QueryType;
use crate::query::sort::sorts_beyond_score;
use crate::relevance::optimizer::{Optimizer, OptimizerContext};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use strum::{AsRefStr, Display, EnumString};
use tracing::debug;

/// Modifier applied to the event count before it becomes a score
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ScaleFunction {
    #[default]
    Log1p,
    Sqrt,
    #[serde(rename = "none")]
    #[strum(serialize = "none")]
    Linear,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopularityParams {
    /// Child document type holding the events
    pub event_type: String,

    #[serde(default = "default_count_field")]
    pub count_field: String,

    #[serde(default = "default_date_field")]
    pub date_field: String,

    #[serde(default)]
    pub scale_function: ScaleFunction,

    /// Decay origin, the search time when absent
    #[serde(default)]
    pub origin: Option<String>,

    /// Distance from the origin at which the score is multiplied by `decay`
    #[serde(default = "default_scale")]
    pub scale: String,

    #[serde(default = "default_offset")]
    pub offset: String,

    #[serde(default = "default_decay")]
    pub decay: f64,

    /// Number of top hits rescored
    #[serde(default = "default_window_size")]
    pub window_size: u32,

    #[serde(default = "default_weight")]
    pub query_weight: f64,

    #[serde(default = "default_weight")]
    pub rescore_weight: f64,
}

fn default_count_field() -> String {
    "count".to_string()
}

fn default_date_field() -> String {
    "date".to_string()
}

fn default_scale() -> String {
    "30d".to_string()
}

fn default_offset() -> String {
    "0d".to_string()
}

fn default_decay() -> f64 {
    0.5
}

fn default_window_size() -> u32 {
    200
}

fn default_weight() -> f64 {
    1.0
}

impl PopularityParams {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            count_field: default_count_field(),
            date_field: default_date_field(),
            scale_function: ScaleFunction::default(),
            origin: None,
            scale: default_scale(),
            offset: default_offset(),
            decay: default_decay(),
            window_size: default_window_size(),
            query_weight: default_weight(),
            rescore_weight: default_weight(),
        }
    }

    pub fn check(&self) -> Result<()> {
        if self.event_type.trim().is_empty() {
            return Err(SearchError::config("event_type must not be empty"));
        }
        if !(self.decay > 0.0 && self.decay < 1.0) {
            return Err(SearchError::config("decay must be strictly between 0 and 1"));
        }
        if self.window_size == 0 {
            return Err(SearchError::config("window_size must be positive"));
        }
        if self.scale.trim().is_empty() {
            return Err(SearchError::config("scale must not be empty"));
        }
        Ok(())
    }
}

pub struct PopularityOptimizer {
    name: String,
    query_types: Vec<QueryType>,
    filter: Option<Value>,
    params: PopularityParams,
}

impl PopularityOptimizer {
    pub fn new(
        name: String,
        query_types: Vec<QueryType>,
        filter: Option<Value>,
        params: PopularityParams,
    ) -> Self {
        Self {
            name,
            query_types,
            filter,
            params,
        }
    }

    fn rescore_query(&self, context: &OptimizerContext) -> Value {
        let params = &self.params;
        let origin = params
            .origin
            .clone()
            .unwrap_or_else(|| context.now.to_rfc3339_opts(SecondsFormat::Secs, true));

        let events = json!({
            "has_child": {
                "type": params.event_type,
                "score_mode": "sum",
                "query": {
                    "function_score": {
                        "functions": [
                            {
                                "field_value_factor": {
                                    "field": params.count_field,
                                    "modifier": params.scale_function.as_ref(),
                                    "missing": 0,
                                }
                            },
                            {
                                "gauss": {
                                    params.date_field.as_str(): {
                                        "origin": origin,
                                        "scale": params.scale,
                                        "offset": params.offset,
                                        "decay": params.decay,
                                    }
                                }
                            }
                        ],
                        "score_mode": "multiply",
                        "boost_mode": "replace",
                    }
                }
            }
        });

        match &self.filter {
            Some(filter) => json!({ "bool": { "must": [events], "filter": [filter] } }),
            None => events,
        }
    }
}

impl Optimizer for PopularityOptimizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &'static str {
        "popularity"
    }

    fn query_types(&self) -> &[QueryType] {
        &self.query_types
    }

    fn filter(&self) -> Value {
        self.filter
            .clone()
            .unwrap_or_else(|| json!({ "match_all": {} }))
    }

    fn apply(&self, document: &mut Value, context: &OptimizerContext) -> Result<bool> {
        let sorted = document
            .get("sort")
            .and_then(Value::as_array)
            .is_some_and(|sort| sorts_beyond_score(sort));
        if sorted {
            // Rescoring is rejected by the engine alongside a field sort
            debug!(optimizer = %self.name, "Skipping popularity rescore on a field sorted search");
            return Ok(false);
        }

        let rescore = json!({
            "window_size": self.params.window_size,
            "query": {
                "rescore_query": self.rescore_query(context),
                "query_weight": self.params.query_weight,
                "rescore_query_weight": self.params.rescore_weight,
                "score_mode": "total",
            }
        });

        let object = document
            .as_object_mut()
            .ok_or_else(|| SearchError::config("Search document is not an object"))?;
        match object.get_mut("rescore") {
            Some(Value::Array(entries)) => entries.push(rescore),
            _ => {
                object.insert("rescore".into(), Value::Array(vec![rescore]));
            }
        }

        Ok(true)
    }
}
