use crate::error::Result;
use crate::models::QueryType;
use crate::relevance::optimizer::{Optimizer, OptimizerContext};
use serde_json::{json, Value};

/// Multiplies the score of rule matching documents by a constant factor
pub struct ConstantScoreOptimizer {
    name: String,
    query_types: Vec<QueryType>,
    filter: Value,
    boost_percent: f64,
}

impl ConstantScoreOptimizer {
    pub fn new(name: String, query_types: Vec<QueryType>, filter: Value, boost_percent: f64) -> Self {
        Self {
            name,
            query_types,
            filter,
            boost_percent,
        }
    }

    /// `+20%` is a 1.2 weight, `-50%` a 0.5 weight
    pub fn weight(&self) -> f64 {
        1.0 + self.boost_percent / 100.0
    }
}

impl Optimizer for ConstantScoreOptimizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &'static str {
        "constant_score"
    }

    fn query_types(&self) -> &[QueryType] {
        &self.query_types
    }

    fn filter(&self) -> Value {
        self.filter.clone()
    }

    fn apply(&self, document: &mut Value, _context: &OptimizerContext) -> Result<bool> {
        let function = json!({ "filter": self.filter, "weight": self.weight() });
        let query = document
            .get_mut("query")
            .map(Value::take)
            .unwrap_or_else(|| json!({ "match_all": {} }));

        document["query"] = with_function(query, function);
        Ok(true)
    }
}

/// Add a scoring function, reusing a function score query produced by an earlier optimizer
fn with_function(mut query: Value, function: Value) -> Value {
    if let Some(functions) = query
        .get_mut("function_score")
        .and_then(|fs| fs.get_mut("functions"))
        .and_then(Value::as_array_mut)
    {
        functions.push(function);
        return query;
    }

    json!({
        "function_score": {
            "query": query,
            "functions": [function],
            "score_mode": "multiply",
            "boost_mode": "multiply",
        }
    })
}
