use crate::error::{Result, SearchError};
use crate::models::QueryType;
use crate::relevance::constant_score::ConstantScoreOptimizer;
use crate::relevance::popularity::{PopularityOptimizer, PopularityParams};
use crate::relevance::rule::Rule;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Lowest accepted boost, a -99% demotion
pub const MIN_BOOST_PERCENT: f64 = -99.0;

/// What the optimizers know about the search being assembled
#[derive(Debug, Clone)]
pub struct OptimizerContext {
    pub query_type: QueryType,
    /// Reference time of recency decays
    pub now: DateTime<Utc>,
    /// Size-0 searches are never optimized
    pub count_only: bool,
}

impl OptimizerContext {
    pub fn new(query_type: QueryType) -> Self {
        Self {
            query_type,
            now: Utc::now(),
            count_only: false,
        }
    }
}

/// A score optimizer rewriting an assembled document
pub trait Optimizer: Send + Sync {
    fn name(&self) -> &str;

    /// Model label used in logs and metrics
    fn model(&self) -> &'static str;

    /// Query types the optimizer is restricted to, empty means all
    fn query_types(&self) -> &[QueryType];

    /// Query selecting the documents the optimizer acts on
    fn filter(&self) -> Value;

    fn applies_to(&self, context: &OptimizerContext) -> bool {
        !context.count_only
            && (self.query_types().is_empty() || self.query_types().contains(&context.query_type))
    }

    /// Rewrite `document` in place. Returns whether anything was changed.
    fn apply(&self, document: &mut Value, context: &OptimizerContext) -> Result<bool>;
}

/// Scoring model of an optimizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OptimizerModel {
    ConstantScore { boost_percent: f64 },
    Popularity(PopularityParams),
}

/// Admin defined optimizer as stored in configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizerDefinition {
    pub name: String,

    #[serde(default)]
    pub query_types: Vec<QueryType>,

    /// Documents the optimizer is restricted to, all when absent
    #[serde(default)]
    pub rule: Option<Rule>,

    pub model: OptimizerModel,
}

impl OptimizerDefinition {
    pub fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(SearchError::config("Optimizer name must not be empty"));
        }
        if let Some(rule) = &self.rule {
            rule.render().map_err(|e| {
                SearchError::Configuration(format!("Optimizer '{}': {}", self.name, e))
            })?;
        }
        match &self.model {
            OptimizerModel::ConstantScore { boost_percent } => {
                if !boost_percent.is_finite() || *boost_percent < MIN_BOOST_PERCENT {
                    return Err(SearchError::Configuration(format!(
                        "Optimizer '{}': boost_percent must be >= {}",
                        self.name, MIN_BOOST_PERCENT
                    )));
                }
            }
            OptimizerModel::Popularity(params) => params.check().map_err(|e| {
                SearchError::Configuration(format!("Optimizer '{}': {}", self.name, e))
            })?,
        }
        Ok(())
    }

    pub fn build(&self) -> Result<Box<dyn Optimizer>> {
        self.check()?;

        let filter = match &self.rule {
            Some(rule) => json!({ "query_string": { "query": rule.render()? } }),
            None => json!({ "match_all": {} }),
        };

        let optimizer: Box<dyn Optimizer> = match &self.model {
            OptimizerModel::ConstantScore { boost_percent } => Box::new(ConstantScoreOptimizer::new(
                self.name.clone(),
                self.query_types.clone(),
                filter,
                *boost_percent,
            )),
            OptimizerModel::Popularity(params) => Box::new(PopularityOptimizer::new(
                self.name.clone(),
                self.query_types.clone(),
                self.rule.as_ref().map(|_| filter),
                params.clone(),
            )),
        };
        Ok(optimizer)
    }
}
