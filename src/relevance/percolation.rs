//! Reverse matching of one product against the optimizer rules.

use crate::error::{Result, SearchError};
use crate::models::EntityId;
use crate::relevance::composer::RelevanceComposer;
use crate::transport::{SearchTarget, SearchTransport};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::debug;

const AGGREGATION: &str = "optimizers";

/// Answers which optimizers act on a given product, in a single request
pub struct OptimizerMatcher {
    transport: Arc<dyn SearchTransport>,
    target: SearchTarget,
    composer: Arc<RelevanceComposer>,
}

impl OptimizerMatcher {
    pub fn new(
        transport: Arc<dyn SearchTransport>,
        target: SearchTarget,
        composer: Arc<RelevanceComposer>,
    ) -> Self {
        Self {
            transport,
            target,
            composer,
        }
    }

    /// Size-0 document testing every optimizer filter against `entity_id`
    pub fn matching_document(&self, entity_id: EntityId) -> Value {
        let filters: Map<String, Value> = self
            .composer
            .optimizers()
            .iter()
            .map(|optimizer| (optimizer.name().to_string(), optimizer.filter()))
            .collect();

        json!({
            "size": 0,
            "query": { "ids": { "values": [entity_id.to_string()] } },
            "aggs": { AGGREGATION: { "filters": { "filters": filters } } },
        })
    }

    /// Names of the optimizers whose rule matches the product, ordered by name
    pub async fn matching_optimizers(&self, entity_id: EntityId) -> Result<Vec<String>> {
        if self.composer.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .transport
            .search(&self.target, &self.matching_document(entity_id))
            .await?;

        let buckets = response
            .get("aggregations")
            .and_then(|aggs| aggs.get(AGGREGATION))
            .and_then(|agg| agg.get("buckets"))
            .and_then(Value::as_object)
            .ok_or_else(|| {
                SearchError::MalformedResponse("Optimizer matching response has no buckets".into())
            })?;

        let matching: Vec<String> = self
            .composer
            .names()
            .into_iter()
            .filter(|name| {
                buckets
                    .get(*name)
                    .and_then(|bucket| bucket.get("doc_count"))
                    .and_then(Value::as_u64)
                    .unwrap_or(0)
                    > 0
            })
            .map(str::to_string)
            .collect();

        debug!(entity_id, optimizers = ?matching, "Matched optimizers");
        Ok(matching)
    }
}
