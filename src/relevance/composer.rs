use crate::error::Result;
use crate::metrics::OPTIMIZERS_APPLIED_TOTAL;
use crate::relevance::optimizer::{Optimizer, OptimizerContext, OptimizerDefinition};
use serde_json::Value;
use tracing::debug;

/// Applies the configured optimizers to assembled documents, ordered by name
#[derive(Default)]
pub struct RelevanceComposer {
    optimizers: Vec<Box<dyn Optimizer>>,
}

impl RelevanceComposer {
    pub fn new(mut optimizers: Vec<Box<dyn Optimizer>>) -> Self {
        optimizers.sort_by(|a, b| a.name().cmp(b.name()));
        Self { optimizers }
    }

    pub fn from_definitions(definitions: &[OptimizerDefinition]) -> Result<Self> {
        let optimizers = definitions
            .iter()
            .map(OptimizerDefinition::build)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(optimizers))
    }

    pub fn optimizers(&self) -> &[Box<dyn Optimizer>] {
        &self.optimizers
    }

    pub fn names(&self) -> Vec<&str> {
        self.optimizers.iter().map(|o| o.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.optimizers.is_empty()
    }

    /// Rewrite `document` with every optimizer applying to `context`.
    ///
    /// Returns the names of the optimizers that changed the document.
    pub fn apply(&self, document: &mut Value, context: &OptimizerContext) -> Result<Vec<String>> {
        let mut applied = Vec::new();

        for optimizer in self.optimizers.iter().filter(|o| o.applies_to(context)) {
            if optimizer.apply(document, context)? {
                OPTIMIZERS_APPLIED_TOTAL
                    .with_label_values(&[optimizer.model()])
                    .inc();
                applied.push(optimizer.name().to_string());
            }
        }

        if !applied.is_empty() {
            debug!(optimizers = ?applied, query_type = %context.query_type, "Applied optimizers");
        }
        Ok(applied)
    }
}
