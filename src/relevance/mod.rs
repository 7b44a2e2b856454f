//! Score optimizers layered onto assembled search documents.
//!
//! An optimizer is an admin defined rule plus a scoring model. Constant score
//! optimizers multiply the score of the rule matching documents; popularity
//! optimizers rescore the top hits by behavioral events. The composer applies
//! them in name order to every search of a matching query type.

mod composer;
mod constant_score;
mod optimizer;
mod percolation;
mod popularity;
mod rule;

pub use composer::RelevanceComposer;
pub use constant_score::ConstantScoreOptimizer;
pub use optimizer::{
    Optimizer, OptimizerContext, OptimizerDefinition, OptimizerModel, MIN_BOOST_PERCENT,
};
pub use percolation::OptimizerMatcher;
pub use popularity::{PopularityOptimizer, PopularityParams, ScaleFunction};
pub use rule::{escape, Operator, Rule};
