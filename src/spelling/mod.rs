//! Spelling quality analysis of fulltext query text.

mod analyzer;
mod classification;

pub use analyzer::SpellingAnalyzer;
pub use classification::{
    absolute_cutoff, parse_term_vectors, SpellingType, TermCounts, TokenClass, TokenStats,
};
