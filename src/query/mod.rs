//! Query assembly, dispatch and response parsing.
//!
//! A [`QueryBuilder`] collects the fulltext query, filters, facets, sort and
//! paging of one storefront search. On `search()` the fulltext clause is
//! chosen from the spelling classification of the text, filters are split
//! between the main query and the facet-scoped `post_filter`, optimizers
//! rewrite the document, and the response is parsed into a
//! [`SearchResponse`](crate::models::SearchResponse).

pub mod assembly;
mod builder;
pub mod facet;
pub mod filter;
mod fulltext;
pub mod parser;
mod request;
pub mod sort;

pub use builder::{QueryBuilder, QueryState};
pub use facet::{
    FacetKind, HistogramFacet, QueryGroupFacet, StatsFacet, TermsFacet, TermsOrder,
};
pub use filter::{FilterClause, QueryStringFilter, RangeFilter, TermsFilter};
pub use fulltext::FulltextQueryFactory;
pub use request::SearchRequest;
