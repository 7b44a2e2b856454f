//! Request and response data shared by the query builder and the collection adapter.

mod request;
mod response;

pub use request::{
    EntityId, FacetScope, FulltextQuery, PageParams, QueryType, SortDirection, SortOrder,
    StructuredValue,
};
pub use response::{FacetBucket, FacetResult, FacetStats, SearchHit, SearchResponse};
