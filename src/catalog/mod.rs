//! Catalog collaborators: attribute metadata, field naming and store context.

mod attributes;
pub mod fields;
mod store;

pub use attributes::{
    weighted_search_fields, AttributeDefinition, AttributeMetadata, AttributeType,
    StaticAttributeCatalog,
};
pub use fields::{Analyzer, FieldName, FieldNameCache, FieldUsage, LanguageCode};
pub use store::{StaticStoreContext, StoreContext};
