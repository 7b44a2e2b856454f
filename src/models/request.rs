use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

/// Catalog entity (product) identifier
pub type EntityId = u64;

/// Sort direction
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn reversed(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Requested sort, expressed on storefront attribute codes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: String,
    pub direction: SortDirection,
}

impl SortOrder {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }
}

/// Facet a filter must be excluded from
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FacetScope {
    /// Applies to the result set and every facet (`_none_`)
    #[default]
    Global,
    /// Applies to the result set and every facet except the named one
    Facet(String),
}

impl FacetScope {
    /// Wire key of the global scope
    pub const NONE: &'static str = "_none_";

    pub fn facet(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == Self::NONE {
            FacetScope::Global
        } else {
            FacetScope::Facet(name)
        }
    }

    pub fn key(&self) -> &str {
        match self {
            FacetScope::Global => Self::NONE,
            FacetScope::Facet(name) => name,
        }
    }

    /// Whether filters under this scope must be left out of `facet`'s counts
    pub fn excludes(&self, facet: &str) -> bool {
        matches!(self, FacetScope::Facet(name) if name == facet)
    }
}

impl From<String> for FacetScope {
    fn from(value: String) -> Self {
        FacetScope::facet(value)
    }
}

impl From<FacetScope> for String {
    fn from(scope: FacetScope) -> Self {
        scope.key().to_string()
    }
}

impl fmt::Display for FacetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Zero based pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageParams {
    offset: u64,
    size: u64,
}

impl PageParams {
    /// Convert a 1-based storefront page. Pages below 1 and sizes below 1 are floored to 1.
    pub fn from_page(page: i64, size: i64) -> Self {
        let page = page.max(1) as u64;
        let size = size.max(1) as u64;
        Self {
            offset: size.saturating_mul(page - 1),
            size,
        }
    }

    /// Explicit window; a zero size asks for totals and facets only
    pub fn new(offset: u64, size: u64) -> Self {
        Self { offset, size }
    }

    pub fn count_only() -> Self {
        Self { offset: 0, size: 0 }
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn is_count_only(&self) -> bool {
        self.size == 0
    }
}

impl Default for PageParams {
    fn default() -> Self {
        Self::from_page(1, 20)
    }
}

/// One value of a structured (non fulltext) query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredValue {
    Range {
        from: Option<serde_json::Value>,
        to: Option<serde_json::Value>,
    },
    Value(serde_json::Value),
}

/// Text typed by the shopper, or a field map used by internal tooling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FulltextQuery {
    Text(String),
    Structured(BTreeMap<String, StructuredValue>),
}

impl FulltextQuery {
    pub fn text(&self) -> Option<&str> {
        match self {
            FulltextQuery::Text(text) => Some(text),
            FulltextQuery::Structured(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            FulltextQuery::Text(text) => text.trim().is_empty(),
            FulltextQuery::Structured(fields) => fields.is_empty(),
        }
    }
}

impl From<&str> for FulltextQuery {
    fn from(text: &str) -> Self {
        FulltextQuery::Text(text.to_string())
    }
}

impl From<String> for FulltextQuery {
    fn from(text: String) -> Self {
        FulltextQuery::Text(text)
    }
}

impl From<BTreeMap<String, StructuredValue>> for FulltextQuery {
    fn from(fields: BTreeMap<String, StructuredValue>) -> Self {
        FulltextQuery::Structured(fields)
    }
}

/// Kind of storefront page issuing the search
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QueryType {
    /// Free text search result page
    Fulltext,
    /// Category page browsed through layered navigation
    LayeredNavigation,
}
