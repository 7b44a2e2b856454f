//! Typed search-engine field naming.
//!
//! Field names are derived from an attribute definition, a language and the
//! usage the field is needed for. Every produced name is validated once and
//! memoized per index schema version.

use crate::catalog::attributes::{AttributeDefinition, AttributeType};
use crate::error::{Result, SearchError};
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use strum::{AsRefStr, Display, EnumString};

lazy_static! {
    static ref FIELD_NAME_PATTERN: Regex =
        Regex::new(r"^[a-z_][a-z0-9_]*(\.[a-z0-9_]+)*$").expect("valid field name pattern");
    static ref LANGUAGE_PATTERN: Regex = Regex::new(r"^[a-z]{2,3}$").expect("valid language pattern");
}

/// Nested path holding per-category merchandising positions
pub const CATEGORY_PATH: &str = "category";
pub const CATEGORY_ID_FIELD: &str = "category.category_id";
pub const CATEGORY_POSITION_FIELD: &str = "category.position";

/// Engine native relevance score
pub const SCORE_FIELD: &str = "_score";

/// Field holding the catalog entity id of a document
pub const ENTITY_ID_FIELD: &str = "entity_id";

/// What a field is used for
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FieldUsage {
    Search,
    Filter,
    Sort,
    Facet,
}

/// Analyzer variant of a localized text field
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Analyzer {
    /// Locale stemmed analysis (the main field itself)
    Standard,
    Whitespace,
    Shingle,
    Phonetic,
}

impl Analyzer {
    fn suffix(self) -> Option<&'static str> {
        match self {
            Analyzer::Standard => None,
            Analyzer::Whitespace => Some("whitespace"),
            Analyzer::Shingle => Some("shingle"),
            Analyzer::Phonetic => Some("phonetic"),
        }
    }
}

/// Two or three letter analysis language, e.g. `en`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    pub fn new(code: impl Into<String>) -> Result<Self> {
        let code = code.into().to_lowercase();
        if !LANGUAGE_PATTERN.is_match(&code) {
            return Err(SearchError::config(format!("Invalid language code '{}'", code)));
        }
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = SearchError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

impl fmt::Display for LanguageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A validated engine field name
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldName(String);

impl FieldName {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if !FIELD_NAME_PATTERN.is_match(&name) {
            return Err(SearchError::config(format!("Invalid field name '{}'", name)));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The analyzer subfield of this field (`name_en` -> `name_en.whitespace`)
    pub fn with_analyzer(&self, analyzer: Analyzer) -> FieldName {
        match analyzer.suffix() {
            Some(suffix) => FieldName(format!("{}.{}", self.0, suffix)),
            None => self.clone(),
        }
    }

    /// `field^weight` notation used by multi-field matches
    pub fn weighted(&self, weight: f64) -> String {
        if (weight - 1.0).abs() < f64::EPSILON {
            self.0.clone()
        } else {
            format!("{}^{}", self.0, weight)
        }
    }
}

impl TryFrom<String> for FieldName {
    type Error = SearchError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<FieldName> for String {
    fn from(name: FieldName) -> Self {
        name.0
    }
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Resolve the engine field of an attribute for a language and usage
pub fn field_name(
    attribute: &AttributeDefinition,
    language: &LanguageCode,
    usage: FieldUsage,
) -> Result<FieldName> {
    let localized = attribute.localized && attribute.backend_type == AttributeType::Text;

    let name = if !localized {
        attribute.code.clone()
    } else {
        match usage {
            FieldUsage::Search => format!("{}_{}", attribute.code, language),
            FieldUsage::Filter | FieldUsage::Facet => {
                format!("{}_{}.untouched", attribute.code, language)
            }
            FieldUsage::Sort => format!("sort_by_{}_{}", attribute.code, language),
        }
    };

    FieldName::new(name)
}

/// Spelling probe field, analyzed with the locale stemmer
pub fn spelling_field(language: &LanguageCode) -> FieldName {
    FieldName(format!("spelling_{}", language))
}

/// Catch-all search field every searchable attribute is copied to
pub fn search_all_field(language: &LanguageCode) -> FieldName {
    FieldName(format!("search_{}", language))
}

/// Price book field of a customer group on a website
pub fn price_field(customer_group_id: u32, website_id: u32) -> FieldName {
    FieldName(format!("price_{}_{}", customer_group_id, website_id))
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct FieldKey {
    attribute: String,
    language: LanguageCode,
    usage: FieldUsage,
}

/// Memoized field names, discarded whenever the index schema version changes
#[derive(Debug, Default)]
pub struct FieldNameCache {
    inner: RwLock<FieldCacheState>,
}

#[derive(Debug, Default)]
struct FieldCacheState {
    schema_version: u64,
    names: HashMap<FieldKey, FieldName>,
}

impl FieldNameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolve(
        &self,
        schema_version: u64,
        attribute: &AttributeDefinition,
        language: &LanguageCode,
        usage: FieldUsage,
    ) -> Result<FieldName> {
        let key = FieldKey {
            attribute: attribute.code.clone(),
            language: language.clone(),
            usage,
        };

        {
            let state = self.inner.read();
            if state.schema_version == schema_version {
                if let Some(name) = state.names.get(&key) {
                    return Ok(name.clone());
                }
            }
        }

        let name = field_name(attribute, language, usage)?;

        let mut state = self.inner.write();
        if state.schema_version != schema_version {
            tracing::debug!(
                from = state.schema_version,
                to = schema_version,
                "Schema version changed, dropping cached field names"
            );
            state.names.clear();
            state.schema_version = schema_version;
        }
        state.names.insert(key, name.clone());
        Ok(name)
    }

    pub fn len(&self) -> usize {
        self.inner.read().names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
