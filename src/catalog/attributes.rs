//! Attribute metadata consumed by query assembly.

use crate::catalog::fields::{self, Analyzer, FieldName, FieldNameCache, FieldUsage, LanguageCode};
use crate::error::{Result, SearchError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Backend type of a catalog attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Text,
    Integer,
    Decimal,
    Boolean,
    Date,
}

/// Search relevant description of one catalog attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDefinition {
    pub code: String,
    pub backend_type: AttributeType,
    #[serde(default)]
    pub localized: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default = "default_weight")]
    pub search_weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

impl AttributeDefinition {
    pub fn new(code: impl Into<String>, backend_type: AttributeType) -> Self {
        Self {
            code: code.into(),
            backend_type,
            localized: false,
            searchable: false,
            filterable: false,
            sortable: false,
            search_weight: 1.0,
        }
    }

    pub fn text(code: impl Into<String>) -> Self {
        Self::new(code, AttributeType::Text)
    }

    pub fn integer(code: impl Into<String>) -> Self {
        Self::new(code, AttributeType::Integer)
    }

    pub fn decimal(code: impl Into<String>) -> Self {
        Self::new(code, AttributeType::Decimal)
    }

    pub fn localized(mut self) -> Self {
        self.localized = true;
        self
    }

    pub fn searchable(mut self, weight: f64) -> Self {
        self.searchable = true;
        self.search_weight = weight;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    fn is_text(&self) -> bool {
        self.backend_type == AttributeType::Text
    }
}

/// Attribute metadata collaborator
pub trait AttributeMetadata: Send + Sync {
    fn is_searchable(&self, attribute: &str) -> bool;

    fn is_filterable(&self, attribute: &str) -> bool;

    fn search_weight(&self, attribute: &str) -> f64;

    fn field_name(
        &self,
        attribute: &str,
        language: &LanguageCode,
        usage: FieldUsage,
    ) -> Result<FieldName>;

    fn sortable_field_name(&self, attribute: &str, language: &LanguageCode) -> Result<FieldName>;

    /// Codes of all searchable attributes, in a stable order
    fn searchable_attributes(&self) -> Vec<String>;

    /// Whether the attribute is analyzed text (and carries analyzer subfields)
    fn is_text(&self, attribute: &str) -> bool;

    /// Version of the index schema the names are valid for
    fn schema_version(&self) -> u64 {
        0
    }
}

/// Searchable fields of a language with their weights, for one analyzer.
///
/// The catch-all field is always part of the list with weight 1. Non-text
/// attributes only participate in the standard analysis.
pub fn weighted_search_fields(
    metadata: &dyn AttributeMetadata,
    language: &LanguageCode,
    analyzer: Analyzer,
    weight_multiplier: f64,
) -> Result<Vec<(FieldName, f64)>> {
    let mut fields = vec![(
        fields::search_all_field(language).with_analyzer(analyzer),
        weight_multiplier,
    )];

    for code in metadata.searchable_attributes() {
        if analyzer != Analyzer::Standard && !metadata.is_text(&code) {
            continue;
        }
        let field = metadata
            .field_name(&code, language, FieldUsage::Search)?
            .with_analyzer(analyzer);
        fields.push((field, metadata.search_weight(&code) * weight_multiplier));
    }

    Ok(fields)
}

/// Attribute metadata held in memory, typically loaded once from the platform
#[derive(Debug, Default)]
pub struct StaticAttributeCatalog {
    attributes: BTreeMap<String, AttributeDefinition>,
    schema_version: u64,
    names: FieldNameCache,
}

impl StaticAttributeCatalog {
    pub fn new(attributes: impl IntoIterator<Item = AttributeDefinition>) -> Self {
        Self {
            attributes: attributes
                .into_iter()
                .map(|attribute| (attribute.code.clone(), attribute))
                .collect(),
            schema_version: 0,
            names: FieldNameCache::new(),
        }
    }

    pub fn with_schema_version(mut self, version: u64) -> Self {
        self.schema_version = version;
        self
    }

    pub fn attribute(&self, code: &str) -> Option<&AttributeDefinition> {
        self.attributes.get(code)
    }

    fn require(&self, code: &str) -> Result<&AttributeDefinition> {
        self.attributes
            .get(code)
            .ok_or_else(|| SearchError::config(format!("Unknown attribute '{}'", code)))
    }
}

impl AttributeMetadata for StaticAttributeCatalog {
    fn is_searchable(&self, attribute: &str) -> bool {
        self.attributes.get(attribute).is_some_and(|a| a.searchable)
    }

    fn is_filterable(&self, attribute: &str) -> bool {
        self.attributes.get(attribute).is_some_and(|a| a.filterable)
    }

    fn search_weight(&self, attribute: &str) -> f64 {
        self.attributes
            .get(attribute)
            .map(|a| a.search_weight)
            .unwrap_or(1.0)
    }

    fn field_name(
        &self,
        attribute: &str,
        language: &LanguageCode,
        usage: FieldUsage,
    ) -> Result<FieldName> {
        let definition = self.require(attribute)?;
        self.names
            .resolve(self.schema_version, definition, language, usage)
    }

    fn sortable_field_name(&self, attribute: &str, language: &LanguageCode) -> Result<FieldName> {
        let definition = self.require(attribute)?;
        if !definition.sortable {
            return Err(SearchError::config(format!(
                "Attribute '{}' is not sortable",
                attribute
            )));
        }
        self.names
            .resolve(self.schema_version, definition, language, FieldUsage::Sort)
    }

    fn searchable_attributes(&self) -> Vec<String> {
        self.attributes
            .values()
            .filter(|a| a.searchable)
            .map(|a| a.code.clone())
            .collect()
    }

    fn is_text(&self, attribute: &str) -> bool {
        self.attributes.get(attribute).is_some_and(|a| a.is_text())
    }

    fn schema_version(&self) -> u64 {
        self.schema_version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> StaticAttributeCatalog {
        StaticAttributeCatalog::new(vec![
            AttributeDefinition::text("name").localized().searchable(10.0).sortable(),
            AttributeDefinition::text("sku").searchable(5.0),
            AttributeDefinition::integer("color").filterable(),
            AttributeDefinition::integer("size").searchable(2.0),
        ])
    }

    #[test]
    fn test_metadata_lookups() {
        let catalog = catalog();
        assert!(catalog.is_searchable("name"));
        assert!(!catalog.is_searchable("color"));
        assert!(catalog.is_filterable("color"));
        assert_eq!(catalog.search_weight("name"), 10.0);
        assert_eq!(catalog.search_weight("unknown"), 1.0);
    }

    #[test]
    fn test_sortable_field_name_requires_sortable() {
        let catalog = catalog();
        let en = LanguageCode::new("en").unwrap();
        assert_eq!(
            catalog.sortable_field_name("name", &en).unwrap().as_str(),
            "sort_by_name_en"
        );
        assert!(catalog.sortable_field_name("color", &en).is_err());
        assert!(catalog.sortable_field_name("missing", &en).is_err());
    }

    #[test]
    fn test_weighted_fields_skip_non_text_for_analyzer_variants() {
        let catalog = catalog();
        let en = LanguageCode::new("en").unwrap();

        let standard = weighted_search_fields(&catalog, &en, Analyzer::Standard, 1.0).unwrap();
        let names: Vec<_> = standard.iter().map(|(f, _)| f.as_str().to_string()).collect();
        assert_eq!(names, vec!["search_en", "name_en", "size", "sku"]);

        let whitespace = weighted_search_fields(&catalog, &en, Analyzer::Whitespace, 2.0).unwrap();
        assert!(whitespace
            .iter()
            .any(|(f, w)| f.as_str() == "name_en.whitespace" && *w == 20.0));
        assert!(!whitespace.iter().any(|(f, _)| f.as_str().starts_with("size")));
    }
}
