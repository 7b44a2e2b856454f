//! Store, website and locale context of the current storefront request.

use crate::catalog::fields::LanguageCode;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Store/locale collaborator
pub trait StoreContext: Send + Sync {
    fn store_id(&self) -> u32;

    fn website_id(&self) -> u32;

    fn customer_group_id(&self) -> u32;

    /// Locale of the current store, e.g. `en_US`
    fn locale(&self) -> String;

    /// Analysis language of a locale
    fn language_for_locale(&self, locale: &str) -> Result<LanguageCode> {
        let language = locale.split(['_', '-']).next().unwrap_or(locale);
        LanguageCode::new(language)
    }

    /// Analysis language of the current store
    fn language_code(&self) -> Result<LanguageCode> {
        self.language_for_locale(&self.locale())
    }
}

/// Fixed store context, one per storefront request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticStoreContext {
    pub store_id: u32,
    pub website_id: u32,
    pub customer_group_id: u32,
    pub locale: String,
}

impl StaticStoreContext {
    pub fn new(store_id: u32, website_id: u32, locale: impl Into<String>) -> Self {
        Self {
            store_id,
            website_id,
            customer_group_id: 0,
            locale: locale.into(),
        }
    }

    pub fn with_customer_group(mut self, customer_group_id: u32) -> Self {
        self.customer_group_id = customer_group_id;
        self
    }
}

impl Default for StaticStoreContext {
    fn default() -> Self {
        Self::new(1, 1, "en_US")
    }
}

impl StoreContext for StaticStoreContext {
    fn store_id(&self) -> u32 {
        self.store_id
    }

    fn website_id(&self) -> u32 {
        self.website_id
    }

    fn customer_group_id(&self) -> u32 {
        self.customer_group_id
    }

    fn locale(&self) -> String {
        self.locale.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locale_to_language() {
        let store = StaticStoreContext::new(2, 1, "fr_FR");
        assert_eq!(store.language_code().unwrap().as_str(), "fr");
        assert_eq!(store.language_for_locale("pt-BR").unwrap().as_str(), "pt");
    }

    #[test]
    fn test_invalid_locale() {
        let store = StaticStoreContext::new(1, 1, "1234");
        assert!(store.language_code().is_err());
    }
}
