//! Locale-keyed strings.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The locale the storefront renders in.
pub const STORE_LOCALE: &str = "en";

/// A string localized per IETF language tag, as returned by the platform
/// for names, descriptions and slugs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct LocalizedString(BTreeMap<String, String>);

impl LocalizedString {
    /// Create an empty localized string.
    #[must_use]
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Create a localized string with a single locale entry.
    #[must_use]
    pub fn from_locale(locale: impl Into<String>, value: impl Into<String>) -> Self {
        let mut map = BTreeMap::new();
        map.insert(locale.into(), value.into());
        Self(map)
    }

    /// Look up the value for a specific locale.
    #[must_use]
    pub fn get(&self, locale: &str) -> Option<&str> {
        self.0.get(locale).map(String::as_str)
    }

    /// The value for the store locale, falling back to any available
    /// locale, then to the empty string.
    #[must_use]
    pub fn for_store(&self) -> &str {
        self.get(STORE_LOCALE)
            .or_else(|| self.0.values().next().map(String::as_str))
            .unwrap_or("")
    }

    /// Insert or replace a locale entry.
    pub fn insert(&mut self, locale: impl Into<String>, value: impl Into<String>) {
        self.0.insert(locale.into(), value.into());
    }

    /// Whether no locale carries a value.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
