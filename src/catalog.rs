/*!
 * Language catalog caching.
 *
 * Each adapter keeps its own catalog of language code to display name.
 * A refresh builds a complete catalog first and swaps it in, so readers
 * never observe a half-filled map.
 */

use log::debug;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Mapping of provider language codes to display names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageCatalog {
    entries: HashMap<String, String>,
}

impl LanguageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry
    pub fn insert(&mut self, code: impl Into<String>, name: impl Into<String>) {
        self.entries.insert(code.into(), name.into());
    }

    /// Display name for a code
    pub fn display_name(&self, code: &str) -> Option<&str> {
        self.entries.get(code).map(String::as_str)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entries.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in no particular order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Entries sorted by code
    pub fn sorted(&self) -> Vec<(&str, &str)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_unstable_by(|a, b| a.0.cmp(b.0));
        entries
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LanguageCatalog {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Per-adapter cache holding the most recent complete catalog
#[derive(Debug, Default)]
pub struct CatalogCache {
    current: RwLock<LanguageCatalog>,
}

impl CatalogCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the cached catalog, empty until the first refresh
    pub fn snapshot(&self) -> LanguageCatalog {
        self.current.read().clone()
    }

    /// Whether a code is present in the cached catalog
    pub fn contains(&self, code: &str) -> bool {
        self.current.read().contains(code)
    }

    /// Swap in a freshly built catalog
    pub fn replace(&self, catalog: LanguageCatalog) {
        debug!("Language catalog replaced ({} entries)", catalog.len());
        *self.current.write() = catalog;
    }
}
