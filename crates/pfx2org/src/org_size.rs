//! Optional organization-size side table
//!
//! A normalized-name → tags mapping consulted as an enrichment alongside
//! organization search. The table is optional and frequently empty; a missing
//! key means "no enrichment available", never an error.

use crate::error::LoadError;
use crate::normalize::normalize;
use rustc_hash::FxHashMap;
use std::path::Path;
use tracing::info;

/// Side table keyed by normalized organization name.
#[derive(Debug, Clone, Default)]
pub struct OrgSizeTable {
    entries: FxHashMap<String, String>,
}

impl OrgSizeTable {
    /// An empty table; every lookup returns `None`.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Load from a JSON object of organization name → tag string.
    ///
    /// Keys are normalized on load, so lookups can use raw display names.
    /// Non-string values are stored as their compact JSON rendering.
    pub fn from_json_file(path: &Path) -> Result<Self, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let raw: FxHashMap<String, serde_json::Value> = serde_json::from_str(&content)?;

        let mut entries = FxHashMap::default();
        for (name, value) in raw {
            let tags = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            entries.insert(normalize(&name), tags);
        }

        info!(path = %path.display(), entries = entries.len(), "loaded organization side table");
        Ok(Self { entries })
    }

    /// Insert an entry under the normalized form of `name`.
    pub fn insert(&mut self, name: &str, tags: impl Into<String>) {
        self.entries.insert(normalize(name), tags.into());
    }

    /// Tags for an organization, looked up by normalized name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(&normalize(name)).map(String::as_str)
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
