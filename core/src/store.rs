//! Persistent ontology-mapping cache.
//!
//! Layout on disk (pretty JSON):
//!
//! ```text
//! {
//!   "Role":      { "<normalized term>": [ConceptEntry, ...], ... },
//!   "Expertise": { ... },
//!   "Interest":  { ... }
//! }
//! ```
//!
//! The store is loaded once per run, mutated per record and saved once at the
//! end. It is passed explicitly to every component that needs it.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entry::{Category, ConceptEntry, PerCategory, normalize_term};
use crate::errors::{ErrorCategory, Loaded, OntomapError, Result, UnreadableReason};
use crate::merge::merge_entries;
use crate::persist::{read_text, write_atomic};

/// Normalized term → cached entries, for one category.
pub type TermBucket = BTreeMap<String, Vec<ConceptEntry>>;

/// Category → term → concept entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MappingStore {
    categories: PerCategory<TermBucket>,
}

impl MappingStore {
    /// Create an empty store with all three categories present
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the store from `path`.
    ///
    /// A missing, empty or unparsable file yields an empty store; the reason is
    /// logged and returned in `fallback`.
    pub fn load(path: &Path) -> Loaded<Self> {
        let parsed = read_text(path).and_then(|contents| {
            serde_json::from_str::<Self>(&contents)
                .map_err(|e| UnreadableReason::Malformed(e.to_string()))
        });

        match parsed {
            Ok(parsed) => {
                let store = parsed.rekeyed();
                tracing::info!(
                    path = %path.display(),
                    terms = store.term_total(),
                    entries = store.total_entries(),
                    "Loaded mapping store"
                );
                Loaded::fresh(store)
            }
            Err(reason) => {
                if reason == UnreadableReason::Missing {
                    tracing::info!(
                        path = %path.display(),
                        "Mapping store not found, starting empty"
                    );
                } else {
                    tracing::warn!(
                        category = ErrorCategory::StoreUnreadable.as_str(),
                        path = %path.display(),
                        %reason,
                        "Mapping store unreadable, starting empty"
                    );
                }
                Loaded::recovered(Self::default(), reason)
            }
        }
    }

    /// Re-key every bucket through `normalize_term` and fold duplicate
    /// identity keys. Keys that normalize to empty are dropped.
    fn rekeyed(self) -> Self {
        let categories = PerCategory::from_fn(|category| {
            let mut rebuilt = TermBucket::new();
            for (term, entries) in self.categories.get(category) {
                let key = normalize_term(term);
                if key.is_empty() {
                    continue;
                }
                let bucket = rebuilt.entry(key).or_default();
                *bucket = merge_entries(bucket, entries);
            }
            rebuilt
        });
        Self { categories }
    }

    /// Write the whole store to `path`. Safe to call when nothing changed.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut json = serde_json::to_string_pretty(self).map_err(|e| {
            OntomapError::persist_with_source("failed to serialize mapping store", e)
        })?;
        json.push('\n');
        write_atomic(path, json.as_bytes())?;

        tracing::debug!(
            path = %path.display(),
            terms = self.term_total(),
            "Saved mapping store"
        );
        Ok(())
    }

    /// Entries cached for `term` (normalized before lookup); empty if unknown.
    pub fn get(&self, category: Category, term: &str) -> &[ConceptEntry] {
        self.bucket(category)
            .get(&normalize_term(term))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `term` has a bucket key in `category`
    pub fn contains_term(&self, category: Category, term: &str) -> bool {
        self.bucket(category).contains_key(&normalize_term(term))
    }

    /// Merge `new_entries` into the bucket for `term`.
    ///
    /// Empty terms are ignored, and an empty incoming list does not create a
    /// bucket for a term that has none.
    pub fn merge(&mut self, category: Category, term: &str, new_entries: &[ConceptEntry]) {
        let key = normalize_term(term);
        if key.is_empty() {
            return;
        }

        let bucket = self.categories.get_mut(category);
        match bucket.get_mut(&key) {
            Some(existing) => {
                let merged = merge_entries(existing, new_entries);
                *existing = merged;
            }
            None if new_entries.is_empty() => {}
            None => {
                bucket.insert(key, merge_entries(&[], new_entries));
            }
        }
    }

    /// The term bucket for one category
    pub fn bucket(&self, category: Category) -> &TermBucket {
        self.categories.get(category)
    }

    /// Number of terms cached for one category
    pub fn term_count(&self, category: Category) -> usize {
        self.bucket(category).len()
    }

    /// Number of terms across all categories
    pub fn term_total(&self) -> usize {
        self.categories.iter().map(|(_, bucket)| bucket.len()).sum()
    }

    /// Number of entries across all buckets
    pub fn total_entries(&self) -> usize {
        self.categories
            .iter()
            .flat_map(|(_, bucket)| bucket.values())
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.term_total() == 0
    }
}
