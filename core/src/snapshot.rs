//! Snapshot reconstruction: the best-known mappings for a field value.
//!
//! Lookup is two-tier. The whole normalized value is tried first, since
//! classifier output is stored under the literal field text. Only when that
//! misses is the value split into chunks on `,` and `" and "`, so sub-phrases
//! seen before in other combinations are reused. Other separators (`;`, `&`)
//! are intentionally left alone.

use std::collections::HashSet;

use crate::entry::{Category, ConceptEntry, PerCategory, normalize_term};
use crate::record::RecordFields;
use crate::store::MappingStore;

/// Mappings for one field value in one category.
///
/// An empty result means nothing is known: neither the whole value nor any
/// chunk of it has a bucket.
pub fn snapshot_field(store: &MappingStore, category: Category, value: &str) -> Vec<ConceptEntry> {
    let normalized = normalize_term(value);
    if normalized.is_empty() {
        return Vec::new();
    }

    let bucket = store.bucket(category);
    if let Some(entries) = bucket.get(&normalized) {
        return entries.clone();
    }

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for chunk in decompose(&normalized) {
        let Some(entries) = bucket.get(chunk) else {
            continue;
        };
        // First occurrence wins; later duplicates are dropped, not merged.
        for entry in entries {
            if seen.insert(entry.identity_key()) {
                result.push(entry.clone());
            }
        }
    }
    result
}

/// Mappings for all three categories of a record
pub fn snapshot_record(store: &MappingStore, fields: &RecordFields) -> PerCategory<Vec<ConceptEntry>> {
    PerCategory::from_fn(|category| snapshot_field(store, category, fields.category_value(category)))
}

/// Split a normalized value into lookup chunks on `,` and the literal `" and "`.
pub fn decompose(normalized: &str) -> Vec<&str> {
    normalized
        .split(',')
        .flat_map(|part| part.split(" and "))
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry_a() -> ConceptEntry {
        ConceptEntry::new("Artificial intelligence", "Wikidata:Q11660", "Wikidata")
            .with_confidence(0.9)
    }

    fn entry_b() -> ConceptEntry {
        ConceptEntry::new("Robotics", "Wikidata:Q170978", "Wikidata").with_confidence(0.8)
    }

    fn sample_store() -> MappingStore {
        let mut store = MappingStore::new();
        store.merge(Category::Interest, "AI", &[entry_a()]);
        store.merge(Category::Interest, "robotics", &[entry_b(), entry_a()]);
        store
    }

    #[test]
    fn test_decompose_commas_and_and() {
        assert_eq!(
            decompose("ai, robotics and  vision ,, and ethics"),
            vec!["ai", "robotics", "vision", "ethics"]
        );
        assert_eq!(decompose("r&d; policy"), vec!["r&d; policy"]);
        assert_eq!(decompose("android"), vec!["android"]);
    }

    #[test]
    fn test_empty_value_returns_empty() {
        assert!(snapshot_field(&sample_store(), Category::Interest, "   ").is_empty());
    }

    #[test]
    fn test_exact_match_returns_bucket() {
        let store = sample_store();
        assert_eq!(
            snapshot_field(&store, Category::Interest, "  Robotics "),
            store.get(Category::Interest, "robotics").to_vec()
        );
    }

    #[test]
    fn test_exact_match_takes_precedence_over_chunks() {
        let mut store = sample_store();
        let whole = ConceptEntry::new("Social robotics", "Wikidata:Q1", "Wikidata");
        store.merge(Category::Interest, "AI, robotics", &[whole.clone()]);

        assert_eq!(
            snapshot_field(&store, Category::Interest, "ai, ROBOTICS"),
            vec![whole]
        );
    }

    #[test]
    fn test_fallback_dedups_first_seen() {
        let snapshot = snapshot_field(&sample_store(), Category::Interest, "AI, robotics");
        assert_eq!(snapshot, vec![entry_a(), entry_b()]);
    }

    #[test]
    fn test_fallback_handles_and_separator() {
        let snapshot = snapshot_field(&sample_store(), Category::Interest, "robotics and AI");
        assert_eq!(snapshot, vec![entry_b(), entry_a()]);
    }

    #[test]
    fn test_no_exact_no_chunk_is_empty() {
        let store = sample_store();
        assert!(snapshot_field(&store, Category::Interest, "gardening, cooking").is_empty());
        assert!(snapshot_field(&store, Category::Interest, "ai & robotics").is_empty());
        assert!(snapshot_field(&store, Category::Role, "AI").is_empty());
    }

    #[test]
    fn test_snapshot_record_covers_all_categories() {
        let store = sample_store();
        let fields = RecordFields {
            name: "Ada".to_string(),
            interest: "AI".to_string(),
            ..Default::default()
        };
        let snapshot = snapshot_record(&store, &fields);
        assert_eq!(snapshot.interest, vec![entry_a()]);
        assert!(snapshot.role.is_empty());
        assert!(snapshot.expertise.is_empty());
    }
}
