//! Identity-keyed merge of concept entries for a single term.
//!
//! Incoming entries are folded one at a time into the existing list:
//! - same identity key: confidence only ever rises, an empty label is filled,
//!   explanations are unioned
//! - new identity key: appended
//!
//! Merging the same incoming list twice yields the same list as merging it once.

use std::collections::BTreeSet;

use crate::entry::ConceptEntry;

/// Merge `incoming` into `existing`, returning the combined list.
///
/// Existing entries keep their positions; new entries are appended in incoming
/// order.
pub fn merge_entries(existing: &[ConceptEntry], incoming: &[ConceptEntry]) -> Vec<ConceptEntry> {
    let mut merged = existing.to_vec();
    for entry in incoming {
        merge_one(&mut merged, entry);
    }
    merged
}

fn merge_one(merged: &mut Vec<ConceptEntry>, incoming: &ConceptEntry) {
    let key = incoming.identity_key();
    match merged.iter_mut().find(|e| e.identity_key() == key) {
        Some(current) => absorb(current, incoming),
        None => {
            let mut fresh = incoming.clone();
            fresh.explanation = union_explanations(None, incoming.explanation.as_deref());
            merged.push(fresh);
        }
    }
}

fn absorb(current: &mut ConceptEntry, incoming: &ConceptEntry) {
    // Null stored confidence compares as 0 but is only replaced by a real value.
    if let Some(candidate) = incoming.confidence
        && candidate > current.confidence.unwrap_or(0.0)
    {
        current.confidence = Some(candidate);
    }

    if current.concept_label.as_deref().is_none_or(str::is_empty)
        && incoming.concept_label.as_deref().is_some_and(|l| !l.is_empty())
    {
        current.concept_label.clone_from(&incoming.concept_label);
    }

    current.explanation = union_explanations(
        current.explanation.as_deref(),
        incoming.explanation.as_deref(),
    );
}

/// Union two `;`-separated explanation strings: parts are trimmed, deduplicated,
/// sorted and joined with `"; "`. Returns `None` when no part remains.
pub fn union_explanations(a: Option<&str>, b: Option<&str>) -> Option<String> {
    let parts: BTreeSet<&str> = a
        .into_iter()
        .chain(b)
        .flat_map(|text| text.split(';'))
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect();

    if parts.is_empty() {
        None
    } else {
        Some(parts.into_iter().collect::<Vec<_>>().join("; "))
    }
}
