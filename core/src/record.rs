//! Survey records and the normalizer that builds them from sheet rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::entry::{Category, ConceptEntry, PerCategory, normalize_term};

/// Survey question headers and the canonical field names they map to.
pub const HEADER_LABELS: &[(&str, &str)] = &[
    ("What do you do?", "Role"),
    ("What knowledge would you like to share?", "Expertise"),
    ("What would you like to learn?", "Interest"),
    ("What additional would you like to share?", "Note"),
    ("Submitted By", "Name"),
    ("Timestamp", "Time"),
];

/// Map a raw header to its canonical field name; unknown headers pass through trimmed.
///
/// Matching ignores ASCII case and accepts either the survey question or the
/// canonical name itself, so `submitted by` and `name` both give `Name`.
pub fn canonical_header(raw: &str) -> String {
    let trimmed = raw.trim();
    HEADER_LABELS
        .iter()
        .find(|(question, label)| {
            question.eq_ignore_ascii_case(trimmed) || label.eq_ignore_ascii_case(trimmed)
        })
        .map(|(_, label)| (*label).to_string())
        .unwrap_or_else(|| trimmed.to_string())
}

/// Canonical fields of one survey row, serialized as a flat object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Time", default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    #[serde(rename = "Role", default)]
    pub role: String,
    #[serde(rename = "Expertise", default)]
    pub expertise: String,
    #[serde(rename = "Interest", default)]
    pub interest: String,
    #[serde(rename = "Note", default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Columns with unrecognized headers, keyed by their header text
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl RecordFields {
    /// Assign a trimmed value to the field named `canonical`
    pub fn set(&mut self, canonical: &str, value: &str) {
        let value = value.trim();
        match canonical {
            "Name" => self.name = value.to_string(),
            "Time" => self.time = non_empty(value),
            "Role" => self.role = value.to_string(),
            "Expertise" => self.expertise = value.to_string(),
            "Interest" => self.interest = value.to_string(),
            "Note" => self.note = non_empty(value),
            other => {
                self.extra.insert(other.to_string(), value.to_string());
            }
        }
    }

    /// Free-text value for a category
    pub fn category_value(&self, category: Category) -> &str {
        match category {
            Category::Role => &self.role,
            Category::Expertise => &self.expertise,
            Category::Interest => &self.interest,
        }
    }

    /// Deduplication key: normalized `Name`
    pub fn name_key(&self) -> String {
        normalize_term(&self.name)
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

/// One survey respondent plus the mapping snapshot derived from the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub fields: RecordFields,
    #[serde(default)]
    pub mappings: PerCategory<Vec<ConceptEntry>>,
}

impl Record {
    pub fn new(fields: RecordFields) -> Self {
        Self {
            fields,
            mappings: PerCategory::default(),
        }
    }
}

/// Turn a header row plus data rows into canonical field records.
///
/// Cells beyond the header width are dropped and missing cells read as empty.
/// Blank headers become `col_<n>` (1-based).
pub fn normalize_rows(rows: &[Vec<String>]) -> Vec<RecordFields> {
    let Some((header_row, data_rows)) = rows.split_first() else {
        return Vec::new();
    };

    let headers: Vec<String> = header_row
        .iter()
        .enumerate()
        .map(|(i, raw)| {
            let canonical = canonical_header(raw);
            if canonical.is_empty() {
                format!("col_{}", i + 1)
            } else {
                canonical
            }
        })
        .collect();

    data_rows
        .iter()
        .map(|row| {
            let mut fields = RecordFields::default();
            for (i, header) in headers.iter().enumerate() {
                let cell = row.get(i).map(String::as_str).unwrap_or("");
                fields.set(header, cell);
            }
            fields
        })
        .collect()
}
