//! Output record collection, deduplicated by normalized `Name`.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::entry::{Category, ConceptEntry};
use crate::errors::{ErrorCategory, Loaded, OntomapError, Result, UnreadableReason};
use crate::persist::{read_text, write_atomic};
use crate::record::{Record, RecordFields};
use crate::snapshot::snapshot_record;
use crate::store::MappingStore;

/// On-disk layout of the output collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// One pretty-printed JSON array
    #[default]
    Json,
    /// One record object per line
    Jsonl,
    /// Header row, then one row per record with `;`-joined mapping ids
    Csv,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Jsonl => "jsonl",
            Self::Csv => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "jsonl" | "ndjson" => Ok(Self::Jsonl),
            "csv" => Ok(Self::Csv),
            _ => Err(format!("Unknown output format: {s} (expected json, jsonl or csv)")),
        }
    }
}

/// Result of inserting a record by name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Added,
    Updated,
}

/// Ordered records with an index on normalized name.
#[derive(Debug, Clone, Default)]
pub struct RecordCollection {
    records: Vec<Record>,
    index: HashMap<String, usize>,
}

impl RecordCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from records in order; later duplicates of a name are dropped.
    pub fn from_records(records: impl IntoIterator<Item = Record>) -> Self {
        let mut collection = Self::new();
        for record in records {
            let key = record.fields.name_key();
            if collection.index.contains_key(&key) {
                tracing::warn!(
                    name = %record.fields.name,
                    "Duplicate name in output collection, keeping first"
                );
                continue;
            }
            collection.index.insert(key, collection.records.len());
            collection.records.push(record);
        }
        collection
    }

    /// Load the collection from `path`.
    ///
    /// An unusable file yields an empty collection with the reason in
    /// `fallback`. In `jsonl` and `csv` malformed rows are skipped
    /// individually; `csv` mapping columns are not read back.
    pub fn load(path: &Path, format: OutputFormat) -> Loaded<Self> {
        let parsed = read_text(path).and_then(|contents| match format {
            OutputFormat::Json => serde_json::from_str::<Vec<Record>>(&contents)
                .map_err(|e| UnreadableReason::Malformed(e.to_string())),
            OutputFormat::Jsonl => parse_lines(path, &contents),
            OutputFormat::Csv => parse_csv(path, &contents),
        });

        match parsed {
            Ok(records) => {
                let collection = Self::from_records(records);
                tracing::info!(
                    path = %path.display(),
                    records = collection.len(),
                    "Loaded output collection"
                );
                Loaded::fresh(collection)
            }
            Err(reason) => {
                if reason == UnreadableReason::Missing {
                    tracing::info!(path = %path.display(), "Output file not found, starting empty");
                } else {
                    tracing::warn!(
                        category = ErrorCategory::OutputUnreadable.as_str(),
                        path = %path.display(),
                        %reason,
                        "Output file unreadable, starting empty"
                    );
                }
                Loaded::recovered(Self::new(), reason)
            }
        }
    }

    /// Insert by normalized name. An existing record keeps its position and
    /// takes the new record's fields and mappings.
    pub fn upsert(&mut self, record: Record) -> Upsert {
        let key = record.fields.name_key();
        match self.index.get(&key) {
            Some(&position) => {
                self.records[position] = record;
                Upsert::Updated
            }
            None => {
                self.index.insert(key, self.records.len());
                self.records.push(record);
                Upsert::Added
            }
        }
    }

    /// Recompute every record's mappings from `store`
    pub fn refresh_mappings(&mut self, store: &MappingStore) {
        for record in &mut self.records {
            record.mappings = snapshot_record(store, &record.fields);
        }
    }

    /// Look up a record by name (normalized before lookup)
    pub fn get(&self, name: &str) -> Option<&Record> {
        self.index
            .get(&crate::entry::normalize_term(name))
            .and_then(|&position| self.records.get(position))
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the whole collection atomically
    pub fn save(&self, path: &Path, format: OutputFormat) -> Result<()> {
        let serialized = self.to_bytes(format)?;
        write_atomic(path, &serialized)?;
        tracing::debug!(
            path = %path.display(),
            format = format.as_str(),
            records = self.len(),
            "Saved output collection"
        );
        Ok(())
    }

    fn to_bytes(&self, format: OutputFormat) -> Result<Vec<u8>> {
        let serialized = match format {
            OutputFormat::Json => serde_json::to_string_pretty(&self.records).map(|mut s| {
                s.push('\n');
                s
            }),
            OutputFormat::Jsonl => self
                .records
                .iter()
                .map(serde_json::to_string)
                .collect::<std::result::Result<Vec<_>, _>>()
                .map(|lines| {
                    lines
                        .iter()
                        .map(|line| format!("{line}\n"))
                        .collect::<String>()
                }),
            OutputFormat::Csv => return self.to_csv(),
        }
        .map_err(|e| OntomapError::persist_with_source("failed to serialize output records", e))?;
        Ok(serialized.into_bytes())
    }

    /// Canonical columns, then the sorted union of extra columns, then one
    /// mapping column per category.
    fn to_csv(&self) -> Result<Vec<u8>> {
        let extra: BTreeSet<&str> = self
            .records
            .iter()
            .flat_map(|record| record.fields.extra.keys().map(String::as_str))
            .filter(|key| !is_mapping_column(key))
            .collect();

        let mut header: Vec<String> = CSV_FIELD_COLUMNS.iter().map(|c| (*c).to_string()).collect();
        header.extend(extra.iter().map(|key| (*key).to_string()));
        header.extend(Category::ALL.into_iter().map(mapping_column));

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(&header).map_err(csv_write_error)?;
        for record in &self.records {
            let fields = &record.fields;
            let ids: Vec<String> = Category::ALL
                .into_iter()
                .map(|category| joined_ids(record.mappings.get(category)))
                .collect();
            let mut row = vec![
                fields.name.as_str(),
                fields.time.as_deref().unwrap_or(""),
                fields.role.as_str(),
                fields.expertise.as_str(),
                fields.interest.as_str(),
                fields.note.as_deref().unwrap_or(""),
            ];
            row.extend(
                extra
                    .iter()
                    .map(|key| fields.extra.get(*key).map(String::as_str).unwrap_or("")),
            );
            row.extend(ids.iter().map(String::as_str));
            writer.write_record(&row).map_err(csv_write_error)?;
        }

        writer.into_inner().map_err(|e| {
            OntomapError::persist_with_source("failed to flush csv output", e.into_error())
        })
    }
}

const CSV_FIELD_COLUMNS: [&str; 6] = ["Name", "Time", "Role", "Expertise", "Interest", "Note"];

fn mapping_column(category: Category) -> String {
    format!("{category} mappings")
}

fn is_mapping_column(header: &str) -> bool {
    Category::ALL
        .into_iter()
        .any(|category| mapping_column(category) == header)
}

fn joined_ids(entries: &[ConceptEntry]) -> String {
    entries
        .iter()
        .filter_map(|entry| entry.ontology_id.as_deref())
        .collect::<Vec<_>>()
        .join(";")
}

fn csv_write_error(e: csv::Error) -> OntomapError {
    OntomapError::persist_with_source("failed to serialize output records as csv", e)
}

fn parse_lines(path: &Path, contents: &str) -> std::result::Result<Vec<Record>, UnreadableReason> {
    let mut records = Vec::new();
    let mut last_error = None;
    for (number, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Record>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(
                    category = ErrorCategory::OutputUnreadable.as_str(),
                    path = %path.display(),
                    line = number + 1,
                    error = %e,
                    "Skipping malformed output line"
                );
                last_error = Some(e.to_string());
            }
        }
    }

    match last_error {
        Some(detail) if records.is_empty() => Err(UnreadableReason::Malformed(detail)),
        _ => Ok(records),
    }
}

fn parse_csv(path: &Path, contents: &str) -> std::result::Result<Vec<Record>, UnreadableReason> {
    let mut reader = csv::Reader::from_reader(contents.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| UnreadableReason::Malformed(e.to_string()))?
        .clone();

    let mut records = Vec::new();
    let mut last_error = None;
    for (number, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(
                    category = ErrorCategory::OutputUnreadable.as_str(),
                    path = %path.display(),
                    row = number + 1,
                    error = %e,
                    "Skipping malformed output row"
                );
                last_error = Some(e.to_string());
                continue;
            }
        };

        let mut fields = RecordFields::default();
        for (header, cell) in headers.iter().zip(row.iter()) {
            if is_mapping_column(header) {
                continue;
            }
            if cell.trim().is_empty() && !CSV_FIELD_COLUMNS.contains(&header) {
                continue;
            }
            fields.set(header, cell);
        }
        records.push(Record::new(fields));
    }

    match last_error {
        Some(detail) if records.is_empty() => Err(UnreadableReason::Malformed(detail)),
        _ => Ok(records),
    }
}
