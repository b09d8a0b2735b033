//! One enrichment run: fetch, normalize, enrich, upsert, refresh, save.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::classifier::Classifier;
use crate::config::OntomapConfig;
use crate::enrich::{EnrichOutcome, Enricher};
use crate::errors::Result;
use crate::output::{OutputFormat, RecordCollection, Upsert};
use crate::record::{Record, normalize_rows};
use crate::source::RowSource;
use crate::store::MappingStore;

/// Files a run reads and writes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub store: PathBuf,
    pub output: PathBuf,
    pub output_format: OutputFormat,
}

impl RunPaths {
    pub fn from_config(config: &OntomapConfig) -> Self {
        Self {
            store: config.resolved_store_path(),
            output: config.resolved_output_path(),
            output_format: config.output_format,
        }
    }
}

/// Counters reported at the end of a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Data rows returned by the source (header excluded)
    pub rows_read: usize,
    pub added: usize,
    pub updated: usize,
    /// Rows dropped for an empty `Name`
    pub rows_skipped: usize,
    pub cache_hits: usize,
    pub enriched: usize,
    pub classifier_calls: usize,
    /// Records that needed classification but did not get it, by reason label
    pub enrich_skipped: BTreeMap<&'static str, usize>,
    pub store_recovered: bool,
    pub output_recovered: bool,
    pub total_records: usize,
}

impl RunSummary {
    pub fn enrich_skipped_total(&self) -> usize {
        self.enrich_skipped.values().sum()
    }

    fn record_outcome(&mut self, outcome: &EnrichOutcome) {
        match outcome {
            EnrichOutcome::Cached => self.cache_hits += 1,
            EnrichOutcome::Enriched { .. } => self.enriched += 1,
            EnrichOutcome::Skipped(reason) => {
                *self.enrich_skipped.entry(reason.label()).or_default() += 1;
            }
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rows: {} | added: {} | updated: {} | skipped: {} | cached: {} | enriched: {} | classifier calls: {}",
            self.rows_read,
            self.added,
            self.updated,
            self.rows_skipped,
            self.cache_hits,
            self.enriched,
            self.classifier_calls
        )?;
        if !self.enrich_skipped.is_empty() {
            let parts: Vec<String> = self
                .enrich_skipped
                .iter()
                .map(|(label, count)| format!("{label}={count}"))
                .collect();
            write!(f, " | enrichment skipped: {}", parts.join(", "))?;
        }
        Ok(())
    }
}

/// Run the whole pipeline once.
///
/// Only a source failure or a failed final save is an error. The source is
/// read before any file is touched.
pub fn run<C: Classifier>(
    source: &dyn RowSource,
    paths: &RunPaths,
    enricher: &mut Enricher<C>,
) -> Result<RunSummary> {
    tracing::info!(source = %source.describe(), "Fetching rows");
    let rows = source.fetch_rows()?;
    let fields = normalize_rows(&rows);

    let mut summary = RunSummary {
        rows_read: fields.len(),
        ..Default::default()
    };

    let store = MappingStore::load(&paths.store);
    summary.store_recovered = store.is_recovered();
    let mut store = store.into_inner();

    let collection = RecordCollection::load(&paths.output, paths.output_format);
    summary.output_recovered = collection.is_recovered();
    let mut collection = collection.into_inner();

    let calls_before = enricher.calls_made();
    for fields in fields {
        if fields.name_key().is_empty() {
            tracing::debug!("Skipping row without a name");
            summary.rows_skipped += 1;
            continue;
        }

        let mut record = Record::new(fields);
        let outcome = enricher.enrich(&mut store, &mut record);
        summary.record_outcome(&outcome);

        match collection.upsert(record) {
            Upsert::Added => summary.added += 1,
            Upsert::Updated => summary.updated += 1,
        }
    }
    summary.classifier_calls = enricher.calls_made() - calls_before;

    collection.refresh_mappings(&store);
    summary.total_records = collection.len();

    collection.save(&paths.output, paths.output_format)?;
    store.save(&paths.store)?;

    tracing::info!(
        added = summary.added,
        updated = summary.updated,
        skipped = summary.rows_skipped,
        classifier_calls = summary.classifier_calls,
        enrich_skipped = summary.enrich_skipped_total(),
        "Run complete"
    );
    Ok(summary)
}
