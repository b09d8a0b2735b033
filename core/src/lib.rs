//! Ontology-mapping cache for survey enrichment
//!
//! Survey rows carry free-text answers (role, expertise, interest). This crate
//! maps those answers to public-ontology concepts and remembers every mapping:
//! - A persistent `MappingStore` keyed by category and normalized term
//! - A merge rule that makes repeated enrichment idempotent
//! - Snapshot lookup with a comma / " and " decomposition fallback
//! - At most one classifier call per record, only on a cache miss
//!
//! The store is passed explicitly to every component; there is no global state.

#![deny(clippy::print_stdout, clippy::print_stderr)]

pub mod classifier;
pub mod config;
pub mod enrich;
pub mod entry;
pub mod errors;
pub mod event;
pub mod merge;
pub mod output;
pub mod persist;
pub mod record;
pub mod run;
pub mod snapshot;
pub mod source;
pub mod store;

pub use classifier::{Classifier, ClassifierResponse, ClassifyError, ClassifyRequest, HttpClassifier};
pub use config::{ClassifierConfig, ConfigOverrides, OntomapConfig, SheetsConfig};
pub use enrich::{ClassifierState, EnrichOutcome, Enricher, SkipReason};
pub use entry::{Category, ConceptEntry, PerCategory, normalize_term};
pub use errors::{ErrorCategory, Loaded, OntomapError, Result, UnreadableReason};
pub use event::{EventDetails, SheetEvent};
pub use merge::merge_entries;
pub use output::{OutputFormat, RecordCollection, Upsert};
pub use record::{Record, RecordFields, normalize_rows};
pub use run::{RunPaths, RunSummary, run};
pub use snapshot::{snapshot_field, snapshot_record};
pub use source::{JsonFileSource, RowSource, SheetsApiSource};
pub use store::MappingStore;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
