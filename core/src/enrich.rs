//! Per-record enrichment: snapshot, optional classification, finalize.

use std::time::Duration;

use crate::classifier::{Classifier, ClassifyError, ClassifyRequest};
use crate::entry::Category;
use crate::errors::{ErrorCategory, OntomapError};
use crate::record::Record;
use crate::snapshot::snapshot_record;
use crate::store::MappingStore;

/// Whether classification can happen during this run. Decided once.
#[derive(Debug)]
pub enum ClassifierState<C> {
    /// Enrichment turned off by configuration
    Disabled,
    /// Enrichment wanted, but no client could be built
    Unavailable { reason: String },
    Ready(C),
}

impl<C> ClassifierState<C> {
    /// Decide availability for a run, logging the outcome once.
    pub fn resolve(enabled: bool, build: impl FnOnce() -> crate::errors::Result<C>) -> Self {
        if !enabled {
            tracing::info!("Classifier enrichment disabled");
            return Self::Disabled;
        }

        match build() {
            Ok(classifier) => {
                tracing::info!("Classifier enrichment enabled");
                Self::Ready(classifier)
            }
            Err(e) => Self::unavailable(&e),
        }
    }

    fn unavailable(error: &OntomapError) -> Self {
        tracing::warn!(
            category = ErrorCategory::ClassifierUnavailable.as_str(),
            error = %error,
            "Classifier unavailable, enrichment skipped for this run"
        );
        Self::Unavailable {
            reason: error.to_string(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Why a record that needed classification did not get it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Disabled,
    ClassifierUnavailable(String),
    CallFailed(ClassifyError),
}

impl SkipReason {
    /// Short label used in run summaries
    pub fn label(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::ClassifierUnavailable(_) => "classifier_unavailable",
            Self::CallFailed(_) => "call_failed",
        }
    }
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichOutcome {
    /// Every non-empty field already had mappings
    Cached,
    /// One classifier call was made and its entries merged
    Enriched { merged_entries: usize },
    Skipped(SkipReason),
}

/// Drives enrichment for a sequence of records against one store.
pub struct Enricher<C> {
    state: ClassifierState<C>,
    delay: Duration,
    calls: usize,
}

impl<C: Classifier> Enricher<C> {
    pub fn new(state: ClassifierState<C>) -> Self {
        Self {
            state,
            delay: Duration::ZERO,
            calls: 0,
        }
    }

    /// Pause for `delay` after every real classifier call
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Enrich one record and attach its final snapshot.
    ///
    /// Never fails: classifier problems are reported in the outcome and the
    /// record still gets whatever the store already knows.
    pub fn enrich(&mut self, store: &mut MappingStore, record: &mut Record) -> EnrichOutcome {
        let snapshot = snapshot_record(store, &record.fields);
        let needs_classification = Category::ALL.into_iter().any(|category| {
            !record.fields.category_value(category).trim().is_empty()
                && snapshot.get(category).is_empty()
        });

        if !needs_classification {
            record.mappings = snapshot;
            return EnrichOutcome::Cached;
        }

        let outcome = match &self.state {
            ClassifierState::Disabled => EnrichOutcome::Skipped(SkipReason::Disabled),
            ClassifierState::Unavailable { reason } => {
                EnrichOutcome::Skipped(SkipReason::ClassifierUnavailable(reason.clone()))
            }
            ClassifierState::Ready(classifier) => {
                let request = ClassifyRequest::from_fields(&record.fields);
                let result = classifier.classify(&request);
                self.calls += 1;
                if !self.delay.is_zero() {
                    std::thread::sleep(self.delay);
                }

                match result {
                    Ok(response) => {
                        let mut merged_entries = 0;
                        for category in Category::ALL {
                            let term = request.value(category);
                            if term.is_empty() {
                                continue;
                            }
                            let entries = response.get(category);
                            store.merge(category, term, entries);
                            merged_entries += entries.len();
                        }
                        EnrichOutcome::Enriched { merged_entries }
                    }
                    Err(error) => {
                        tracing::warn!(
                            category = error.category().as_str(),
                            name = %record.fields.name,
                            %error,
                            "Classifier call failed, record left unenriched"
                        );
                        EnrichOutcome::Skipped(SkipReason::CallFailed(error))
                    }
                }
            }
        };

        tracing::debug!(name = %record.fields.name, ?outcome, "Record enrichment finished");
        record.mappings = snapshot_record(store, &record.fields);
        outcome
    }

    /// Classifier calls made by this enricher
    pub fn calls_made(&self) -> usize {
        self.calls
    }

    pub fn state(&self) -> &ClassifierState<C> {
        &self.state
    }
}
