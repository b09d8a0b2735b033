//! Error types for enrichment runs
//!
//! Default policy: soft failure (log + continue) for store, output and
//! classifier problems. Only an unreachable row source, a bad config file or a
//! failed final save aborts a run.

use std::fmt;

use thiserror::Error;

/// Error category for structured logging and behavior mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// `ontomap.toml` or overrides misconfigured
    ConfigError,
    /// The row source (sheet API, rows file) cannot be read
    SourceUnavailable,
    /// Persisted mapping store missing, empty or malformed
    StoreUnreadable,
    /// Persisted output collection missing, empty or malformed
    OutputUnreadable,
    /// Classifier credentials missing or client construction failed
    ClassifierUnavailable,
    /// A single classifier call failed (transport, status, body)
    ClassifierCallFailed,
    /// Writing the store or output collection failed
    PersistError,
}

impl ErrorCategory {
    /// Machine-readable code for logging
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigError => "CONFIG_ERROR",
            Self::SourceUnavailable => "SOURCE_UNAVAILABLE",
            Self::StoreUnreadable => "STORE_UNREADABLE",
            Self::OutputUnreadable => "OUTPUT_UNREADABLE",
            Self::ClassifierUnavailable => "CLASSIFIER_UNAVAILABLE",
            Self::ClassifierCallFailed => "CLASSIFIER_CALL_FAILED",
            Self::PersistError => "PERSIST_ERROR",
        }
    }

    /// Whether this category aborts the run
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ConfigError | Self::SourceUnavailable | Self::PersistError
        )
    }
}

/// Enrichment error with category and context
#[derive(Debug, Error)]
pub enum OntomapError {
    #[error("config error: {message}")]
    Config {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("source unavailable: {message}")]
    SourceUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("classifier unavailable: {message}")]
    ClassifierUnavailable {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("persist error: {message}")]
    Persist {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl OntomapError {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Config { .. } => ErrorCategory::ConfigError,
            Self::SourceUnavailable { .. } => ErrorCategory::SourceUnavailable,
            Self::ClassifierUnavailable { .. } => ErrorCategory::ClassifierUnavailable,
            Self::Persist { .. } => ErrorCategory::PersistError,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            source: None,
        }
    }

    /// Create a config error with source
    pub fn config_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Config {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a source-unavailable error
    pub fn source_unavailable(message: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a source-unavailable error with source
    pub fn source_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::SourceUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a classifier-unavailable error
    pub fn classifier_unavailable(message: impl Into<String>) -> Self {
        Self::ClassifierUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a classifier-unavailable error with source
    pub fn classifier_unavailable_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ClassifierUnavailable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a persist error with source
    pub fn persist_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Persist {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }
}

/// Result type for enrichment operations
pub type Result<T> = std::result::Result<T, OntomapError>;

/// Why a persisted file could not be used as-is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnreadableReason {
    /// The file does not exist
    Missing,
    /// The file exists but holds only whitespace
    Empty,
    /// The file could not be parsed
    Malformed(String),
    /// The file could not be read
    Io(String),
}

impl fmt::Display for UnreadableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Missing => write!(f, "file not found"),
            Self::Empty => write!(f, "file is empty"),
            Self::Malformed(detail) => write!(f, "malformed content: {detail}"),
            Self::Io(detail) => write!(f, "read failed: {detail}"),
        }
    }
}

/// A loaded value plus the reason it had to be substituted, if any.
///
/// Loading never fails a run: when the file is unusable the value is the empty
/// default and `fallback` says why, so callers can log and tests can assert on
/// the specific failure kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Loaded<T> {
    pub value: T,
    pub fallback: Option<UnreadableReason>,
}

impl<T> Loaded<T> {
    /// Value read successfully from disk
    pub fn fresh(value: T) -> Self {
        Self {
            value,
            fallback: None,
        }
    }

    /// Value substituted because the file was unusable
    pub fn recovered(value: T, reason: UnreadableReason) -> Self {
        Self {
            value,
            fallback: Some(reason),
        }
    }

    /// Whether the value is a substitute
    pub fn is_recovered(&self) -> bool {
        self.fallback.is_some()
    }

    /// Drop the fallback reason
    pub fn into_inner(self) -> T {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_categories() {
        assert!(ErrorCategory::SourceUnavailable.is_fatal());
        assert!(ErrorCategory::PersistError.is_fatal());
        assert!(!ErrorCategory::StoreUnreadable.is_fatal());
        assert!(!ErrorCategory::ClassifierCallFailed.is_fatal());
    }

    #[test]
    fn test_error_category_mapping() {
        let err = OntomapError::source_unavailable("sheet gone");
        assert_eq!(err.category(), ErrorCategory::SourceUnavailable);
        assert_eq!(err.category().as_str(), "SOURCE_UNAVAILABLE");
        assert_eq!(err.to_string(), "source unavailable: sheet gone");
    }

    #[test]
    fn test_loaded_recovered() {
        let loaded = Loaded::recovered(0u8, UnreadableReason::Empty);
        assert!(loaded.is_recovered());
        assert_eq!(loaded.fallback, Some(UnreadableReason::Empty));
        assert_eq!(loaded.into_inner(), 0);
    }
}
