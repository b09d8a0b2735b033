//! Classifier transport: free text in, candidate ontology concepts out.
//!
//! The enrichment pipeline only depends on the [`Classifier`] trait. The HTTP
//! implementation talks to a JSON endpoint with a blocking client, since
//! records are processed strictly one after another.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::ClassifierConfig;
use crate::entry::{Category, ConceptEntry, PerCategory};
use crate::errors::{ErrorCategory, OntomapError, Result};
use crate::record::RecordFields;

// ─────────────────────────────────────────────────────────────────────────────
// Request / response types
// ─────────────────────────────────────────────────────────────────────────────

/// The three free-text fields of one record, sent in a single call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassifyRequest {
    pub role: String,
    pub expertise: String,
    pub interest: String,
}

impl ClassifyRequest {
    /// Build a request from the trimmed field values of a record
    pub fn from_fields(fields: &RecordFields) -> Self {
        Self {
            role: fields.role.trim().to_string(),
            expertise: fields.expertise.trim().to_string(),
            interest: fields.interest.trim().to_string(),
        }
    }

    pub fn value(&self, category: Category) -> &str {
        match category {
            Category::Role => &self.role,
            Category::Expertise => &self.expertise,
            Category::Interest => &self.interest,
        }
    }
}

/// Candidate entries per category, as returned by one classifier call.
pub type ClassifierResponse = PerCategory<Vec<ConceptEntry>>;

/// Why a single classifier call produced nothing usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Transport(String),

    #[error("classifier returned HTTP {status}")]
    Status { status: u16 },

    #[error("classifier response malformed: {0}")]
    MalformedBody(String),
}

impl ClassifyError {
    pub fn category(&self) -> ErrorCategory {
        ErrorCategory::ClassifierCallFailed
    }
}

/// Maps survey text to ontology concepts.
pub trait Classifier {
    /// Classify all three fields of one record in a single call.
    fn classify(&self, request: &ClassifyRequest) -> std::result::Result<ClassifierResponse, ClassifyError>;
}

impl<C: Classifier + ?Sized> Classifier for &C {
    fn classify(&self, request: &ClassifyRequest) -> std::result::Result<ClassifierResponse, ClassifyError> {
        (**self).classify(request)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response validation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireResponse {
    #[serde(rename = "Role")]
    role: Vec<WireEntry>,
    #[serde(rename = "Expertise")]
    expertise: Vec<WireEntry>,
    #[serde(rename = "Interest")]
    interest: Vec<WireEntry>,
}

/// One entry as the classifier sends it; no keys beyond the entry shape.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEntry {
    #[serde(default)]
    concept_label: Option<String>,
    #[serde(default)]
    ontology_id: Option<String>,
    #[serde(default)]
    ontology: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    explanation: Option<String>,
}

impl From<WireEntry> for ConceptEntry {
    fn from(wire: WireEntry) -> Self {
        Self {
            concept_label: wire.concept_label,
            ontology_id: wire.ontology_id,
            ontology: wire.ontology,
            confidence: wire.confidence,
            explanation: wire.explanation,
        }
    }
}

fn into_entries(wire: Vec<WireEntry>) -> Vec<ConceptEntry> {
    wire.into_iter().map(ConceptEntry::from).collect()
}

/// Parse and validate a classifier response body.
///
/// The body must be an object with exactly `Role`, `Expertise` and `Interest`,
/// each a list of entry objects carrying only entry keys. Any confidence outside [0, 1] rejects the
/// whole response.
pub fn parse_response(body: &str) -> std::result::Result<ClassifierResponse, ClassifyError> {
    let wire: WireResponse =
        serde_json::from_str(body).map_err(|e| ClassifyError::MalformedBody(e.to_string()))?;

    let response = PerCategory {
        role: into_entries(wire.role),
        expertise: into_entries(wire.expertise),
        interest: into_entries(wire.interest),
    };

    for (category, entries) in response.iter() {
        for entry in entries {
            if let Some(confidence) = entry.confidence
                && !(confidence.is_finite() && (0.0..=1.0).contains(&confidence))
            {
                return Err(ClassifyError::MalformedBody(format!(
                    "{category} confidence {confidence} outside [0, 1]"
                )));
            }
        }
    }

    Ok(response)
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP implementation
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    #[serde(flatten)]
    request: &'a ClassifyRequest,
}

/// Classifier backed by a JSON-over-HTTP endpoint.
#[derive(Debug, Clone)]
pub struct HttpClassifier {
    client: reqwest::blocking::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl HttpClassifier {
    /// Build from config, reading the API key from `cfg.api_key_env`.
    pub fn from_config(cfg: &ClassifierConfig) -> Result<Self> {
        Self::from_api_key(cfg, std::env::var(&cfg.api_key_env).ok())
    }

    /// Build from config with an explicit API key. `None` or a blank key
    /// means the classifier is unavailable.
    pub fn from_api_key(cfg: &ClassifierConfig, api_key: Option<String>) -> Result<Self> {
        let api_key = api_key
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                OntomapError::classifier_unavailable(format!(
                    "API key variable {} is not set",
                    cfg.api_key_env
                ))
            })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(cfg.timeout())
            .build()
            .map_err(|e| {
                OntomapError::classifier_unavailable_with_source("failed to create HTTP client", e)
            })?;

        Ok(Self {
            client,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl Classifier for HttpClassifier {
    fn classify(&self, request: &ClassifyRequest) -> std::result::Result<ClassifierResponse, ClassifyError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&WireRequest {
                model: &self.model,
                request,
            })
            .send()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClassifyError::Status {
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .map_err(|e| ClassifyError::Transport(e.to_string()))?;
        parse_response(&body)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Mock implementation
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(any(test, feature = "test-utils"))]
pub mod mock {
    use std::collections::VecDeque;
    use std::sync::{Mutex, PoisonError};

    use super::{Classifier, ClassifierResponse, ClassifyError, ClassifyRequest};

    type Scripted = std::result::Result<ClassifierResponse, ClassifyError>;

    /// Scripted classifier that records every request it receives.
    ///
    /// Queued results are returned in order; once the queue is empty the
    /// default result is repeated.
    pub struct MockClassifier {
        queue: Mutex<VecDeque<Scripted>>,
        default: Scripted,
        requests: Mutex<Vec<ClassifyRequest>>,
    }

    impl MockClassifier {
        /// Always answer with `response`
        pub fn returning(response: ClassifierResponse) -> Self {
            Self::with_default(Ok(response))
        }

        /// Always fail with `error`
        pub fn failing(error: ClassifyError) -> Self {
            Self::with_default(Err(error))
        }

        /// Answer from `script` in order, then fail with a transport error
        pub fn scripted(script: Vec<Scripted>) -> Self {
            Self {
                queue: Mutex::new(script.into()),
                ..Self::failing(ClassifyError::Transport("mock script exhausted".to_string()))
            }
        }

        fn with_default(default: Scripted) -> Self {
            Self {
                queue: Mutex::new(VecDeque::new()),
                default,
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Number of calls made so far
        pub fn call_count(&self) -> usize {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .len()
        }

        /// Every request received, in order
        pub fn requests(&self) -> Vec<ClassifyRequest> {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .clone()
        }
    }

    impl Classifier for MockClassifier {
        fn classify(&self, request: &ClassifyRequest) -> Scripted {
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request.clone());

            self.queue
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| self.default.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockClassifier;
    use super::*;
    use pretty_assertions::assert_eq;

    const VALID: &str = r#"{
        "Role": [],
        "Expertise": [{"concept_label": "Neuroscience", "ontology_id": "Wikidata:Q207011", "ontology": "Wikidata", "confidence": 0.8}],
        "Interest": [{"concept_label": "Brain", "ontology_id": "Wikidata:Q1073", "ontology": "Wikidata", "confidence": null}]
    }"#;

    #[test]
    fn test_parse_valid_response() {
        let response = parse_response(VALID).expect("valid");
        assert!(response.role.is_empty());
        assert_eq!(
            response.expertise,
            vec![
                ConceptEntry::new("Neuroscience", "Wikidata:Q207011", "Wikidata")
                    .with_confidence(0.8)
            ]
        );
        assert_eq!(response.interest[0].confidence, None);
    }

    #[test]
    fn test_parse_rejects_missing_category() {
        let err = parse_response(r#"{"Role": [], "Expertise": []}"#).expect_err("missing");
        assert!(matches!(err, ClassifyError::MalformedBody(_)));
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let body = r#"{"Role": [], "Expertise": [], "Interest": [], "Notes": []}"#;
        assert!(matches!(
            parse_response(body),
            Err(ClassifyError::MalformedBody(_))
        ));
    }

    #[test]
    fn test_parse_rejects_unknown_entry_key() {
        let body = r#"{
            "Role": [],
            "Expertise": [],
            "Interest": [{"concept_label": "Brain", "ontology_id": "Wikidata:Q1073", "ontology": "Wikidata", "score": 0.4}]
        }"#;
        let err = parse_response(body).expect_err("unknown entry key");
        assert!(matches!(err, ClassifyError::MalformedBody(ref detail) if detail.contains("score")));
    }

    #[test]
    fn test_parse_rejects_non_list_and_non_object_entries() {
        assert!(parse_response(r#"{"Role": {}, "Expertise": [], "Interest": []}"#).is_err());
        assert!(parse_response(r#"{"Role": ["x"], "Expertise": [], "Interest": []}"#).is_err());
        assert!(parse_response("not json").is_err());
    }

    #[test]
    fn test_parse_rejects_out_of_range_confidence() {
        let body = r#"{"Role": [{"ontology_id": "X:1", "confidence": 1.5}], "Expertise": [], "Interest": []}"#;
        let err = parse_response(body).expect_err("out of range");
        assert!(err.to_string().contains("Role confidence 1.5"));
    }

    #[test]
    fn test_request_from_fields_trims() {
        let fields = RecordFields {
            name: "Ada".to_string(),
            role: " Postdoc ".to_string(),
            interest: "brains\n".to_string(),
            ..Default::default()
        };
        let request = ClassifyRequest::from_fields(&fields);
        assert_eq!(request.value(Category::Role), "Postdoc");
        assert_eq!(request.value(Category::Expertise), "");
        assert_eq!(request.value(Category::Interest), "brains");
    }

    #[test]
    fn test_wire_request_flattens_fields() {
        let request = ClassifyRequest {
            role: "Postdoc".to_string(),
            expertise: String::new(),
            interest: "brains".to_string(),
        };
        let json = serde_json::to_value(WireRequest {
            model: "ontology-mapper",
            request: &request,
        })
        .expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({
                "model": "ontology-mapper",
                "role": "Postdoc",
                "expertise": "",
                "interest": "brains"
            })
        );
    }

    #[test]
    fn test_missing_api_key_is_unavailable() {
        let cfg = ClassifierConfig::default();
        let err = HttpClassifier::from_api_key(&cfg, None).expect_err("no key");
        assert_eq!(err.category(), ErrorCategory::ClassifierUnavailable);

        let err = HttpClassifier::from_api_key(&cfg, Some("  ".to_string())).expect_err("blank");
        assert_eq!(err.category(), ErrorCategory::ClassifierUnavailable);

        assert!(HttpClassifier::from_api_key(&cfg, Some("secret".to_string())).is_ok());
    }

    #[test]
    fn test_mock_scripted_then_exhausted() {
        let mock = MockClassifier::scripted(vec![
            Ok(ClassifierResponse::default()),
            Err(ClassifyError::Status { status: 503 }),
        ]);
        let request = ClassifyRequest::default();

        assert!(mock.classify(&request).is_ok());
        assert_eq!(
            mock.classify(&request),
            Err(ClassifyError::Status { status: 503 })
        );
        assert!(matches!(
            mock.classify(&request),
            Err(ClassifyError::Transport(_))
        ));
        assert_eq!(mock.call_count(), 3);
    }
}
