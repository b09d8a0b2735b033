#![allow(clippy::unwrap_used, clippy::expect_used)]

//! HTTP classifier and Sheets source against a mock server.
//!
//! Both clients are blocking, so calls run on `spawn_blocking`.

use ontomap_core::{
    Category, Classifier, ClassifierConfig, ClassifyError, ClassifyRequest, ErrorCategory,
    HttpClassifier, RowSource, SheetsApiSource, SheetsConfig,
};
use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn classifier_for(base: &str) -> HttpClassifier {
    let cfg = ClassifierConfig {
        endpoint: format!("{base}/v1/classify"),
        timeout_ms: 5_000,
        ..Default::default()
    };
    HttpClassifier::from_api_key(&cfg, Some("test-key".to_string())).unwrap()
}

fn request() -> ClassifyRequest {
    ClassifyRequest {
        role: "Postdoc".to_string(),
        expertise: String::new(),
        interest: "how the human social brain develops".to_string(),
    }
}

/// Build, call and drop the blocking client off the async workers.
async fn classify(server: &MockServer) -> Result<ontomap_core::ClassifierResponse, ClassifyError> {
    let base = server.uri();
    tokio::task::spawn_blocking(move || classifier_for(&base).classify(&request()))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn classifier_posts_fields_with_bearer_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/classify"))
        .and(header("authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "ontology-mapper",
            "role": "Postdoc",
            "expertise": "",
            "interest": "how the human social brain develops"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Role": [],
            "Expertise": [],
            "Interest": [
                {"concept_label": "Human", "ontology_id": "Wikidata:Q5", "ontology": "Wikidata", "confidence": 0.9},
                {"concept_label": "Brain", "ontology_id": "Wikidata:Q1073", "ontology": "Wikidata", "confidence": 0.9}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let response = classify(&server).await.unwrap();
    let ids: Vec<_> = response
        .get(Category::Interest)
        .iter()
        .map(|e| e.ontology_id.clone().unwrap())
        .collect();
    assert_eq!(ids, vec!["Wikidata:Q5", "Wikidata:Q1073"]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn classifier_non_success_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/classify"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let err = classify(&server).await.unwrap_err();
    assert_eq!(err, ClassifyError::Status { status: 500 });
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn classifier_rejects_extra_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Role": [], "Expertise": [], "Interest": [], "Debug": "trace"
        })))
        .mount(&server)
        .await;

    let err = classify(&server).await.unwrap_err();
    assert!(matches!(err, ClassifyError::MalformedBody(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn classifier_rejects_extra_entry_keys() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "Role": [{"ontology_id": "Wikidata:Q1", "ontology": "Wikidata", "rank": 1}],
            "Expertise": [],
            "Interest": []
        })))
        .mount(&server)
        .await;

    let err = classify(&server).await.unwrap_err();
    assert!(matches!(err, ClassifyError::MalformedBody(_)));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn classifier_rejects_non_json_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>busy</html>"))
        .mount(&server)
        .await;

    let err = classify(&server).await.unwrap_err();
    assert!(matches!(err, ClassifyError::MalformedBody(_)));
}

#[test]
fn classifier_unreachable_is_transport_error() {
    let cfg = ClassifierConfig {
        endpoint: "http://127.0.0.1:1/v1/classify".to_string(),
        timeout_ms: 2_000,
        ..Default::default()
    };
    let classifier = HttpClassifier::from_api_key(&cfg, Some("test-key".to_string())).unwrap();
    let err = classifier.classify(&request()).unwrap_err();
    assert!(matches!(err, ClassifyError::Transport(_)));
}

async fn fetch_sheet(server: &MockServer) -> ontomap_core::Result<Vec<Vec<String>>> {
    let cfg = SheetsConfig {
        api_base: server.uri(),
        ..Default::default()
    };
    tokio::task::spawn_blocking(move || {
        SheetsApiSource::with_token(&cfg, "sheet-123", "Form Responses 1", Some("tok".to_string()))
            .unwrap()
            .fetch_rows()
    })
    .await
    .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sheets_source_fetches_unformatted_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v4/spreadsheets/sheet-123/values/Form%20Responses%201"))
        .and(query_param("valueRenderOption", "UNFORMATTED_VALUE"))
        .and(header("authorization", "Bearer tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "range": "'Form Responses 1'!A1:B2",
            "values": [["Timestamp", "Submitted By"], [45123.5, "Ada"]]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let rows = fetch_sheet(&server).await.unwrap();
    assert_eq!(
        rows,
        vec![
            vec!["Timestamp".to_string(), "Submitted By".to_string()],
            vec!["45123.5".to_string(), "Ada".to_string()],
        ]
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn sheets_source_error_status_is_source_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = fetch_sheet(&server).await.unwrap_err();
    assert_eq!(err.category(), ErrorCategory::SourceUnavailable);
    assert!(err.to_string().contains("403"));
}
