//! Sheet change events recorded as a JSON artifact for CI workflows.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{OntomapError, Result};
use crate::persist::write_atomic;

/// Default artifact location, relative to the working directory
pub const DEFAULT_EVENT_PATH: &str = "artifacts/sheets_event.json";

/// Details supplied by whoever reports the change
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDetails {
    pub sheet_name: String,
    pub spreadsheet_id: String,
    pub spreadsheet_name: String,
    pub change_type: String,
    pub edited_a1: String,
    pub actor_email: String,
    pub source: String,
}

impl Default for EventDetails {
    fn default() -> Self {
        Self {
            sheet_name: String::new(),
            spreadsheet_id: String::new(),
            spreadsheet_name: String::new(),
            change_type: String::new(),
            edited_a1: String::new(),
            actor_email: String::new(),
            source: "google-sheets".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SheetEvent {
    pub sheet_name: String,
    pub spreadsheet_id: String,
    pub spreadsheet_name: String,
    pub change_type: String,
    pub edited_a1: String,
    pub actor_email: String,
    pub source: String,
    pub received_at: DateTime<Utc>,
    pub workflow_run_id: Option<String>,
    pub workflow_repo: Option<String>,
    pub workflow_sha: Option<String>,
}

impl SheetEvent {
    /// Build an event stamped `received_at`, pulling workflow identifiers
    /// (`GITHUB_RUN_ID`, `GITHUB_REPOSITORY`, `GITHUB_SHA`) through `env`.
    pub fn new(
        details: EventDetails,
        received_at: DateTime<Utc>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        Self {
            sheet_name: details.sheet_name,
            spreadsheet_id: details.spreadsheet_id,
            spreadsheet_name: details.spreadsheet_name,
            change_type: details.change_type,
            edited_a1: details.edited_a1,
            actor_email: details.actor_email,
            source: details.source,
            received_at,
            workflow_run_id: env("GITHUB_RUN_ID"),
            workflow_repo: env("GITHUB_REPOSITORY"),
            workflow_sha: env("GITHUB_SHA"),
        }
    }

    /// Build an event for now from the process environment
    pub fn from_env(details: EventDetails) -> Self {
        Self::new(details, Utc::now(), |key| std::env::var(key).ok())
    }

    pub fn to_pretty_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OntomapError::persist_with_source("failed to serialize sheet event", e))
    }

    /// Write the event as pretty JSON, replacing any previous artifact
    pub fn write(&self, path: &Path) -> Result<()> {
        let mut json = self.to_pretty_json()?;
        json.push('\n');
        write_atomic(path, json.as_bytes())?;
        tracing::info!(path = %path.display(), change_type = %self.change_type, "Wrote sheet event");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_event_reads_workflow_env() {
        let at = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid time");
        let event = SheetEvent::new(
            EventDetails {
                sheet_name: "Form Responses 1".to_string(),
                change_type: "EDIT".to_string(),
                ..Default::default()
            },
            at,
            |key| (key == "GITHUB_RUN_ID").then(|| "42".to_string()),
        );

        assert_eq!(event.source, "google-sheets");
        assert_eq!(event.workflow_run_id.as_deref(), Some("42"));
        assert_eq!(event.workflow_sha, None);

        let json: serde_json::Value =
            serde_json::from_str(&event.to_pretty_json().expect("json")).expect("parse");
        assert_eq!(json["received_at"], "2025-03-01T12:00:00Z");
        assert_eq!(json["workflow_repo"], serde_json::Value::Null);
    }

    #[test]
    fn test_write_creates_artifact_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("artifacts").join("sheets_event.json");
        let event = SheetEvent::new(EventDetails::default(), Utc::now(), |_| None);

        event.write(&path).expect("write");
        let back: SheetEvent =
            serde_json::from_str(&std::fs::read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(back, event);
    }
}
