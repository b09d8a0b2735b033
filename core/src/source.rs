//! Row sources: where survey rows come from.
//!
//! Rows are a header row followed by data rows, each a list of cells already
//! converted to strings.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::Value;

use crate::config::SheetsConfig;
use crate::errors::{OntomapError, Result};

/// A header row plus data rows.
pub type Rows = Vec<Vec<String>>;

pub trait RowSource {
    /// Fetch all rows. Failure aborts the run.
    fn fetch_rows(&self) -> Result<Rows>;

    /// Human-readable origin for logs
    fn describe(&self) -> String;
}

/// Stringify one cell: `null` is empty, strings are taken as-is, everything
/// else uses its JSON text.
pub fn cell_to_string(cell: &Value) -> String {
    match cell {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Extract rows from a Sheets `values` response or a bare array of rows.
///
/// An object without a `values` key is an empty tab.
pub fn rows_from_json(value: &Value) -> Result<Rows> {
    let rows = match value {
        Value::Array(rows) => rows,
        Value::Object(map) => match map.get("values") {
            None => return Ok(Vec::new()),
            Some(Value::Array(rows)) => rows,
            Some(_) => {
                return Err(OntomapError::source_unavailable(
                    "`values` is not a list of rows",
                ));
            }
        },
        _ => {
            return Err(OntomapError::source_unavailable(
                "expected a list of rows or an object with `values`",
            ));
        }
    };

    rows.iter()
        .enumerate()
        .map(|(i, row)| match row {
            Value::Array(cells) => Ok(cells.iter().map(cell_to_string).collect()),
            _ => Err(OntomapError::source_unavailable(format!(
                "row {} is not a list of cells",
                i + 1
            ))),
        })
        .collect()
}

/// Rows read from a local JSON file.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
    path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSource for JsonFileSource {
    fn fetch_rows(&self) -> Result<Rows> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| {
            OntomapError::source_unavailable_with_source(
                format!("failed to read rows from {}", self.path.display()),
                e,
            )
        })?;
        let value: Value = serde_json::from_str(&contents).map_err(|e| {
            OntomapError::source_unavailable_with_source(
                format!("rows file {} is not valid JSON", self.path.display()),
                e,
            )
        })?;
        rows_from_json(&value)
    }

    fn describe(&self) -> String {
        format!("file {}", self.path.display())
    }
}

/// Rows read from one tab of a spreadsheet via the Sheets values API.
#[derive(Debug, Clone)]
pub struct SheetsApiSource {
    client: reqwest::blocking::Client,
    api_base: String,
    spreadsheet_id: String,
    sheet_name: String,
    token: String,
}

impl SheetsApiSource {
    /// Build from config, reading the bearer token from `cfg.token_env`.
    pub fn from_config(
        cfg: &SheetsConfig,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
    ) -> Result<Self> {
        let token = std::env::var(&cfg.token_env).ok();
        Self::with_token(cfg, spreadsheet_id, sheet_name, token)
    }

    pub fn with_token(
        cfg: &SheetsConfig,
        spreadsheet_id: impl Into<String>,
        sheet_name: impl Into<String>,
        token: Option<String>,
    ) -> Result<Self> {
        let token = token.filter(|t| !t.trim().is_empty()).ok_or_else(|| {
            OntomapError::source_unavailable(format!(
                "sheets token variable {} is not set",
                cfg.token_env
            ))
        })?;

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| {
                OntomapError::source_unavailable_with_source("failed to create HTTP client", e)
            })?;

        Ok(Self {
            client,
            api_base: cfg.api_base.clone(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: sheet_name.into(),
            token,
        })
    }

    /// `{api_base}/v4/spreadsheets/{id}/values/{sheet}?valueRenderOption=UNFORMATTED_VALUE`
    pub fn values_url(&self) -> Result<reqwest::Url> {
        let mut url = reqwest::Url::parse(&self.api_base).map_err(|e| {
            OntomapError::source_unavailable_with_source(
                format!("invalid sheets api_base {}", self.api_base),
                e,
            )
        })?;

        url.path_segments_mut()
            .map_err(|()| {
                OntomapError::source_unavailable(format!(
                    "sheets api_base {} cannot carry a path",
                    self.api_base
                ))
            })?
            .pop_if_empty()
            .extend([
                "v4",
                "spreadsheets",
                self.spreadsheet_id.as_str(),
                "values",
                self.sheet_name.as_str(),
            ]);
        url.query_pairs_mut()
            .append_pair("valueRenderOption", "UNFORMATTED_VALUE");
        Ok(url)
    }
}

impl RowSource for SheetsApiSource {
    fn fetch_rows(&self) -> Result<Rows> {
        let url = self.values_url()?;
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .send()
            .map_err(|e| {
                OntomapError::source_unavailable_with_source("sheets request failed", e)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OntomapError::source_unavailable(format!(
                "sheets API returned HTTP {status}"
            )));
        }

        let body: Value = response.json().map_err(|e| {
            OntomapError::source_unavailable_with_source("sheets response is not JSON", e)
        })?;
        let rows = rows_from_json(&body)?;
        tracing::info!(
            spreadsheet_id = %self.spreadsheet_id,
            sheet = %self.sheet_name,
            rows = rows.len(),
            "Fetched sheet rows"
        );
        Ok(rows)
    }

    fn describe(&self) -> String {
        format!("sheet {}!{}", self.spreadsheet_id, self.sheet_name)
    }
}
