//! `ontomap run`

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Parser;
use ontomap_core::{
    ClassifierState, ConfigOverrides, Enricher, HttpClassifier, JsonFileSource, OntomapConfig,
    OutputFormat, RowSource, RunPaths, RunSummary, SheetsApiSource,
};

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Read rows from a JSON file (`{"values": [...]}` or a bare array of rows)
    #[arg(long, value_name = "PATH", conflicts_with_all = ["spreadsheet_id", "sheet_name"])]
    pub source_file: Option<PathBuf>,

    /// Spreadsheet to fetch rows from
    #[arg(long, value_name = "ID", requires = "sheet_name")]
    pub spreadsheet_id: Option<String>,

    /// Tab within the spreadsheet
    #[arg(long, value_name = "TAB", requires = "spreadsheet_id")]
    pub sheet_name: Option<String>,

    /// Output collection path
    #[arg(long, value_name = "PATH")]
    pub out_path: Option<String>,

    /// Output collection format: json, jsonl or csv
    #[arg(long, value_name = "FORMAT")]
    pub out_format: Option<OutputFormat>,

    /// Mapping store path
    #[arg(long, value_name = "PATH")]
    pub store_path: Option<String>,

    /// Skip classifier calls; snapshots come from the store only
    #[arg(long)]
    pub no_enrich: bool,

    #[arg(long, value_name = "URL")]
    pub classifier_endpoint: Option<String>,

    #[arg(long, value_name = "MODEL")]
    pub classifier_model: Option<String>,

    #[arg(long, value_name = "MS")]
    pub classifier_timeout_ms: Option<u64>,

    /// Pause after each classifier call
    #[arg(long, value_name = "MS")]
    pub classifier_delay_ms: Option<u64>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            enrich: self.no_enrich.then_some(false),
            store_path: self.store_path.clone(),
            output_path: self.out_path.clone(),
            output_format: self.out_format,
            classifier_endpoint: self.classifier_endpoint.clone(),
            classifier_model: self.classifier_model.clone(),
            classifier_timeout_ms: self.classifier_timeout_ms,
            classifier_delay_ms: self.classifier_delay_ms,
        }
    }

    fn source(&self, config: &OntomapConfig) -> anyhow::Result<Box<dyn RowSource>> {
        if let Some(path) = &self.source_file {
            return Ok(Box::new(JsonFileSource::new(path)));
        }
        match (&self.spreadsheet_id, &self.sheet_name) {
            (Some(id), Some(sheet)) => Ok(Box::new(SheetsApiSource::from_config(
                &config.sheets,
                id.as_str(),
                sheet.as_str(),
            )?)),
            _ => bail!("either --source-file or --spreadsheet-id with --sheet-name is required"),
        }
    }

    pub fn run(self, config_path: Option<&Path>) -> anyhow::Result<RunSummary> {
        let config = OntomapConfig::load(config_path)
            .context("failed to load configuration")?
            .with_overrides(self.overrides())?;
        let source = self.source(&config)?;
        let paths = RunPaths::from_config(&config);
        tracing::info!(
            source = %source.describe(),
            output = %paths.output.display(),
            format = paths.output_format.as_str(),
            enrich = config.enrich,
            "Starting enrichment run"
        );

        let state = ClassifierState::resolve(config.enrich, || {
            HttpClassifier::from_config(&config.classifier)
        });
        let mut enricher = Enricher::new(state).with_delay(config.classifier.delay());

        let summary = ontomap_core::run(source.as_ref(), &paths, &mut enricher)?;
        tracing::debug!(
            classifier_ready = enricher.state().is_ready(),
            calls = enricher.calls_made(),
            "Enrichment run finished"
        );

        println!("{}: {summary}", paths.output.display());
        Ok(summary)
    }
}
