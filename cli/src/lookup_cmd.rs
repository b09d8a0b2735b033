//! `ontomap lookup`

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use ontomap_core::{Category, MappingStore, OntomapConfig, snapshot_field};

#[derive(Debug, Parser)]
pub struct LookupArgs {
    /// Role, Expertise or Interest
    #[arg(long, short = 'c')]
    pub category: Category,

    /// Mapping store path (default: from config)
    #[arg(long, value_name = "PATH")]
    pub store_path: Option<PathBuf>,

    /// Free text to look up
    pub text: String,
}

impl LookupArgs {
    pub fn run(self, config_path: Option<&Path>) -> anyhow::Result<()> {
        let store_path = match self.store_path {
            Some(path) => path,
            None => OntomapConfig::load(config_path)
                .context("failed to load configuration")?
                .resolved_store_path(),
        };

        let store = MappingStore::load(&store_path).into_inner();
        let snapshot = snapshot_field(&store, self.category, &self.text);
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        Ok(())
    }
}
