//! `ontomap` command line: enrichment runs, store lookups and sheet events.

pub mod event_cmd;
pub mod lookup_cmd;
pub mod run_cmd;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use event_cmd::EventArgs;
pub use lookup_cmd::LookupArgs;
pub use run_cmd::RunArgs;

/// Map survey answers to ontology concepts and keep the mappings cached
#[derive(Debug, Parser)]
#[command(name = "ontomap", version, about)]
pub struct Cli {
    /// Config file (default: $ONTOMAP_CONFIG, then ~/.config/ontomap/ontomap.toml)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch survey rows, enrich them and update the output and store files
    Run(RunArgs),

    /// Print the cached mappings for a piece of text (no classifier call)
    Lookup(LookupArgs),

    /// Record a sheet change event as a JSON artifact
    Event(EventArgs),
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        let config = self.config.as_deref();
        match self.command {
            Command::Run(args) => args.run(config).map(|_| ()),
            Command::Lookup(args) => args.run(config),
            Command::Event(args) => args.run(),
        }
    }
}
