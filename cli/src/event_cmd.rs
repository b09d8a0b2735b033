//! `ontomap event`

use std::path::PathBuf;

use clap::Parser;
use ontomap_core::event::DEFAULT_EVENT_PATH;
use ontomap_core::{EventDetails, SheetEvent};

#[derive(Debug, Parser)]
pub struct EventArgs {
    #[arg(long, default_value = "")]
    pub sheet_name: String,

    #[arg(long, default_value = "")]
    pub spreadsheet_id: String,

    #[arg(long, default_value = "")]
    pub spreadsheet_name: String,

    /// Change type reported by the sheet trigger (EDIT, INSERT_ROW, ...)
    #[arg(long, default_value = "")]
    pub change_type: String,

    /// Edited range in A1 notation
    #[arg(long, default_value = "")]
    pub edited_a1: String,

    #[arg(long, default_value = "")]
    pub actor_email: String,

    #[arg(long, default_value = "google-sheets")]
    pub source: String,

    /// Artifact path
    #[arg(long, value_name = "PATH", default_value = DEFAULT_EVENT_PATH)]
    pub out_path: PathBuf,
}

impl EventArgs {
    pub fn run(self) -> anyhow::Result<()> {
        let event = SheetEvent::from_env(EventDetails {
            sheet_name: self.sheet_name,
            spreadsheet_id: self.spreadsheet_id,
            spreadsheet_name: self.spreadsheet_name,
            change_type: self.change_type,
            edited_a1: self.edited_a1,
            actor_email: self.actor_email,
            source: self.source,
        });
        event.write(&self.out_path)?;

        println!("Wrote {}", self.out_path.display());
        println!("{}", event.to_pretty_json()?);
        Ok(())
    }
}
