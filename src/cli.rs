use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "watchshelf",
    version,
    about = "Track watch progress and build Continue Watching / Because You Watched shelves"
)]
pub struct Cli {
    /// Ledger database (overrides WATCHSHELF_DB)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// Catalog JSON file (overrides WATCHSHELF_CATALOG)
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record a playback position reported by the player
    Record {
        media_id: String,
        #[arg(allow_negative_numbers = true)]
        position: f64,
        #[arg(allow_negative_numbers = true)]
        duration: f64,
        #[arg(long)]
        series: Option<String>,
    },
    /// Clear the progress of one item
    Remove { media_id: String },
    /// Show the Continue Watching shelf
    Continue,
    /// Show the Because You Watched shelf
    Because,
    /// Resolve the episode after MEDIA_ID
    Next {
        media_id: String,
        /// Prefer another in-progress episode of the series
        #[arg(long)]
        resume: bool,
    },
    /// Pick the episode "start watching" lands on for a series
    Start { series_id: String },
    /// List the episodes of a series with progress badges
    Episodes {
        series_id: String,
        #[arg(long)]
        season: Option<u32>,
    },
    /// List the seasons of a series
    Seasons { series_id: String },
    /// List every ledger entry, most recent first
    List,
}
