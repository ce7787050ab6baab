use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "music-duper")]
#[command(about = "Index, dedupe and organize a music library", long_about = None)]
pub struct Cli {
    /// Index database location (overrides db_path)
    #[arg(long, global = true)]
    pub db: Option<String>,

    /// Number of scanner workers (overrides readers)
    #[arg(long, global = true)]
    pub readers: Option<usize>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Index every file under PATH and reject non-music or untagged files
    Assemble { path: PathBuf },
    /// Resolve exact and semantic duplicates
    Analyze {
        /// Keep the first member of every cluster instead of prompting
        #[arg(long)]
        auto: bool,
    },
    /// Delete the files recorded as duplicates
    DupNuke {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
    /// Move surviving files into DEST/<artist>/<album>/<NN> <title>
    Move {
        dest: PathBuf,
        /// Report destinations without moving anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Print row counts for every index table
    Status,
    /// Print configuration values
    PrintConfig,
    /// Truncate all index tables
    TruncateDb,
}
