use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "neatstep")]
#[command(about = "AI-assisted local folder organizer", long_about = None)]
pub struct Cli {
    /// Satisfy ask-mode permission checks for this invocation only
    #[arg(long, global = true)]
    pub allow: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Scan a folder and print the discovered files
    Scan { root: PathBuf },
    /// Run the full scan -> analyze -> review -> apply cycle
    Organize {
        root: PathBuf,
        /// Remove directories left empty by the moves
        #[arg(long)]
        sweep: bool,
    },
    /// Always allow scans and moves under a folder
    Grant { path: PathBuf },
    /// Remove a previously granted folder
    Revoke { path: PathBuf },
    /// Show the activity history, newest first
    History {
        /// Maximum number of entries to print
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Clear the activity history
    ClearHistory,
    /// Show cumulative stats and stored insights
    Stats,
    /// Store the classification service API key
    SetKey { key: String },
}
