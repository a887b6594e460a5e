//! CLI command definitions
//!
//! Defines the clap commands for the thread view CLI.

use clap::Subcommand;
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum Commands {
    /// Replay notification scenarios against the thread view
    Replay {
        /// Scenario files (YAML)
        #[arg(required = true)]
        scenarios: Vec<PathBuf>,

        /// Print every view update handed to the UI
        #[arg(long, short)]
        verbose: bool,

        /// Print the final registry snapshot of each scenario as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config {
        /// Configuration file to use instead of the default location
        #[arg(long)]
        file: Option<PathBuf>,
    },
}
