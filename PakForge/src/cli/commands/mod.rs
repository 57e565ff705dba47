use clap::Subcommand;
use std::path::PathBuf;

pub mod build;
pub mod execute;
pub mod inspect;
pub mod plan;
pub mod validate;

#[derive(Subcommand)]
pub enum Commands {
    /// Build a pack file from a JSON model snapshot
    Build {
        /// Model snapshot (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Output pack file
        #[arg(short, long)]
        output: PathBuf,

        /// Sort resources and assets by name for reproducible output
        #[arg(short, long)]
        deterministic: bool,

        /// Suppress progress bar
        #[arg(short, long)]
        quiet: bool,
    },

    /// Print the layout plan for a model without writing anything
    Plan {
        /// Model snapshot (JSON)
        #[arg(short, long)]
        model: PathBuf,

        /// Sort resources and assets by name
        #[arg(short, long)]
        deterministic: bool,

        /// Print the full plan as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the header, footer, directory and name index of a pack
    Inspect {
        /// Pack file
        #[arg(short, long)]
        source: PathBuf,

        /// Print the inspection result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a pack for structural problems
    Validate {
        /// Pack file
        #[arg(short, long)]
        source: PathBuf,
    },
}
