//! Command execution implementations

use super::Commands;
use super::{build, inspect, plan, validate};

impl Commands {
    /// Execute the selected command.
    ///
    /// # Errors
    /// Returns an error if the underlying command fails.
    pub fn execute(&self) -> anyhow::Result<()> {
        match self {
            Commands::Build {
                model,
                output,
                deterministic,
                quiet,
            } => build::execute(model, output, *deterministic, *quiet),
            Commands::Plan {
                model,
                deterministic,
                json,
            } => plan::execute(model, *deterministic, *json),
            Commands::Inspect { source, json } => inspect::execute(source, *json),
            Commands::Validate { source } => validate::execute(source),
        }
    }
}
