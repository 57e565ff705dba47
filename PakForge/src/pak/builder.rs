//! High-level build entry point: plan, then write

use std::path::Path;

use serde::Serialize;

use super::plan::PakPlan;
use super::planner::compute_plan;
use super::types::{PakPhase, PakProgress, ProgressCallback};
use super::writer::write_pak_with_progress;
use crate::error::Result;
use crate::model::PakModel;

/// Outcome of a successful build.
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    pub plan: PakPlan,
    pub bytes_written: u64,
}

/// Builds one pack file from a model
pub struct PakBuilder<'a> {
    model: &'a PakModel,
    deterministic: bool,
}

impl<'a> PakBuilder<'a> {
    /// Create a builder that keeps model order
    #[must_use]
    pub fn new(model: &'a PakModel) -> Self {
        Self {
            model,
            deterministic: false,
        }
    }

    /// Sort resources and assets by name within each type
    #[must_use]
    pub fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Compute the layout without writing anything
    pub fn plan(&self) -> Result<PakPlan> {
        compute_plan(&self.model.resources, &self.model.assets, self.deterministic)
    }

    /// Plan and write the pack to `output`
    pub fn build(&self, output: impl AsRef<Path>) -> Result<BuildReport> {
        self.build_with_progress(output, &|_| {})
    }

    /// Plan and write the pack with a progress callback
    pub fn build_with_progress(
        &self,
        output: impl AsRef<Path>,
        progress: ProgressCallback,
    ) -> Result<BuildReport> {
        let output = output.as_ref();
        tracing::info!(
            "Building {} ({} resources, {} assets, deterministic: {})",
            output.display(),
            self.model.resources.textures.len()
                + self.model.resources.buffers.len()
                + self.model.resources.audio.len(),
            self.model.assets.len(),
            self.deterministic
        );

        progress(&PakProgress::new(PakPhase::Planning, 0, 1));
        let plan = self.plan()?;
        let bytes_written = write_pak_with_progress(self.model, &plan, output, progress)?;

        Ok(BuildReport {
            plan,
            bytes_written,
        })
    }
}
