//! CLI command for building a pack file

use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use uuid::Uuid;

use crate::cli::progress::{
    GEAR, LOOKING_GLASS, PACKAGE, format_size, print_done, print_step, simple_bar, update_bar,
};
use crate::model::PakModel;
use crate::pak::PakBuilder;

pub fn execute(
    model_path: &Path,
    output: &Path,
    deterministic: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    let started = Instant::now();

    if !quiet {
        print_step(1, 3, LOOKING_GLASS, &format!("Loading {}", model_path.display()));
    }
    let mut model = PakModel::from_json_file(model_path)
        .with_context(|| format!("Failed to load model: {}", model_path.display()))?;
    if model.guid.is_nil() {
        model.guid = Uuid::new_v4();
        tracing::warn!(
            "Model has no build GUID, generated {} (output is not reproducible)",
            model.guid
        );
    }

    let builder = PakBuilder::new(&model).with_deterministic(deterministic);

    let report = if quiet {
        builder.build(output)
    } else {
        print_step(2, 3, GEAR, "Planning layout...");
        print_step(3, 3, PACKAGE, &format!("Writing {}", output.display()));
        let pb = simple_bar(1, "Planning layout");
        let result = builder.build_with_progress(output, &|progress| update_bar(&pb, progress));
        pb.finish_and_clear();
        result
    }
    .with_context(|| format!("Failed to build {}", output.display()))?;

    if !quiet {
        println!(
            "Wrote {} ({} assets, {} padding)",
            format_size(report.bytes_written),
            report.plan.assets.len(),
            format_size(report.plan.padding.total)
        );
        print_done(started.elapsed());
    }
    Ok(())
}
