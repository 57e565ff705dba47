//! CLI command for printing a layout plan

use std::path::Path;

use anyhow::Context;

use crate::cli::progress::format_size;
use crate::model::PakModel;
use crate::pak::format::ResourceType;
use crate::pak::{PakBuilder, PakPlan};

pub fn execute(model_path: &Path, deterministic: bool, json: bool) -> anyhow::Result<()> {
    let model = PakModel::from_json_file(model_path)
        .with_context(|| format!("Failed to load model: {}", model_path.display()))?;
    let plan = PakBuilder::new(&model).with_deterministic(deterministic).plan()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    } else {
        print_plan(&plan);
    }
    Ok(())
}

fn print_plan(plan: &PakPlan) {
    println!("Layout Plan (deterministic: {})", plan.deterministic);
    println!("===========");
    println!("{:<16} {:>10} {:>10}", "Section", "Offset", "Size");
    println!("{:<16} {:>10} {:>10}", "header", 0, plan.header_size);

    for resource_type in ResourceType::ALL {
        let resource = plan.resource(resource_type);
        if resource.entries.is_empty() {
            continue;
        }
        println!(
            "{:<16} {:>10} {:>10}",
            format!("{resource_type} region"),
            resource.region.offset,
            resource.region.size
        );
        println!(
            "{:<16} {:>10} {:>10}",
            format!("{resource_type} table"),
            resource.table.offset,
            resource.table.size()
        );
    }
    for asset in &plan.assets {
        println!(
            "{:<16} {:>10} {:>10}  {}",
            asset.asset_type.as_str(),
            asset.descriptor_offset,
            asset.total_size(),
            asset.name
        );
    }
    if plan.directory.size > 0 {
        println!("{:<16} {:>10} {:>10}", "directory", plan.directory.offset, plan.directory.size);
    }
    if !plan.name_index.is_absent() {
        println!(
            "{:<16} {:>10} {:>10}",
            "name index", plan.name_index.offset, plan.name_index.size
        );
    }
    println!("{:<16} {:>10} {:>10}", "footer", plan.footer.offset, plan.footer.size);
    println!();

    println!("File size: {} ({} bytes)", format_size(plan.file_size), plan.file_size);
    println!("Padding:   {} bytes", plan.padding.total);
    for (section, bytes) in &plan.padding.by_section {
        println!("  {:<16} {:>8}", section.as_str(), bytes);
    }
}
