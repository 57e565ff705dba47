//! CLI command for inspecting a pack file

use std::path::Path;

use uuid::Uuid;

use crate::cli::progress::format_size;
use crate::pak::format::ResourceType;
use crate::pak::{PakInfo, inspect};

pub fn execute(source: &Path, json: bool) -> anyhow::Result<()> {
    let info = inspect(source)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("Inspecting pack: {}", source.display());
    println!();
    print_info(&info);
    Ok(())
}

fn print_info(info: &PakInfo) {
    println!("Pack Information");
    println!("================");
    println!("Format version:  {}", info.header.format_version);
    println!("Content version: {}", info.header.content_version);
    println!("Build GUID:      {}", Uuid::from_bytes(info.header.guid));
    println!("File size:       {} ({} bytes)", format_size(info.file_size), info.file_size);
    println!(
        "Checksum:        {:#010x} ({})",
        info.footer.checksum,
        if info.checksum_matches { "ok" } else { "MISMATCH" }
    );
    println!();

    println!("Resources:");
    println!("----------");
    for resource_type in ResourceType::ALL {
        let region = info.footer.regions[resource_type.index()];
        let table = info.footer.tables[resource_type.index()];
        if table.count == 0 && region.is_empty() {
            println!("  {:8} (none)", resource_type.as_str());
        } else {
            println!(
                "  {:8} {:>4} entries  region @{} ({})  table @{}",
                resource_type.as_str(),
                table.count,
                region.offset,
                format_size(region.size),
                table.offset
            );
        }
    }
    println!();

    println!("Assets ({}):", info.footer.asset_count);
    println!("----------");
    if !info.directory_parsed {
        println!("  (directory could not be parsed)");
    }
    for asset in &info.entries {
        let kind = asset
            .asset_type()
            .map_or_else(|| format!("type {}", asset.entry.asset_type), |t| t.to_string());
        println!(
            "  {:8} {}  @{:<8} {:>8} bytes  {}",
            kind,
            asset.entry.key,
            asset.entry.descriptor_offset,
            asset.entry.descriptor_size,
            asset.name.as_deref().unwrap_or("?")
        );
    }

    if let Some(entries) = &info.name_index {
        println!();
        println!("Name index ({} paths):", entries.len());
        for entry in entries {
            println!("  {} -> {}", entry.path, entry.key);
        }
    }
}
