//! CLI command for validating a pack file

use std::path::Path;

use crate::pak::{inspect, validate};

pub fn execute(source: &Path) -> anyhow::Result<()> {
    let info = inspect(source)?;
    let issues = validate(&info);

    if issues.is_empty() {
        println!("{}: OK ({} assets)", source.display(), info.footer.asset_count);
        return Ok(());
    }

    println!("{}: {} issue(s)", source.display(), issues.len());
    for issue in &issues {
        println!("  - {issue}");
    }
    anyhow::bail!("Validation failed for {}", source.display());
}
