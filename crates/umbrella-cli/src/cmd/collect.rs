use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use umbrella_core::collector::{collect_external_dependencies, write_dependency_file};
use umbrella_schema::Variant;

/// Collect the variant's external dependencies into a coordinate file.
pub async fn collect(
    plan_path: &Path,
    variant: &str,
    output: Option<PathBuf>,
    build_dir: Option<PathBuf>,
) -> Result<()> {
    let plan = super::load_plan(plan_path).await?;
    let variant = Variant::new(variant);
    let output = output.unwrap_or_else(|| super::layout(&plan, build_dir).dependency_file(&variant));

    let collection = collect_external_dependencies(&plan, &variant)
        .with_context(|| format!("Failed to collect dependencies for '{variant}'"))?;
    let duplicates = write_dependency_file(&output, &collection.coordinates)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    let stats = collection.stats;
    eprintln!(
        "Collected {} dependencies ({} excluded, {} suppressed, {} mapped, {} kept unresolved)",
        stats.collected, stats.excluded, stats.suppressed, stats.mapped, stats.unresolved
    );
    if stats.rules_applied > 0 {
        eprintln!("Applied {} exclusion rules", stats.rules_applied);
    }
    if duplicates > 0 {
        eprintln!("Removed {duplicates} duplicate records");
    }
    println!("{}", output.display());
    Ok(())
}
