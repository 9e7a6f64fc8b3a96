use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use umbrella_core::MergePipeline;
use umbrella_schema::Variant;

use crate::ui::ConsoleReporter;

/// Merge the sources jars of one variant.
pub async fn sources(plan_path: &Path, variant: &str, build_dir: Option<PathBuf>, quiet: bool) -> Result<()> {
    let plan = super::load_plan(plan_path).await?;
    let variant = Variant::new(variant);
    let layout = super::layout(&plan, build_dir);
    let pipeline = MergePipeline::new(plan, layout, Arc::new(ConsoleReporter::new(quiet)));

    match pipeline
        .run_sources(&variant)
        .await
        .with_context(|| format!("Failed to merge sources for '{variant}'"))?
    {
        Some((path, summary)) => {
            eprintln!("Merged {} source files from {} jars", summary.files, summary.jars);
            println!("{}", path.display());
        }
        None => eprintln!("No module publishes sources for '{variant}'"),
    }
    Ok(())
}
