use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Result, bail};
use umbrella_core::MergePipeline;
use umbrella_schema::Variant;

use crate::ui::ConsoleReporter;

/// Merge the selected variants concurrently and print each output archive.
pub async fn merge(
    plan_path: &Path,
    variants: &[String],
    build_dir: Option<PathBuf>,
    force: bool,
    quiet: bool,
) -> Result<()> {
    let plan = super::load_plan(plan_path).await?;
    let variants: Vec<Variant> = if variants.is_empty() {
        plan.variants().to_vec()
    } else {
        variants.iter().map(|v| Variant::new(v)).collect()
    };
    if variants.is_empty() {
        bail!("No variants to merge");
    }

    let layout = super::layout(&plan, build_dir);
    let reporter = Arc::new(ConsoleReporter::new(quiet));
    let pipeline = MergePipeline::new(plan, layout, reporter).force(force);

    let mut failed = 0;
    for (variant, result) in variants.iter().zip(pipeline.run(&variants).await) {
        match result {
            Ok(out) => {
                println!("{}", out.archive.display());
                if let Some(sources) = out.sources {
                    println!("{}", sources.display());
                }
            }
            Err(e) => {
                tracing::debug!("Variant '{}' failed: {}", variant, e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} variants failed", variants.len());
    }
    Ok(())
}
