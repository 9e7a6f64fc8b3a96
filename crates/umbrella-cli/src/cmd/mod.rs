//! Subcommand implementations.

pub mod collect;
pub mod completions;
pub mod graph;
pub mod merge;
pub mod pom;
pub mod remap;
pub mod sources;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use umbrella_core::{BuildLayout, Plan, build_dir};

/// Load and validate the plan file.
pub(crate) async fn load_plan(path: &Path) -> Result<Arc<Plan>> {
    let plan = Plan::load(path)
        .await
        .with_context(|| format!("Failed to load plan {}", path.display()))?;
    Ok(Arc::new(plan))
}

/// Build layout from the explicit directory, or the plan's default.
pub(crate) fn layout(plan: &Plan, dir: Option<PathBuf>) -> BuildLayout {
    BuildLayout::new(dir.unwrap_or_else(|| build_dir(plan.base_dir())))
}
