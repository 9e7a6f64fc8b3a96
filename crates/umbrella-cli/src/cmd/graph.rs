use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use umbrella_core::ArchiveSource;
use umbrella_core::graph::ModuleGraph;
use umbrella_schema::Variant;

use crate::ui::table::graph_table;

/// One merged module, in fold order.
#[derive(Debug, Serialize)]
pub struct GraphRow {
    pub module: String,
    pub owner: String,
    pub group: Option<String>,
    pub archive: Option<String>,
}

/// Print the modules the root exports, transitively, in fold order.
pub async fn graph(plan_path: &Path, variant: Option<&str>, json: bool) -> Result<()> {
    let plan = super::load_plan(plan_path).await?;
    let variant = variant.map(Variant::new);

    let rows: Vec<GraphRow> = plan
        .merged_modules()
        .into_iter()
        .map(|module| {
            let archive = variant.as_ref().and_then(|v| {
                plan.module(&module)
                    .and_then(|spec| spec.produces_archive(v))
                    .map(|p| p.display().to_string())
            });
            GraphRow {
                owner: module.owner(),
                group: plan.group(&module).map(str::to_string),
                module: module.to_string(),
                archive,
            }
        })
        .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        println!();
        println!("  '{}' exports no modules.", plan.root());
        return Ok(());
    }
    println!("{}", graph_table(plan.root().as_str(), &rows, variant.is_some()));
    Ok(())
}
