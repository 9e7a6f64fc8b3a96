//! Table rendering for `umbrella graph`.

use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Cell, Table};

use crate::cmd::graph::GraphRow;

/// Render merged modules as a table, numbered in fold order.
pub fn graph_table(root: &str, rows: &[GraphRow], with_archives: bool) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);

    let mut header = vec![
        Cell::new("#"),
        Cell::new(format!("module (root: {root})")),
        Cell::new("owner"),
        Cell::new("group"),
    ];
    if with_archives {
        header.push(Cell::new("archive"));
    }
    table.set_header(header);

    for (idx, row) in rows.iter().enumerate() {
        let mut cells = vec![
            Cell::new(idx + 1),
            Cell::new(&row.module),
            Cell::new(&row.owner),
            Cell::new(row.group.as_deref().unwrap_or("-")),
        ];
        if with_archives {
            cells.push(Cell::new(row.archive.as_deref().unwrap_or("(none)")));
        }
        table.add_row(cells);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(module: &str, archive: Option<&str>) -> GraphRow {
        GraphRow {
            module: module.to_string(),
            owner: module.replace(':', "_"),
            group: Some("com.example".to_string()),
            archive: archive.map(str::to_string),
        }
    }

    #[test]
    fn rows_are_numbered_in_order() {
        let rows = [row("core", None), row("feature:login", None)];
        let rendered = graph_table("umbrella", &rows, false).to_string();
        assert!(rendered.contains("feature_login"));
        assert!(rendered.find("core").unwrap() < rendered.find("feature:login").unwrap());
        assert!(!rendered.contains("archive"));
    }

    #[test]
    fn missing_archive_is_marked() {
        let rows = [row("core", Some("core.aar")), row("legacy", None)];
        let rendered = graph_table("umbrella", &rows, true).to_string();
        assert!(rendered.contains("core.aar"));
        assert!(rendered.contains("(none)"));
    }
}
