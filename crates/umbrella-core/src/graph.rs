//! Module graph walk.
//!
//! Finds every module the root exports, directly or through other exported
//! modules, in breadth-first order.

use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::debug;
use umbrella_schema::{ExclusionRule, ModuleName, is_excluded};

/// Read-only view of the module graph.
pub trait ModuleGraph {
    /// Module edges declared on the module's exported (declaration-role,
    /// non-test) configurations, in declaration order.
    fn exported_edges(&self, module: &ModuleName) -> Vec<ModuleName>;

    /// Publishing group of a module, used when matching exclusion rules.
    fn group(&self, module: &ModuleName) -> Option<&str>;
}

/// In-memory adjacency list; every module shares no group.
impl ModuleGraph for BTreeMap<ModuleName, Vec<ModuleName>> {
    fn exported_edges(&self, module: &ModuleName) -> Vec<ModuleName> {
        self.get(module).cloned().unwrap_or_default()
    }

    fn group(&self, _module: &ModuleName) -> Option<&str> {
        None
    }
}

/// Finds every module transitively reachable from the root's export edges.
///
/// Performs a breadth-first traversal with a visited set, so cycles and
/// diamonds are explored once. The root is never part of the result.
/// Exclusion rules filter the result after traversal: an excluded module's
/// own dependencies are still reachable through it.
///
/// The returned order is the discovery order, which is also the order
/// dependencies are folded into the main archive.
pub fn find_all_module_dependencies<G: ModuleGraph + ?Sized>(
    graph: &G,
    root: &ModuleName,
    export_edges: &[ModuleName],
    rules: &[ExclusionRule],
) -> Vec<ModuleName> {
    let mut visited: HashSet<ModuleName> = HashSet::new();
    let mut order = Vec::new();
    let mut queue = VecDeque::new();

    visited.insert(root.clone());
    for edge in export_edges {
        if visited.insert(edge.clone()) {
            order.push(edge.clone());
            queue.push_back(edge.clone());
        }
    }

    while let Some(current) = queue.pop_front() {
        for next in graph.exported_edges(&current) {
            if visited.insert(next.clone()) {
                debug!("Discovered module '{}' via '{}'", next, current);
                order.push(next.clone());
                queue.push_back(next);
            }
        }
    }

    order
        .into_iter()
        .filter(|m| {
            let excluded = is_excluded(rules, graph.group(m), Some(m.artifact()));
            if excluded {
                debug!("Excluding module '{}'", m);
            }
            !excluded
        })
        .collect()
}
