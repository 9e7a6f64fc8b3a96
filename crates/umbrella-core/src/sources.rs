//! Merged sources jar.

use std::path::Path;

use tracing::{debug, info};

use crate::error::Result;
use crate::io::{ContainerEntry, read_container, write_container};

fn is_source(path: &str) -> bool {
    path.ends_with(".java") || path.ends_with(".kt")
}

/// Counts reported by [`merge_sources`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourcesSummary {
    pub jars: usize,
    pub files: usize,
}

/// Merge `.java` and `.kt` entries of the given sources jars into `output`.
///
/// Dependency jars are read first, then the main module's, and a path seen
/// twice keeps its first occurrence. Missing jars are skipped.
pub fn merge_sources(main_jars: &[&Path], dep_jars: &[&Path], output: &Path) -> Result<SourcesSummary> {
    let mut entries: Vec<ContainerEntry> = Vec::new();
    let mut jars = 0;

    for jar in dep_jars.iter().chain(main_jars) {
        if !jar.exists() {
            debug!("Skipping missing sources jar: {}", jar.display());
            continue;
        }
        debug!("Extracting sources from: {}", jar.display());
        entries.extend(read_container(jar)?.into_iter().filter(|e| is_source(&e.path)));
        jars += 1;
    }

    // Stable sort keeps the first occurrence ahead of later duplicates.
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries.dedup_by(|next, prev| next.path == prev.path);
    let files = entries.len();
    write_container(output, entries)?;

    info!("Merged sources: {files} source files from {jars} JARs");
    Ok(SourcesSummary { jars, files })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn jar(dir: &Path, name: &str, files: &[(&str, &str)]) -> PathBuf {
        let path = dir.join(name);
        let entries = files
            .iter()
            .map(|(p, d)| ContainerEntry::new(*p, d.as_bytes().to_vec()))
            .collect();
        write_container(&path, entries).unwrap();
        path
    }

    #[test]
    fn keeps_only_sources_and_prefers_dependencies() {
        let dir = tempfile::tempdir().unwrap();
        let main = jar(
            dir.path(),
            "main-sources.jar",
            &[("com/main/Api.kt", "main"), ("com/shared/Util.kt", "from main"), ("README.md", "x")],
        );
        let dep = jar(
            dir.path(),
            "dep-sources.jar",
            &[("com/dep/Impl.java", "dep"), ("com/shared/Util.kt", "from dep"), ("META-INF/MANIFEST.MF", "m")],
        );
        let out = dir.path().join("out/merged-sources.jar");

        let summary = merge_sources(&[&main], &[&dep, Path::new("/missing.jar")], &out).unwrap();
        assert_eq!(summary, SourcesSummary { jars: 2, files: 3 });

        let merged = read_container(&out).unwrap();
        let names: Vec<_> = merged.iter().map(|e| e.path.as_str()).collect();
        assert_eq!(names, vec!["com/dep/Impl.java", "com/main/Api.kt", "com/shared/Util.kt"]);
        assert_eq!(merged[2].data, b"from dep");
    }
}
