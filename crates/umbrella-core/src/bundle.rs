//! Final archive packaging.

use std::fs;
use std::path::Path;

use tracing::info;

use crate::error::{IoContext, Result};
use crate::io::pack_dir;

/// Size and entry count of a bundled archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BundleInfo {
    pub entries: usize,
    pub bytes: u64,
}

impl BundleInfo {
    pub fn megabytes(&self) -> f64 {
        self.bytes as f64 / (1024.0 * 1024.0)
    }
}

/// Package the merged layout into `output`.
///
/// Entries are sorted with fixed timestamps and permissions, so unchanged
/// layouts produce byte-identical archives.
pub fn bundle(merged_dir: &Path, output: &Path) -> Result<BundleInfo> {
    let entries = pack_dir(merged_dir, output)?;
    let bytes = fs::metadata(output).at(output)?.len();
    let info = BundleInfo { entries, bytes };

    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    info!("Created umbrella archive: {name} ({:.2} MB, {bytes} bytes)", info.megabytes());
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_bundles_are_identical() {
        let dir = tempfile::tempdir().unwrap();
        let merged = dir.path().join("merged");
        fs::create_dir_all(merged.join("res/values")).unwrap();
        fs::write(merged.join("AndroidManifest.xml"), "<manifest/>").unwrap();
        fs::write(merged.join("res/values/core-strings.xml"), "<resources/>").unwrap();
        fs::write(merged.join("classes.jar"), b"PK").unwrap();

        let first = dir.path().join("out/a.aar");
        let second = dir.path().join("out/b.aar");
        let info = bundle(&merged, &first).unwrap();
        bundle(&merged, &second).unwrap();

        assert_eq!(info.entries, 3);
        assert_eq!(info.bytes, fs::metadata(&first).unwrap().len());
        assert_eq!(fs::read(&first).unwrap(), fs::read(&second).unwrap());
    }
}
