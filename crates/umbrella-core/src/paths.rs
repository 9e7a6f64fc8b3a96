use std::path::{Path, PathBuf};

use umbrella_schema::Variant;

/// Environment variable overriding the build directory.
pub const BUILD_DIR_ENV: &str = "UMBRELLA_BUILD_DIR";

/// Resolve the build directory: `UMBRELLA_BUILD_DIR` if set, otherwise
/// `<project_dir>/build`.
pub fn build_dir(project_dir: &Path) -> PathBuf {
    if let Ok(val) = std::env::var(BUILD_DIR_ENV) {
        if !val.is_empty() {
            return PathBuf::from(val);
        }
    }
    project_dir.join("build")
}

/// On-disk layout of one build directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildLayout {
    root: PathBuf,
}

impl BuildLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Per-variant working directory: `<build>/intermediates/umbrella/<variant>`
    pub fn variant_dir(&self, variant: &Variant) -> PathBuf {
        self.root
            .join("intermediates")
            .join("umbrella")
            .join(variant)
    }

    /// Extracted dependency trees, one folder per owner.
    pub fn dependencies_dir(&self, variant: &Variant) -> PathBuf {
        self.variant_dir(variant).join("dependencies")
    }

    /// Main module layout that dependencies are folded into.
    pub fn merged_dir(&self, variant: &Variant) -> PathBuf {
        self.variant_dir(variant).join("merged")
    }

    /// Collected coordinate file: `<build>/intermediates/umbrella/<variant>/external-dependencies.txt`
    pub fn dependency_file(&self, variant: &Variant) -> PathBuf {
        self.variant_dir(variant).join("external-dependencies.txt")
    }

    /// `<build>/outputs/umbrella`
    pub fn outputs_dir(&self) -> PathBuf {
        self.root.join("outputs").join("umbrella")
    }

    /// Final archive: `<build>/outputs/umbrella/<project>-<variant>.aar`
    pub fn output_archive(&self, project: &str, variant: &Variant) -> PathBuf {
        self.outputs_dir()
            .join(format!("{project}-{variant}.aar"))
    }

    /// Merged sources: `<build>/outputs/umbrella/<project>-<variant>-sources.jar`
    pub fn output_sources(&self, project: &str, variant: &Variant) -> PathBuf {
        self.outputs_dir()
            .join(format!("{project}-{variant}-sources.jar"))
    }
}

/// Stamp file stored next to an output archive.
pub fn stamp_path(output: &Path) -> PathBuf {
    let mut name = output
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".stamp");
    output.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let layout = BuildLayout::new("/b");
        let v = Variant::new("release");
        assert_eq!(
            layout.merged_dir(&v),
            PathBuf::from("/b/intermediates/umbrella/release/merged")
        );
        assert_eq!(
            layout.dependencies_dir(&v),
            PathBuf::from("/b/intermediates/umbrella/release/dependencies")
        );
        assert_eq!(
            layout.output_archive("lib", &v),
            PathBuf::from("/b/outputs/umbrella/lib-release.aar")
        );
        assert_eq!(
            layout.output_sources("lib", &v),
            PathBuf::from("/b/outputs/umbrella/lib-release-sources.jar")
        );
    }

    #[test]
    fn stamp_sits_next_to_output() {
        assert_eq!(
            stamp_path(Path::new("/o/lib-release.aar")),
            PathBuf::from("/o/lib-release.aar.stamp")
        );
    }
}
