//! Merge plan parsing.
//!
//! A plan (`umbrella.toml`) stands in for the host build: it names the root
//! module and its exported module edges, every participating module with its
//! per-variant archives and classified configurations, and the exclusion
//! rules that apply to both the merge and the dependency collection.
//!
//! ```toml
//! [project]
//! name = "umbrella"
//! module = "umbrella"
//! group = "com.example"
//! version = "1.0.0"
//! variants = ["release"]
//!
//! [export]
//! modules = ["core", "feature:login"]
//! exclude = [{ group = "com.example", module = "internal" }]
//!
//! [[module]]
//! name = "umbrella"
//! namespace = "com.example.umbrella"
//! archives = { release = "umbrella/build/outputs/aar/umbrella-release.aar" }
//!
//! [[module.configurations]]
//! name = "androidMainImplementation"
//! tier = "platform"
//! dependencies = ["io.coil-kt:coil:2.7.0"]
//! ```

use crate::error::{Result, UmbrellaError};
use crate::graph::{ModuleGraph, find_all_module_dependencies};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use umbrella_schema::{Declared, ExclusionRule, ModuleName, Namespace, SurfaceClass, Variant};

/// Key used for archives that serve every variant (plain JVM modules).
pub const ANY_VARIANT: &str = "default";

/// Top-level merge plan parsed from an `umbrella.toml` file.
#[derive(Debug, Clone, Deserialize)]
pub struct Plan {
    pub project: ProjectSection,
    #[serde(default)]
    pub export: ExportSection,
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleSpec>,
    /// Platform artifacts already resolved by the host, used to substitute
    /// cross-ecosystem coordinates during collection.
    #[serde(default)]
    pub resolved: Vec<Declared>,
    #[serde(skip)]
    base_dir: PathBuf,
}

/// The `[project]` section: identity of the umbrella artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectSection {
    /// Base name of the output archives.
    pub name: String,
    /// The root (main) module whose archive everything is folded into.
    pub module: ModuleName,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    /// Overrides the root module's namespace.
    #[serde(default)]
    pub namespace: Option<Namespace>,
    #[serde(default = "default_variants")]
    pub variants: Vec<Variant>,
}

fn default_variants() -> Vec<Variant> {
    vec![Variant::new("release")]
}

/// The `[export]` section: the root configuration's module edges.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportSection {
    #[serde(default)]
    pub modules: Vec<ModuleName>,
    #[serde(default)]
    pub exclude: Vec<ExclusionRule>,
}

/// One `[[module]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct ModuleSpec {
    pub name: ModuleName,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub namespace: Option<Namespace>,
    /// Archive produced per variant; `default` serves any variant.
    #[serde(default)]
    pub archives: BTreeMap<String, PathBuf>,
    /// Sources jars produced per variant; `default` serves any variant.
    #[serde(default)]
    pub sources: BTreeMap<String, Vec<PathBuf>>,
    #[serde(default)]
    pub configurations: Vec<ConfigurationSpec>,
}

/// A classified dependency declaration surface of a module.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigurationSpec {
    pub name: String,
    #[serde(flatten)]
    pub class: SurfaceClass,
    /// Module edges declared on this surface.
    #[serde(default)]
    pub modules: Vec<ModuleName>,
    /// External dependencies declared on this surface.
    #[serde(default)]
    pub dependencies: Vec<Declared>,
}

/// Capability of a module to produce the archives the pipeline consumes.
pub trait ArchiveSource {
    /// Packaged archive built for `variant`, if the module produces one.
    fn produces_archive(&self, variant: &Variant) -> Option<&Path>;

    /// Sources jars built for `variant`.
    fn produces_sources_archive(&self, variant: &Variant) -> &[PathBuf];
}

fn lookup<'a, T>(map: &'a BTreeMap<String, T>, variant: &Variant) -> Option<&'a T> {
    map.get(variant.as_str())
        .or_else(|| {
            map.iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(variant.as_str()))
                .map(|(_, v)| v)
        })
        .or_else(|| map.get(ANY_VARIANT))
}

impl ArchiveSource for ModuleSpec {
    fn produces_archive(&self, variant: &Variant) -> Option<&Path> {
        lookup(&self.archives, variant).map(PathBuf::as_path)
    }

    fn produces_sources_archive(&self, variant: &Variant) -> &[PathBuf] {
        lookup(&self.sources, variant).map_or(&[], Vec::as_slice)
    }
}

impl ModuleSpec {
    /// Module edges declared on exported (declaration-role) configurations.
    pub fn exported_edges(&self) -> impl Iterator<Item = &ModuleName> {
        self.configurations
            .iter()
            .filter(|c| c.class.is_exported())
            .flat_map(|c| c.modules.iter())
    }
}

impl Plan {
    /// Asynchronously load and parse a plan, resolving relative paths
    /// against the plan file's directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid TOML, or
    /// references modules it does not define.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| UmbrellaError::io(path, e))?;
        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Self::parse(&content, base).map_err(|e| match e {
            UmbrellaError::Toml { source, .. } => UmbrellaError::Toml {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }

    /// Parse plan text, resolving relative paths against `base_dir`.
    pub fn parse(content: &str, base_dir: &Path) -> Result<Self> {
        let mut plan: Plan = toml::from_str(content).map_err(|source| UmbrellaError::Toml {
            path: base_dir.join("umbrella.toml"),
            source,
        })?;
        plan.base_dir = base_dir.to_path_buf();
        plan.resolve_paths();
        plan.validate()?;
        Ok(plan)
    }

    fn resolve_paths(&mut self) {
        let base = self.base_dir.clone();
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for module in &mut self.modules {
            module.archives.values_mut().for_each(resolve);
            module
                .sources
                .values_mut()
                .flat_map(|v| v.iter_mut())
                .for_each(resolve);
        }
    }

    fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for module in &self.modules {
            if !seen.insert(module.name.as_str()) {
                return Err(UmbrellaError::Plan(format!(
                    "module '{}' is defined more than once",
                    module.name
                )));
            }
        }
        let mut owners = std::collections::HashMap::new();
        for module in &self.modules {
            let owner = module.name.owner();
            if let Some(other) = owners.insert(owner.clone(), &module.name) {
                return Err(UmbrellaError::Plan(format!(
                    "modules '{other}' and '{}' both extract into '{owner}'",
                    module.name
                )));
            }
        }
        if self.module(&self.project.module).is_none() {
            return Err(UmbrellaError::Plan(format!(
                "root module '{}' is not defined",
                self.project.module
            )));
        }
        let edges = self.export.modules.iter().chain(
            self.modules
                .iter()
                .flat_map(|m| m.configurations.iter())
                .flat_map(|c| c.modules.iter()),
        );
        for edge in edges {
            if self.module(edge).is_none() {
                return Err(UmbrellaError::Plan(format!(
                    "module '{edge}' is referenced but not defined"
                )));
            }
        }
        if self.project.variants.is_empty() {
            return Err(UmbrellaError::Plan("no variants declared".into()));
        }
        Ok(())
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn module(&self, name: &ModuleName) -> Option<&ModuleSpec> {
        self.modules.iter().find(|m| &m.name == name)
    }

    pub fn root(&self) -> &ModuleName {
        &self.project.module
    }

    /// The root module's spec. Presence is checked when the plan is parsed.
    pub fn root_module(&self) -> Result<&ModuleSpec> {
        self.module(self.root()).ok_or_else(|| {
            UmbrellaError::Plan(format!("root module '{}' is not defined", self.root()))
        })
    }

    /// Namespace that generated resource classes are remapped into.
    pub fn main_namespace(&self) -> Result<Namespace> {
        let ns = self
            .project
            .namespace
            .clone()
            .or_else(|| self.root_module().ok().and_then(|m| m.namespace.clone()))
            .unwrap_or_default();
        if ns.is_empty() {
            return Err(UmbrellaError::Plan(format!(
                "no namespace for root module '{}'",
                self.root()
            )));
        }
        Ok(ns)
    }

    pub fn exclusions(&self) -> &[ExclusionRule] {
        &self.export.exclude
    }

    pub fn variants(&self) -> &[Variant] {
        &self.project.variants
    }

    /// Modules folded into the root, in traversal order, exclusions applied.
    pub fn merged_modules(&self) -> Vec<ModuleName> {
        find_all_module_dependencies(self, self.root(), &self.export.modules, self.exclusions())
    }
}

impl ModuleGraph for Plan {
    fn exported_edges(&self, module: &ModuleName) -> Vec<ModuleName> {
        self.module(module)
            .map(|m| m.exported_edges().cloned().collect())
            .unwrap_or_default()
    }

    fn group(&self, module: &ModuleName) -> Option<&str> {
        self.module(module)
            .map(|m| m.group.as_str())
            .filter(|g| !g.is_empty())
            .or(self.project.group.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use umbrella_schema::{Role, Tier};

    const PLAN: &str = r#"
[project]
name = "umbrella"
module = "umbrella"
group = "com.example"
variants = ["release", "debug"]

[export]
modules = [":core"]
exclude = [{ module = "internal" }]

[[module]]
name = "umbrella"
namespace = "com.example.umbrella"
archives = { release = "out/umbrella-release.aar", debug = "out/umbrella-debug.aar" }
sources = { release = ["out/umbrella-sources.jar"] }

[[module]]
name = "core"
archives = { default = "/abs/core.jar" }

[[module.configurations]]
name = "commonMainApi"
modules = ["internal"]
dependencies = ["org.x:lib:1.0.0"]

[[module.configurations]]
name = "androidUnitTestImplementation"
role = "test"
tier = "platform"
modules = ["umbrella"]

[[module]]
name = "internal"
"#;

    #[test]
    fn parses_and_resolves_paths() {
        let plan = Plan::parse(PLAN, Path::new("/project")).unwrap();
        let root = plan.root_module().unwrap();
        assert_eq!(
            root.produces_archive(&Variant::new("release")),
            Some(Path::new("/project/out/umbrella-release.aar"))
        );
        assert_eq!(
            root.produces_sources_archive(&Variant::new("release")),
            &[PathBuf::from("/project/out/umbrella-sources.jar")]
        );
        assert!(root.produces_sources_archive(&Variant::new("debug")).is_empty());
        assert_eq!(plan.main_namespace().unwrap().as_str(), "com.example.umbrella");
        assert_eq!(plan.variants().len(), 2);
    }

    #[test]
    fn default_archive_serves_every_variant() {
        let plan = Plan::parse(PLAN, Path::new("/project")).unwrap();
        let core = plan.module(&ModuleName::new("core")).unwrap();
        assert_eq!(
            core.produces_archive(&Variant::new("debug")),
            Some(Path::new("/abs/core.jar"))
        );
    }

    #[test]
    fn classification_is_read_from_plan() {
        let plan = Plan::parse(PLAN, Path::new("/project")).unwrap();
        let core = plan.module(&ModuleName::new("core")).unwrap();
        let test_conf = &core.configurations[1];
        assert_eq!(test_conf.class.role, Role::Test);
        assert_eq!(test_conf.class.tier, Tier::Platform);
        assert_eq!(core.configurations[0].class.tier, Tier::Common);
        // Test surfaces are not exported.
        let edges: Vec<_> = core.exported_edges().collect();
        assert_eq!(edges, vec![&ModuleName::new("internal")]);
    }

    #[test]
    fn group_falls_back_to_project() {
        let plan = Plan::parse(PLAN, Path::new("/project")).unwrap();
        assert_eq!(plan.group(&ModuleName::new("core")), Some("com.example"));
    }

    #[test]
    fn unknown_edge_is_rejected() {
        let bad = PLAN.replace("modules = [\":core\"]", "modules = [\"missing\"]");
        let err = Plan::parse(&bad, Path::new("/p")).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn colliding_owner_folders_are_rejected() {
        let bad = format!("{PLAN}\n[[module]]\nname = \"feature:login\"\n\n[[module]]\nname = \"feature_login\"\n");
        let err = Plan::parse(&bad, Path::new("/p")).unwrap_err();
        assert!(matches!(err, UmbrellaError::Plan(_)));
        assert!(err.to_string().contains("both extract into 'feature_login'"));
    }

    #[test]
    fn missing_root_is_rejected() {
        let bad = PLAN.replace("module = \"umbrella\"", "module = \"nope\"");
        assert!(matches!(
            Plan::parse(&bad, Path::new("/p")),
            Err(UmbrellaError::Plan(_))
        ));
    }

    #[test]
    fn bad_dependency_record_fails_parse() {
        let bad = PLAN.replace("org.x:lib:1.0.0", "org.x:lib");
        assert!(matches!(
            Plan::parse(&bad, Path::new("/p")),
            Err(UmbrellaError::Toml { .. })
        ));
    }

    #[tokio::test]
    async fn load_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("umbrella.toml");
        std::fs::write(&path, PLAN).unwrap();
        let plan = Plan::load(&path).await.unwrap();
        assert_eq!(plan.base_dir(), dir.path());
        assert_eq!(plan.project.name, "umbrella");
    }
}
