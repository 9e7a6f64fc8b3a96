//! Per-variant merge pipeline.
//!
//! extract main -> extract dependencies (concurrently) -> fold each
//! dependency in traversal order -> finalize -> bundle -> sources.
//!
//! Variants are independent: each owns its working directories under the
//! build layout, and a failure aborts only that variant.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use futures::future::join_all;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use umbrella_schema::{ModuleName, Variant};

use crate::bundle::bundle;
use crate::error::{IoContext, Result, UmbrellaError};
use crate::fingerprint::Fingerprint;
use crate::io::{ArchiveKind, Extracted, extract_dependency, extract_main};
use crate::merge::{finalize_layout, merge_dependency};
use crate::paths::{BuildLayout, stamp_path};
use crate::plan::{ArchiveSource, Plan};
use crate::remap::Remapper;
use crate::reporter::Reporter;
use crate::sources::{SourcesSummary, merge_sources};

/// Result of one variant run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantOutput {
    pub variant: Variant,
    pub archive: PathBuf,
    /// Merged sources jar, when any module publishes sources.
    pub sources: Option<PathBuf>,
    /// The fingerprint matched and nothing was rebuilt.
    pub skipped: bool,
    /// Dependency modules folded into the main archive.
    pub modules: usize,
}

/// Run a blocking closure off the async runtime.
async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| UmbrellaError::Join(e.to_string()))?
}

/// A dependency module and the archive it produced for the variant.
#[derive(Debug, Clone)]
struct DependencyArchive {
    module: ModuleName,
    archive: PathBuf,
    sources: Vec<PathBuf>,
}

#[derive(Clone)]
pub struct MergePipeline {
    plan: Arc<Plan>,
    layout: BuildLayout,
    reporter: Arc<dyn Reporter>,
    force: bool,
}

impl MergePipeline {
    pub fn new(plan: Arc<Plan>, layout: BuildLayout, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            plan,
            layout,
            reporter,
            force: false,
        }
    }

    /// Rebuild even when the inputs match the stored fingerprint.
    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn layout(&self) -> &BuildLayout {
        &self.layout
    }

    fn dependency_archives(&self, variant: &Variant) -> Vec<DependencyArchive> {
        let mut deps = Vec::new();
        for module in self.plan.merged_modules() {
            let Some(spec) = self.plan.module(&module) else {
                continue;
            };
            match spec.produces_archive(variant) {
                Some(archive) => deps.push(DependencyArchive {
                    archive: archive.to_path_buf(),
                    sources: spec.produces_sources_archive(variant).to_vec(),
                    module,
                }),
                None => {
                    warn!("Module '{}' produces no archive for variant '{}'", module, variant);
                    self.reporter
                        .warning(&format!("'{module}' has no archive for {variant}, skipping"));
                }
            }
        }
        deps
    }

    /// Merge every variant concurrently. Results come back in input order;
    /// one variant failing does not stop the others.
    pub async fn run(&self, variants: &[Variant]) -> Vec<Result<VariantOutput>> {
        let start = Instant::now();
        let results = join_all(variants.iter().map(|v| async move {
            let result = self.run_variant(v).await;
            if let Err(e) = &result {
                self.reporter.variant_failed(v, &e.to_string());
            }
            result
        }))
        .await;

        let built = results
            .iter()
            .filter(|r| matches!(r, Ok(out) if !out.skipped))
            .count();
        if built > 0 {
            self.reporter
                .summary(built, "merged", start.elapsed().as_secs_f64());
        }
        results
    }

    /// Merge one variant into `<build>/outputs/umbrella/<project>-<variant>.aar`.
    ///
    /// # Errors
    ///
    /// Any fatal condition of the stages: a malformed archive, a duplicate
    /// resource, a manifest conflict, or I/O failure. No output archive is
    /// left behind for a failed run.
    pub async fn run_variant(&self, variant: &Variant) -> Result<VariantOutput> {
        let plan = &self.plan;
        let namespace = plan.main_namespace()?;
        let root = plan.root_module()?;
        let main_archive = root
            .produces_archive(variant)
            .ok_or_else(|| {
                UmbrellaError::Plan(format!(
                    "root module '{}' produces no archive for variant '{variant}'",
                    root.name
                ))
            })?
            .to_path_buf();
        let main_sources = root.produces_sources_archive(variant).to_vec();
        let deps = self.dependency_archives(variant);
        let output = self.layout.output_archive(&plan.project.name, variant);

        if deps.is_empty() {
            warn!("No dependencies to extract for variant '{}'", variant);
            self.reporter
                .warning(&format!("no dependencies to merge for {variant}"));
        }

        let has_sources = !main_sources.is_empty() || deps.iter().any(|d| !d.sources.is_empty());
        let sources = has_sources.then(|| self.layout.output_sources(&plan.project.name, variant));

        let fingerprint = {
            let mut archives = vec![(root.name.to_string(), main_archive.clone())];
            archives.extend(deps.iter().map(|d| (d.module.to_string(), d.archive.clone())));
            let mut jars = main_sources.clone();
            jars.extend(deps.iter().flat_map(|d| d.sources.iter().cloned()));
            let namespace = namespace.clone();
            let rules = plan.exclusions().to_vec();
            blocking(move || {
                let archives: Vec<(&str, &Path)> = archives
                    .iter()
                    .map(|(m, p)| (m.as_str(), p.as_path()))
                    .collect();
                let jars: Vec<&Path> = jars.iter().map(PathBuf::as_path).collect();
                Fingerprint::compute(&archives, &jars, &namespace, &rules)
            })
            .await?
        };

        let outputs_present = sources.as_ref().is_none_or(|p| p.exists());
        if !self.force && outputs_present && fingerprint.is_current(&output) {
            info!("Variant '{}' is up to date ({})", variant, fingerprint);
            self.reporter.variant_done(variant, &output, true);
            return Ok(VariantOutput {
                variant: variant.clone(),
                archive: output,
                sources,
                skipped: true,
                modules: deps.len(),
            });
        }

        let stale_outputs = [
            output.clone(),
            stamp_path(&output),
            self.layout.output_sources(&plan.project.name, variant),
        ];
        for stale in stale_outputs {
            if stale.exists() {
                tokio::fs::remove_file(&stale).await.at(&stale)?;
            }
        }

        // Main archive.
        self.reporter.stage(variant, "Extracting main archive");
        let merged_dir = self.layout.merged_dir(variant);
        {
            let (archive, dest) = (main_archive.clone(), merged_dir.clone());
            let extracted = blocking(move || extract_main(&archive, &dest)).await?;
            debug!("Main archive: {} files", extracted.files);
        }

        // Dependencies, concurrently.
        self.reporter
            .stage(variant, &format!("Extracting {} dependencies", deps.len()));
        let extracted = self.extract_all(variant, &deps, Remapper::new(&namespace)).await?;

        // Folds, strictly in traversal order.
        self.reporter.stage(variant, "Merging dependencies");
        {
            let merged_dir = merged_dir.clone();
            let reporter = Arc::clone(&self.reporter);
            let variant = variant.clone();
            blocking(move || {
                let mut processed = 0;
                for (module, dir) in extracted {
                    let files = merge_dependency(&merged_dir, &dir, &module.owner(), module.as_str())?;
                    reporter.folded(&variant, &module, files);
                    processed += files;
                }
                finalize_layout(&merged_dir, processed)
            })
            .await?;
        }

        self.reporter.stage(variant, "Bundling");
        {
            let (merged_dir, output) = (merged_dir.clone(), output.clone());
            blocking(move || bundle(&merged_dir, &output)).await?;
        }

        if has_sources {
            self.merge_sources_of(variant, main_sources, &deps).await?;
        }

        fingerprint.write_stamp(&output)?;
        self.reporter.variant_done(variant, &output, false);
        Ok(VariantOutput {
            variant: variant.clone(),
            archive: output,
            sources,
            skipped: false,
            modules: deps.len(),
        })
    }

    /// Merge only the sources jars of `variant` into
    /// `<build>/outputs/umbrella/<project>-<variant>-sources.jar`.
    /// Returns `None` when no merged module publishes sources.
    pub async fn run_sources(&self, variant: &Variant) -> Result<Option<(PathBuf, SourcesSummary)>> {
        let root = self.plan.root_module()?;
        let main_sources = root.produces_sources_archive(variant).to_vec();
        let deps = self.dependency_archives(variant);
        if main_sources.is_empty() && deps.iter().all(|d| d.sources.is_empty()) {
            return Ok(None);
        }
        let summary = self.merge_sources_of(variant, main_sources, &deps).await?;
        Ok(Some((self.layout.output_sources(&self.plan.project.name, variant), summary)))
    }

    async fn merge_sources_of(
        &self,
        variant: &Variant,
        main_sources: Vec<PathBuf>,
        deps: &[DependencyArchive],
    ) -> Result<SourcesSummary> {
        self.reporter.stage(variant, "Merging sources");
        let dep_sources: Vec<PathBuf> = deps.iter().flat_map(|d| d.sources.clone()).collect();
        let out = self.layout.output_sources(&self.plan.project.name, variant);
        blocking(move || {
            let main: Vec<&Path> = main_sources.iter().map(PathBuf::as_path).collect();
            let deps: Vec<&Path> = dep_sources.iter().map(PathBuf::as_path).collect();
            merge_sources(&main, &deps, &out)
        })
        .await
    }

    /// Extract every dependency archive in parallel, returning the extracted
    /// folders in traversal order.
    async fn extract_all(
        &self,
        variant: &Variant,
        deps: &[DependencyArchive],
        remapper: Remapper,
    ) -> Result<Vec<(ModuleName, PathBuf)>> {
        let deps_dir = self.layout.dependencies_dir(variant);
        if deps_dir.exists() {
            tokio::fs::remove_dir_all(&deps_dir).await.at(&deps_dir)?;
        }
        tokio::fs::create_dir_all(&deps_dir).await.at(&deps_dir)?;

        let remapper = Arc::new(remapper);
        let mut set: JoinSet<Result<(usize, ModuleName, Option<Extracted>)>> = JoinSet::new();
        for (idx, dep) in deps.iter().enumerate() {
            let remapper = Arc::clone(&remapper);
            let dest = deps_dir.join(dep.module.owner());
            let dep = dep.clone();
            set.spawn_blocking(move || {
                let extracted = extract_dependency(&dep.archive, &dest, &remapper)?;
                Ok((idx, dep.module, extracted))
            });
        }

        let mut done = Vec::with_capacity(deps.len());
        while let Some(joined) = set.join_next().await {
            // Returning drops the set, which aborts the remaining tasks.
            let (idx, module, extracted) = joined.map_err(|e| UmbrellaError::Join(e.to_string()))??;
            match extracted {
                Some(ex) => {
                    debug!(
                        "Extracted '{}': {} files, {} classes remapped",
                        module, ex.files, ex.remapped
                    );
                    self.reporter.extracted(variant, &module, ex.files);
                    done.push((idx, module, ex.kind, ex.dir));
                }
                None => debug!("Nothing extracted for '{}'", module),
            }
        }
        let aars = done.iter().filter(|(_, _, kind, _)| *kind == ArchiveKind::Aar).count();
        let jars = done.len() - aars;
        info!("Extracted {} AARs and {} JARs for variant '{}'", aars, jars, variant);
        self.reporter
            .info(&format!("[{variant}] extracted {aars} AARs and {jars} JARs"));

        done.sort_by_key(|(idx, _, _, _)| *idx);
        Ok(done.into_iter().map(|(_, m, _, dir)| (m, dir)).collect())
    }
}

/// Merge one variant of `plan` with a fresh pipeline.
pub async fn run_variant(
    plan: Arc<Plan>,
    layout: BuildLayout,
    variant: &Variant,
    reporter: Arc<dyn Reporter>,
    force: bool,
) -> Result<VariantOutput> {
    MergePipeline::new(plan, layout, reporter)
        .force(force)
        .run_variant(variant)
        .await
}
