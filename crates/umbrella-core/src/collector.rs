//! External dependency collection for publication metadata.
//!
//! Declarations are folded into a [`DependencyCollector`] with two priority
//! tiers, drained once into a sorted snapshot, then optionally substituted
//! with platform artifacts for cross-ecosystem groups.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info, warn};
use umbrella_schema::{
    Coordinate, DEFAULT_SCOPE, Declared, DependencyKey, Tier, Variant, is_excluded, parse_coordinates,
    render_coordinates,
};

use crate::error::{IoContext, Result, UmbrellaError};
use crate::plan::Plan;

/// Groups whose artifacts are substituted with their platform equivalent.
const MAPPED_GROUPS: [&str; 2] = ["org.jetbrains.compose.", "org.jetbrains.androidx."];
/// Groups whose resolved artifacts can stand in for a mapped one.
const PLATFORM_GROUPS: [&str; 2] = ["androidx.", "org.jetbrains.androidx."];
const PLATFORM_SUFFIXES: [&str; 3] = ["-android", "-jvm", "-java8"];
const COMPOSE_PREFIX: &str = "compose-";

fn version_conflict(key: &DependencyKey, existing: &str, new: &str) -> UmbrellaError {
    UmbrellaError::VersionConflict {
        key: key.to_string(),
        existing: existing.to_string(),
        new: new.to_string(),
    }
}

/// Accumulates declarations per tier, keyed by `group:name`.
#[derive(Debug, Clone, Default)]
pub struct DependencyCollector {
    platform: BTreeMap<DependencyKey, Declared>,
    common: BTreeMap<DependencyKey, Declared>,
}

/// Drained collector state: one declaration per key, platform tier applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub declared: Vec<Declared>,
    /// Common declarations hidden by a platform declaration of the same key.
    pub suppressed: usize,
}

impl DependencyCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one declaration.
    ///
    /// # Errors
    ///
    /// [`UmbrellaError::VersionConflict`] when the same key is already in
    /// `tier` with another version.
    pub fn add(&mut self, tier: Tier, dep: &Declared) -> Result<()> {
        let map = match tier {
            Tier::Platform => &mut self.platform,
            Tier::Common => &mut self.common,
        };
        let key = dep.key();
        match map.get(&key) {
            Some(existing) if existing.version != dep.version => {
                Err(version_conflict(&key, &existing.version, &dep.version))
            }
            Some(_) => Ok(()),
            None => {
                map.insert(key, dep.clone());
                Ok(())
            }
        }
    }

    /// Number of distinct keys across both tiers.
    pub fn len(&self) -> usize {
        self.platform.len() + self.common.keys().filter(|k| !self.platform.contains_key(*k)).count()
    }

    pub fn is_empty(&self) -> bool {
        self.platform.is_empty() && self.common.is_empty()
    }

    pub fn finish(self) -> Snapshot {
        let mut merged = self.platform;
        let mut suppressed = 0;
        for (key, dep) in self.common {
            if merged.contains_key(&key) {
                debug!("Platform declaration of {} wins over common {}", key, dep);
                suppressed += 1;
            } else {
                merged.insert(key, dep);
            }
        }
        let mut declared: Vec<Declared> = merged.into_values().collect();
        declared.sort_by(|a, b| (&a.group, &a.name).cmp(&(&b.group, &b.name)));
        Snapshot { declared, suppressed }
    }
}

/// Resolved platform artifacts indexed by the names a cross-ecosystem
/// artifact may be published under.
#[derive(Debug, Clone, Default)]
pub struct PlatformArtifacts {
    by_name: BTreeMap<String, Declared>,
}

/// Outcome of looking a declaration up in [`PlatformArtifacts`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Outside the mapped groups; kept as declared.
    Unchanged(Coordinate),
    Mapped(Coordinate),
    /// In a mapped group but without a platform equivalent.
    Unresolved(Coordinate),
}

impl Resolution {
    pub fn coordinate(&self) -> &Coordinate {
        match self {
            Self::Unchanged(c) | Self::Mapped(c) | Self::Unresolved(c) => c,
        }
    }
}

fn strip_platform_suffixes(name: &str) -> String {
    let mut clean = name;
    for suffix in PLATFORM_SUFFIXES {
        clean = clean.strip_suffix(suffix).unwrap_or(clean);
    }
    clean.to_string()
}

fn search_names(name: &str) -> Vec<String> {
    let mut names = vec![name.to_string()];
    names.extend(PLATFORM_SUFFIXES.iter().map(|s| format!("{name}{s}")));
    names.extend(
        PLATFORM_SUFFIXES
            .iter()
            .map(|s| name.strip_suffix(s).unwrap_or(name).to_string()),
    );
    names.push(format!("{COMPOSE_PREFIX}{name}"));
    names.push(format!("{COMPOSE_PREFIX}{name}-android"));
    names.push(format!("{COMPOSE_PREFIX}{name}-jvm"));
    names.push(name.strip_prefix(COMPOSE_PREFIX).unwrap_or(name).to_string());

    let mut seen = std::collections::HashSet::new();
    names.retain(|n| seen.insert(n.clone()));
    names
}

impl PlatformArtifacts {
    /// Index resolved artifacts from the platform groups; others are ignored.
    /// A later artifact replaces an earlier one under the same name.
    pub fn from_resolved<'a>(resolved: impl IntoIterator<Item = &'a Declared>) -> Self {
        let mut by_name = BTreeMap::new();
        for artifact in resolved {
            if !PLATFORM_GROUPS.iter().any(|g| artifact.group.starts_with(g)) {
                continue;
            }
            let name = artifact.name.as_str();
            by_name.insert(name.to_string(), artifact.clone());
            by_name.insert(
                name.strip_prefix(COMPOSE_PREFIX).unwrap_or(name).to_string(),
                artifact.clone(),
            );
            for suffix in PLATFORM_SUFFIXES {
                if let Some(stripped) = name.strip_suffix(suffix) {
                    by_name.insert(stripped.to_string(), artifact.clone());
                }
            }
        }
        Self { by_name }
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    pub fn resolve(&self, dep: &Declared) -> Resolution {
        if !MAPPED_GROUPS.iter().any(|g| dep.group.starts_with(g)) {
            return Resolution::Unchanged(dep.with_scope(DEFAULT_SCOPE));
        }
        let hit = search_names(&dep.name)
            .iter()
            .find_map(|n| self.by_name.get(n));
        match hit {
            Some(artifact) => {
                let clean = strip_platform_suffixes(&artifact.name);
                info!(
                    "Mapped {} -> {}:{}:{}",
                    dep, artifact.group, clean, artifact.version
                );
                Resolution::Mapped(Coordinate::new(&artifact.group, clean, &artifact.version, DEFAULT_SCOPE))
            }
            None => {
                warn!("No androidx equivalent for {}:{}", dep.group, dep.name);
                Resolution::Unresolved(dep.with_scope(DEFAULT_SCOPE))
            }
        }
    }
}

/// Counters reported by a collection run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollectionStats {
    /// Distinct keys declared across all modules.
    pub collected: usize,
    pub rules_applied: usize,
    /// Declarations dropped by an exclusion rule.
    pub excluded: usize,
    pub suppressed: usize,
    pub mapped: usize,
    /// Mappable declarations kept as declared.
    pub unresolved: usize,
}

/// Result of [`collect_external_dependencies`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    pub coordinates: Vec<Coordinate>,
    pub stats: CollectionStats,
}

/// Substitute platform artifacts and drain into sorted coordinates. Two
/// declarations that end up on the same key must agree on the version.
pub fn resolve_snapshot(snapshot: &Snapshot, artifacts: &PlatformArtifacts) -> Result<(Vec<Coordinate>, usize, usize)> {
    let mut out: BTreeMap<DependencyKey, Coordinate> = BTreeMap::new();
    let (mut mapped, mut unresolved) = (0, 0);
    for dep in &snapshot.declared {
        let resolution = artifacts.resolve(dep);
        match resolution {
            Resolution::Mapped(_) => mapped += 1,
            Resolution::Unresolved(_) => unresolved += 1,
            Resolution::Unchanged(_) => {}
        }
        let coordinate = resolution.coordinate().clone();
        let key = coordinate.key();
        match out.get(&key) {
            Some(existing) if existing.version != coordinate.version => {
                return Err(version_conflict(&key, &existing.version, &coordinate.version));
            }
            Some(_) => {}
            None => {
                out.insert(key, coordinate);
            }
        }
    }
    let mut coordinates: Vec<Coordinate> = out.into_values().collect();
    coordinates.sort();
    Ok((coordinates, mapped, unresolved))
}

/// Collect the external dependencies the umbrella archive publishes for
/// `variant`: every declaration on the export-relevant surfaces of the root
/// and every merged module, minus exclusions.
///
/// # Errors
///
/// [`UmbrellaError::VersionConflict`] when one tier declares a key with two
/// versions.
pub fn collect_external_dependencies(plan: &Plan, variant: &Variant) -> Result<Collection> {
    let rules = plan.exclusions();
    let mut modules = vec![plan.root().clone()];
    modules.extend(plan.merged_modules());

    let mut collector = DependencyCollector::new();
    let mut excluded = 0;
    for name in &modules {
        let Some(spec) = plan.module(name) else {
            continue;
        };
        for conf in spec
            .configurations
            .iter()
            .filter(|c| c.class.is_relevant_for(variant.as_str()))
        {
            for dep in &conf.dependencies {
                if is_excluded(rules, Some(&dep.group), Some(&dep.name)) {
                    debug!("Excluding {} declared on {}:{}", dep, name, conf.name);
                    excluded += 1;
                    continue;
                }
                collector.add(conf.class.tier, dep)?;
            }
        }
    }

    let collected = collector.len();
    if rules.is_empty() {
        info!("Collected {collected} dependencies");
    } else {
        info!("Collected {collected} dependencies ({} exclusion rules applied)", rules.len());
    }

    let snapshot = collector.finish();
    let artifacts = PlatformArtifacts::from_resolved(&plan.resolved);
    debug!("Found {} platform artifacts for mapping", artifacts.len());
    let (coordinates, mapped, unresolved) = resolve_snapshot(&snapshot, &artifacts)?;

    if unresolved > 0 {
        info!("Kept {unresolved} dependencies");
    }
    info!("POM will include {} dependencies", coordinates.len());

    Ok(Collection {
        coordinates,
        stats: CollectionStats {
            collected,
            rules_applied: rules.len(),
            excluded,
            suppressed: snapshot.suppressed,
            mapped,
            unresolved,
        },
    })
}

/// Write a coordinate file: first occurrence per key, sorted by group then
/// name, one record per line. An empty list still writes an empty file.
/// Returns the number of duplicate records removed.
pub fn write_dependency_file(path: &Path, records: &[Coordinate]) -> Result<usize> {
    let mut seen = std::collections::HashSet::new();
    let mut unique: Vec<Coordinate> = records
        .iter()
        .filter(|c| seen.insert(c.key()))
        .cloned()
        .collect();
    unique.sort_by(|a, b| (&a.group, &a.name).cmp(&(&b.group, &b.name)));

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::write(path, render_coordinates(&unique)).at(path)?;

    let duplicates = records.len() - unique.len();
    if unique.is_empty() {
        warn!("No external dependencies collected, wrote empty {}", path.display());
    } else if duplicates > 0 {
        info!(
            "Collected {} unique external dependencies (deduplicated {duplicates} duplicate entries)",
            unique.len()
        );
    } else {
        info!("Collected {} unique external dependencies", unique.len());
    }
    Ok(duplicates)
}

/// Read a coordinate file, silently dropping malformed records.
pub fn read_dependency_file(path: &Path) -> Result<Vec<Coordinate>> {
    let content = fs::read_to_string(path).at(path)?;
    Ok(parse_coordinates(&content))
}
