//! Input fingerprints for skipping unchanged variant runs.
//!
//! The stamp is a single line of hex next to the output archive
//! (`<output>.stamp`). A missing or unreadable stamp never skips.

use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;
use umbrella_schema::{ContentHash, ExclusionRule, Namespace};

use crate::error::{IoContext, Result};
use crate::paths::stamp_path;

/// SHA-256 over every input that can change a variant's output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint the module archives (in fold order, each with the module
    /// it came from), the sources jars, the namespace and the exclusion
    /// rules (order-insensitive). A missing sources jar hashes as absent.
    pub fn compute(
        archives: &[(&str, &Path)],
        sources: &[&Path],
        namespace: &Namespace,
        rules: &[ExclusionRule],
    ) -> Result<Self> {
        let mut hasher = Sha256::new();
        for (module, archive) in archives {
            let hash = ContentHash::compute_file(archive).at(archive)?;
            hasher.update(b"archive:");
            hasher.update(module.as_bytes());
            hasher.update(b":");
            hasher.update(hash.as_str().as_bytes());
            hasher.update(b"\n");
        }
        for jar in sources {
            hasher.update(b"sources:");
            if jar.exists() {
                let hash = ContentHash::compute_file(jar).at(jar)?;
                hasher.update(hash.as_str().as_bytes());
            } else {
                hasher.update(b"absent");
            }
            hasher.update(b"\n");
        }
        hasher.update(b"namespace:");
        hasher.update(namespace.as_str().as_bytes());
        hasher.update(b"\n");

        let mut rules: Vec<String> = rules.iter().map(ToString::to_string).collect();
        rules.sort();
        for rule in rules {
            hasher.update(b"exclude:");
            hasher.update(rule.as_bytes());
            hasher.update(b"\n");
        }
        Ok(Self(hex::encode(hasher.finalize())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether `output` exists and its stamp records this fingerprint.
    pub fn is_current(&self, output: &Path) -> bool {
        if !output.exists() {
            return false;
        }
        let stamp = stamp_path(output);
        match fs::read_to_string(&stamp) {
            Ok(stored) => stored.trim() == self.0,
            Err(_) => {
                debug!("No stamp at {}", stamp.display());
                false
            }
        }
    }

    /// Record this fingerprint next to `output`.
    pub fn write_stamp(&self, output: &Path) -> Result<()> {
        let stamp = stamp_path(output);
        fs::write(&stamp, format!("{}\n", self.0)).at(&stamp)
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
