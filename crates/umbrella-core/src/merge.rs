//! Folding extracted dependency trees into the main layout.
//!
//! Every file of a dependency tree goes through the first matching policy:
//!
//! | relative path             | policy                                   |
//! |---------------------------|------------------------------------------|
//! | `res/values*`             | copy as `<owner>-<name>.<ext>`           |
//! | `*.kotlin_module`         | copy as `<owner>-<name>.<ext>`           |
//! | `R.txt`                   | append non-blank lines                   |
//! | `*.pro`                   | append into `consumer-rules.pro`         |
//! | `AndroidManifest.xml`     | manifest fold                            |
//! | `proguard.txt`            | append                                   |
//! | anything else             | copy, duplicate destination is an error  |

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{IoContext, Result, UmbrellaError};
use crate::io::{CLASSES_DIR, CLASSES_JAR, pack_dir};
use crate::manifest::{MANIFEST_FILE, fold_manifest};

const R_TXT: &str = "R.txt";
const CONSUMER_RULES: &str = "consumer-rules.pro";
const PROGUARD_TXT: &str = "proguard.txt";

/// What happens to one dependency file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Copy under the owner-prefixed name, replacing an earlier copy.
    Rename(PathBuf),
    /// Append non-blank lines to the destination.
    Append(PathBuf),
    Manifest,
    /// Copy; the destination must not exist yet.
    Copy(PathBuf),
}

fn owner_prefixed(relative: &str, owner: &str) -> PathBuf {
    let rel = Path::new(relative);
    let stem = rel.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
    let name = match rel.extension() {
        Some(ext) => format!("{owner}-{stem}.{}", ext.to_string_lossy()),
        None => format!("{owner}-{stem}"),
    };
    rel.with_file_name(name)
}

/// Pick the policy for a forward-slash path relative to the dependency root.
pub fn policy_for(relative: &str, owner: &str) -> Policy {
    if relative.starts_with("res/values") || relative.ends_with(".kotlin_module") {
        Policy::Rename(owner_prefixed(relative, owner))
    } else if relative.ends_with(R_TXT) {
        Policy::Append(PathBuf::from(relative))
    } else if relative.ends_with(".pro") {
        Policy::Append(PathBuf::from(CONSUMER_RULES))
    } else if relative.ends_with(MANIFEST_FILE) {
        Policy::Manifest
    } else if relative.ends_with(PROGUARD_TXT) {
        Policy::Append(PathBuf::from(relative))
    } else {
        Policy::Copy(PathBuf::from(relative))
    }
}

/// Append the non-blank lines of `src` to `dest`, separated from existing
/// content by a newline. Empty sources leave `dest` untouched.
fn append_lines(src: &Path, dest: &Path) -> Result<()> {
    let text = fs::read_to_string(src).at(src)?;
    let content = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if content.is_empty() {
        return Ok(());
    }

    let has_content = fs::metadata(dest).map(|m| m.len() > 0).unwrap_or(false);
    if has_content {
        let mut file = OpenOptions::new().append(true).open(dest).at(dest)?;
        write!(file, "\n{content}").at(dest)?;
    } else {
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).at(parent)?;
        }
        fs::write(dest, content).at(dest)?;
    }
    Ok(())
}

fn copy_file(src: &Path, dest: &Path) -> Result<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::copy(src, dest).at(dest)?;
    Ok(())
}

/// Fold one extracted dependency tree into `main_dir`.
///
/// `owner` is the dependency's folder name and rename prefix; `module` names
/// it in errors. Returns the number of files processed.
///
/// # Errors
///
/// [`UmbrellaError::DuplicateResource`] when a non-mergeable file already
/// exists in the main layout, [`UmbrellaError::ManifestMerge`] when the
/// manifests cannot be merged.
pub fn merge_dependency(main_dir: &Path, dep_dir: &Path, owner: &str, module: &str) -> Result<usize> {
    let manifest = main_dir.join(MANIFEST_FILE);
    let mut processed = 0;

    for entry in WalkDir::new(dep_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| UmbrellaError::io(dep_dir, io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let src = entry.path();
        let relative = src
            .strip_prefix(dep_dir)
            .map_err(|e| UmbrellaError::io(src, io::Error::other(e)))?
            .to_string_lossy()
            .replace('\\', "/");

        match policy_for(&relative, owner) {
            Policy::Rename(target) => copy_file(src, &main_dir.join(target))?,
            Policy::Append(target) => append_lines(src, &main_dir.join(target))?,
            Policy::Manifest => {
                fold_manifest(&manifest, src, module)?;
            }
            Policy::Copy(target) => {
                let dest = main_dir.join(target);
                if dest.exists() {
                    return Err(UmbrellaError::DuplicateResource {
                        path: relative,
                        module: module.to_string(),
                    });
                }
                copy_file(src, &dest)?;
            }
        }
        processed += 1;
    }

    debug!("Folded {} files from '{}'", processed, module);
    Ok(processed)
}

fn ensure_trailing_newline(path: &Path) -> Result<()> {
    let Ok(data) = fs::read(path) else {
        return Ok(());
    };
    if data.last().is_some_and(|b| *b != b'\n') {
        let mut file = OpenOptions::new().append(true).open(path).at(path)?;
        file.write_all(b"\n").at(path)?;
    }
    Ok(())
}

/// Finish the main layout after every fold: appended text files end with a
/// newline and `classes/` is packed back into `classes.jar`.
pub fn finalize_layout(main_dir: &Path, processed: usize) -> Result<()> {
    ensure_trailing_newline(&main_dir.join(R_TXT))?;
    ensure_trailing_newline(&main_dir.join(CONSUMER_RULES))?;
    for entry in WalkDir::new(main_dir).sort_by_file_name() {
        let entry = entry.map_err(|e| UmbrellaError::io(main_dir, io::Error::other(e)))?;
        if entry.file_type().is_file() && entry.file_name() == PROGUARD_TXT {
            ensure_trailing_newline(entry.path())?;
        }
    }

    let classes = main_dir.join(CLASSES_DIR);
    pack_dir(&classes, &main_dir.join(CLASSES_JAR))?;
    if classes.exists() {
        fs::remove_dir_all(&classes).at(&classes)?;
    }

    info!("Merged dependencies into main archive (processed {processed} files)");
    Ok(())
}
