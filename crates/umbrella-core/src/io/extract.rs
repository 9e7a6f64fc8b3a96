//! Archive extraction into the per-variant working layout.
//!
//! Handles the main archive (full layout kept, compiled code expanded under
//! `classes/`) and dependency archives (AAR or plain JAR, compiled code
//! remapped into the main namespace).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use super::container::{read_container, read_container_bytes, write_entry};
use crate::error::{IoContext, Result, UmbrellaError};
use crate::remap::Remapper;

/// Compiled-code container inside an AAR.
pub const CLASSES_JAR: &str = "classes.jar";
/// Folder the compiled-code container is expanded into.
pub const CLASSES_DIR: &str = "classes";
const AAR_METADATA: &str = "aar-metadata.properties";
const JAR_MANIFEST: &str = "META-INF/MANIFEST.MF";

/// Kind of archive a module produced, detected from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Aar,
    Jar,
}

impl ArchiveKind {
    pub fn detect(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_string_lossy().to_lowercase();
        match ext.as_str() {
            "aar" => Some(Self::Aar),
            "jar" => Some(Self::Jar),
            _ => None,
        }
    }
}

/// Result of extracting one archive.
#[derive(Debug, Clone)]
pub struct Extracted {
    pub kind: ArchiveKind,
    /// Root folder the archive was extracted into.
    pub dir: PathBuf,
    /// Number of files written, counting expanded class files.
    pub files: usize,
    /// Number of class files changed by remapping.
    pub remapped: usize,
}

fn reset_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        fs::remove_dir_all(dir).at(dir)?;
    }
    fs::create_dir_all(dir).at(dir)
}

fn missing_classes(archive: &Path) -> UmbrellaError {
    UmbrellaError::MalformedArchive {
        path: archive.to_path_buf(),
        reason: format!("missing {CLASSES_JAR}"),
    }
}

/// Expand a compiled-code container into `dest`, remapping class records
/// when a remapper is given.
fn expand_classes(
    archive: &Path,
    jar: &[u8],
    dest: &Path,
    remapper: Option<&Remapper>,
    skip: impl Fn(&str) -> bool,
) -> Result<(usize, usize)> {
    let label = archive.join(CLASSES_JAR);
    let entries = read_container_bytes(jar, &label)?;
    let mut written = 0;
    let mut remapped = 0;
    for entry in entries {
        if skip(&entry.path) {
            continue;
        }
        let data = match remapper {
            Some(r) if entry.path.ends_with(".class") => {
                let out = r.remap(&entry.path, &entry.data)?;
                if matches!(out, std::borrow::Cow::Owned(_)) {
                    remapped += 1;
                }
                out.into_owned()
            }
            _ => entry.data,
        };
        write_entry(dest, &entry.path, &data)?;
        written += 1;
    }
    Ok((written, remapped))
}

/// Extract the main archive into `dest`, replacing its previous content.
///
/// Every entry is kept as is, except `classes.jar` which is expanded under
/// `classes/` without remapping.
pub fn extract_main(archive: &Path, dest: &Path) -> Result<Extracted> {
    debug!("Extracting main archive: {}", archive.display());
    reset_dir(dest)?;
    let kind = ArchiveKind::detect(archive).unwrap_or(ArchiveKind::Aar);
    let entries = read_container(archive)?;

    let mut files = 0;
    let mut saw_classes = false;
    for entry in entries {
        if entry.path == CLASSES_JAR {
            let (n, _) = expand_classes(archive, &entry.data, &dest.join(CLASSES_DIR), None, |_| false)?;
            files += n;
            saw_classes = true;
            continue;
        }
        write_entry(dest, &entry.path, &entry.data)?;
        files += 1;
    }
    if kind == ArchiveKind::Aar && !saw_classes {
        return Err(missing_classes(archive));
    }

    Ok(Extracted {
        kind,
        dir: dest.to_path_buf(),
        files,
        remapped: 0,
    })
}

/// Extract one dependency archive into `dest` (the dependency's owner
/// folder), remapping generated resource references in its compiled code.
///
/// AARs keep their resource tree and manifest but drop
/// `aar-metadata.properties` (the main archive's copy wins); their
/// `classes.jar` is expanded under `classes/`. Plain JARs contribute only
/// compiled code, minus `META-INF/MANIFEST.MF`. Other files are ignored.
pub fn extract_dependency(archive: &Path, dest: &Path, remapper: &Remapper) -> Result<Option<Extracted>> {
    let Some(kind) = ArchiveKind::detect(archive) else {
        debug!("Ignoring non-JAR/AAR file: {}", archive.display());
        return Ok(None);
    };
    reset_dir(dest)?;
    let classes_dir = dest.join(CLASSES_DIR);

    let (files, remapped) = match kind {
        ArchiveKind::Aar => {
            debug!("Extracting AAR: {}", archive.display());
            let mut files = 0;
            let mut remapped = 0;
            let mut saw_classes = false;
            for entry in read_container(archive)? {
                if entry.path == CLASSES_JAR {
                    let (n, r) = expand_classes(archive, &entry.data, &classes_dir, Some(remapper), |_| false)?;
                    files += n;
                    remapped += r;
                    saw_classes = true;
                } else if !entry.path.ends_with(AAR_METADATA) && !entry.path.ends_with(CLASSES_JAR) {
                    write_entry(dest, &entry.path, &entry.data)?;
                    files += 1;
                }
            }
            if !saw_classes {
                return Err(missing_classes(archive));
            }
            (files, remapped)
        }
        ArchiveKind::Jar => {
            debug!("Extracting JAR: {}", archive.display());
            let jar = fs::read(archive).at(archive)?;
            expand_classes(archive, &jar, &classes_dir, Some(remapper), |p| p.ends_with(JAR_MANIFEST))?
        }
    };

    Ok(Some(Extracted {
        kind,
        dir: dest.to_path_buf(),
        files,
        remapped,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::container::{ContainerEntry, write_container, write_container_bytes};
    use umbrella_schema::Namespace;

    fn jar(entries: Vec<ContainerEntry>) -> Vec<u8> {
        write_container_bytes(entries, Path::new("classes.jar")).unwrap()
    }

    fn aar(path: &Path, with_classes: bool) {
        let mut entries = vec![
            ContainerEntry::new("AndroidManifest.xml", b"<manifest/>".to_vec()),
            ContainerEntry::new("res/values/values.xml", b"<resources/>".to_vec()),
            ContainerEntry::new("META-INF/com/android/build/gradle/aar-metadata.properties", b"x=1".to_vec()),
            ContainerEntry::new("R.txt", b"int id a 0x1".to_vec()),
        ];
        if with_classes {
            entries.push(ContainerEntry::new(
                CLASSES_JAR,
                jar(vec![ContainerEntry::new("com/dep/Foo.class", b"no refs".to_vec())]),
            ));
        }
        write_container(path, entries).unwrap();
    }

    #[test]
    fn main_archive_keeps_layout_and_expands_classes() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("main.aar");
        aar(&archive, true);
        let dest = dir.path().join("merged");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("stale.txt"), b"old").unwrap();

        let extracted = extract_main(&archive, &dest).unwrap();
        assert_eq!(extracted.kind, ArchiveKind::Aar);
        assert!(dest.join("AndroidManifest.xml").exists());
        assert!(dest.join("classes/com/dep/Foo.class").exists());
        assert!(!dest.join(CLASSES_JAR).exists());
        assert!(!dest.join("stale.txt").exists());
        // Main keeps its metadata.
        assert!(dest.join("META-INF/com/android/build/gradle/aar-metadata.properties").exists());
    }

    #[test]
    fn dependency_aar_drops_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("dep.aar");
        aar(&archive, true);
        let dest = dir.path().join("deps/feature_login");
        let remapper = Remapper::new(&Namespace::new("com.main"));

        let extracted = extract_dependency(&archive, &dest, &remapper).unwrap().unwrap();
        assert_eq!(extracted.files, 4);
        assert!(dest.join("R.txt").exists());
        assert!(dest.join("classes/com/dep/Foo.class").exists());
        assert!(!dest.join("META-INF/com/android/build/gradle/aar-metadata.properties").exists());
    }

    #[test]
    fn aar_without_classes_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("dep.aar");
        aar(&archive, false);
        let remapper = Remapper::new(&Namespace::new("com.main"));
        let err = extract_dependency(&archive, &dir.path().join("d"), &remapper).unwrap_err();
        assert!(matches!(err, UmbrellaError::MalformedArchive { .. }));
        assert!(extract_main(&archive, &dir.path().join("m")).is_err());
    }

    #[test]
    fn plain_jar_goes_under_classes_without_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("lib.jar");
        fs::write(
            &archive,
            jar(vec![
                ContainerEntry::new("META-INF/MANIFEST.MF", b"Manifest-Version: 1.0".to_vec()),
                ContainerEntry::new("com/lib/Util.class", b"bytes".to_vec()),
            ]),
        )
        .unwrap();
        let remapper = Remapper::new(&Namespace::new("com.main"));
        let dest = dir.path().join("lib");
        let extracted = extract_dependency(&archive, &dest, &remapper).unwrap().unwrap();
        assert_eq!(extracted.kind, ArchiveKind::Jar);
        assert_eq!(extracted.files, 1);
        assert!(dest.join("classes/com/lib/Util.class").exists());
        assert!(!dest.join("classes/META-INF/MANIFEST.MF").exists());
    }

    #[test]
    fn unknown_extension_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("notes.txt");
        fs::write(&archive, b"hello").unwrap();
        let remapper = Remapper::new(&Namespace::new("com.main"));
        assert!(extract_dependency(&archive, &dir.path().join("x"), &remapper).unwrap().is_none());
    }

    #[test]
    fn unreadable_class_record_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("bad.jar");
        fs::write(
            &archive,
            jar(vec![ContainerEntry::new("com/dep/Bad.class", b"oops /R$ oops".to_vec())]),
        )
        .unwrap();
        let remapper = Remapper::new(&Namespace::new("com.main"));
        let err = extract_dependency(&archive, &dir.path().join("x"), &remapper).unwrap_err();
        assert!(matches!(err, UmbrellaError::MalformedClass { .. }));
        assert!(err.to_string().contains("com/dep/Bad.class"));
    }
}
