//! Zip container reading and deterministic writing.

use crate::error::{IoContext, Result, UmbrellaError};
use std::fs::{self, File};
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

/// One file stored in a container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEntry {
    /// Forward-slash relative path inside the container.
    pub path: String,
    pub data: Vec<u8>,
}

impl ContainerEntry {
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: normalize_path(&path.into()),
            data,
        }
    }
}

/// Information about an unpacked file
#[derive(Debug, Clone)]
pub struct UnpackedFile {
    /// Forward-slash path relative to the unpack root
    pub relative_path: String,
    /// Absolute path on disk
    pub absolute_path: PathBuf,
}

/// Convert a platform path to the container's forward-slash form.
pub fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Options for every written entry: fixed timestamp and permissions so that
/// unchanged inputs give byte-identical containers.
fn entry_options() -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default())
        .unix_permissions(0o644)
}

fn open_archive<R: Read + Seek>(reader: R, label: &Path) -> Result<ZipArchive<R>> {
    ZipArchive::new(reader).map_err(|e| UmbrellaError::MalformedArchive {
        path: label.to_path_buf(),
        reason: e.to_string(),
    })
}

fn read_entries<R: Read + Seek>(mut archive: ZipArchive<R>, label: &Path) -> Result<Vec<ContainerEntry>> {
    let mut entries = Vec::with_capacity(archive.len());
    for i in 0..archive.len() {
        let mut file = archive.by_index(i).map_err(|e| UmbrellaError::MalformedArchive {
            path: label.to_path_buf(),
            reason: e.to_string(),
        })?;
        if file.is_dir() {
            continue;
        }
        let mut data = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut data)
            .map_err(|e| UmbrellaError::MalformedArchive {
                path: label.to_path_buf(),
                reason: format!("{}: {e}", file.name()),
            })?;
        entries.push(ContainerEntry::new(file.name(), data));
    }
    Ok(entries)
}

/// Read every file entry of a container, in archive order.
pub fn read_container(path: &Path) -> Result<Vec<ContainerEntry>> {
    let file = File::open(path).at(path)?;
    read_entries(open_archive(file, path)?, path)
}

/// Read a container held in memory (e.g. a nested `classes.jar`); `label`
/// names it in errors.
pub fn read_container_bytes(bytes: &[u8], label: &Path) -> Result<Vec<ContainerEntry>> {
    read_entries(open_archive(Cursor::new(bytes), label)?, label)
}

fn write_entries<W: Write + Seek>(writer: W, mut entries: Vec<ContainerEntry>, label: &Path) -> Result<W> {
    entries.sort_by(|a, b| a.path.cmp(&b.path));
    entries.dedup_by(|next, prev| next.path == prev.path);

    let mut zip = ZipWriter::new(writer);
    let options = entry_options();
    for entry in &entries {
        zip.start_file(entry.path.as_str(), options)
            .map_err(|e| UmbrellaError::zip(label, e))?;
        zip.write_all(&entry.data).at(label)?;
    }
    zip.finish().map_err(|e| UmbrellaError::zip(label, e))
}

/// Write a container deterministically: entries sorted by path, duplicate
/// paths keep their first occurrence, fixed timestamps and permissions.
///
/// The file is written to a temporary sibling and renamed into place, so a
/// failed write never leaves a partial container behind.
pub fn write_container(path: &Path, entries: Vec<ContainerEntry>) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).at(parent)?;

    let tmp = tempfile::NamedTempFile::new_in(parent).at(parent)?;
    let file = write_entries(tmp, entries, path)?;
    file.persist(path).map_err(|e| UmbrellaError::io(path, e.error))?;
    Ok(())
}

/// Deterministically write a container into memory.
pub fn write_container_bytes(entries: Vec<ContainerEntry>, label: &Path) -> Result<Vec<u8>> {
    let cursor = write_entries(Cursor::new(Vec::new()), entries, label)?;
    Ok(cursor.into_inner())
}

/// Collect every file under `dir` as container entries with forward-slash
/// relative paths.
pub fn collect_dir(dir: &Path) -> Result<Vec<ContainerEntry>> {
    let mut entries = Vec::new();
    if !dir.exists() {
        return Ok(entries);
    }
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.map_err(|e| UmbrellaError::io(dir, io::Error::other(e)))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(dir)
            .map_err(|e| UmbrellaError::io(entry.path(), io::Error::other(e)))?;
        let data = fs::read(entry.path()).at(entry.path())?;
        entries.push(ContainerEntry::new(rel.to_string_lossy(), data));
    }
    Ok(entries)
}

/// Pack a directory tree into a container. Returns the number of entries.
pub fn pack_dir(dir: &Path, out: &Path) -> Result<usize> {
    let entries = collect_dir(dir)?;
    let count = entries.len();
    write_container(out, entries)?;
    debug!("Packed {} entries from {} into {}", count, dir.display(), out.display());
    Ok(count)
}

/// Write one entry under `dest`, refusing paths that escape it.
pub fn write_entry(dest: &Path, relative: &str, data: &[u8]) -> Result<PathBuf> {
    let rel = Path::new(relative);
    let escapes = rel.components().any(|c| {
        !matches!(c, std::path::Component::Normal(_) | std::path::Component::CurDir)
    });
    if escapes {
        return Err(UmbrellaError::MalformedArchive {
            path: dest.to_path_buf(),
            reason: format!("Invalid path in archive: {relative}"),
        });
    }
    let absolute = dest.join(rel);
    if let Some(parent) = absolute.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::write(&absolute, data).at(&absolute)?;
    Ok(absolute)
}

/// Unpack the file entries of a container accepted by `keep` into `dest`.
pub fn unpack_to(
    archive: &Path,
    dest: &Path,
    mut keep: impl FnMut(&str) -> bool,
) -> Result<Vec<UnpackedFile>> {
    fs::create_dir_all(dest).at(dest)?;
    let mut unpacked = Vec::new();
    for entry in read_container(archive)? {
        if !keep(&entry.path) {
            continue;
        }
        let absolute_path = write_entry(dest, &entry.path, &entry.data)?;
        unpacked.push(UnpackedFile {
            relative_path: entry.path,
            absolute_path,
        });
    }
    Ok(unpacked)
}
