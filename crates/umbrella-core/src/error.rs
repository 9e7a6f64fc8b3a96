//! Error taxonomy for the merge pipeline and the dependency collector.

use std::path::PathBuf;
use thiserror::Error;

/// Broad class of an [`UmbrellaError`], used by callers to decide how to
/// surface a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Duplicate non-mergeable resource or manifest merge failure.
    StructuralConflict,
    /// Same dependency key declared with different versions in one tier.
    VersionConflict,
    /// An input archive, class file or plan that cannot be understood.
    MalformedInput,
    /// Filesystem or archive I/O failure.
    Io,
}

#[derive(Error, Debug)]
pub enum UmbrellaError {
    #[error("Resource duplicate: {path} (from module '{module}')")]
    DuplicateResource { path: String, module: String },

    #[error("Failed to merge manifest of module '{module}': {reason}")]
    ManifestMerge { module: String, reason: String },

    #[error(
        "Version conflict for {key} existing={existing} vs new={new}. Make sure all configs use the same version"
    )]
    VersionConflict {
        key: String,
        existing: String,
        new: String,
    },

    #[error("Malformed archive {}: {reason}", path.display())]
    MalformedArchive { path: PathBuf, reason: String },

    #[error("Malformed class file {entry}: {reason}")]
    MalformedClass { entry: String, reason: String },

    #[error(
        "External dependencies file not found: {}. Make sure to run 'umbrella collect' first",
        path.display()
    )]
    MissingDependencyFile { path: PathBuf },

    #[error("Invalid POM {}: {reason}", path.display())]
    Pom { path: PathBuf, reason: String },

    #[error("Invalid plan: {0}")]
    Plan(String),

    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Archive error in {}: {source}", path.display())]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("XML error in {context}: {source}")]
    Xml {
        context: String,
        #[source]
        source: quick_xml::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Task failed: {0}")]
    Join(String),
}

impl UmbrellaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DuplicateResource { .. } | Self::ManifestMerge { .. } => {
                ErrorKind::StructuralConflict
            }
            Self::VersionConflict { .. } => ErrorKind::VersionConflict,
            Self::MalformedArchive { .. }
            | Self::MalformedClass { .. }
            | Self::Plan(_)
            | Self::MissingDependencyFile { .. }
            | Self::Pom { .. }
            | Self::Xml { .. }
            | Self::Toml { .. } => ErrorKind::MalformedInput,
            Self::Io { .. } | Self::Zip { .. } | Self::Join(_) => ErrorKind::Io,
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        Self::Zip {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = UmbrellaError> = std::result::Result<T, E>;

/// Attach a path to a bare `std::io::Result`.
pub(crate) trait IoContext<T> {
    fn at(self, path: &std::path::Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn at(self, path: &std::path::Path) -> Result<T> {
        self.map_err(|e| UmbrellaError::io(path, e))
    }
}
