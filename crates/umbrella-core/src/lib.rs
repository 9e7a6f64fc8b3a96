//! umbrella core library.
//!
//! Walks the exported module graph of a merge plan, folds every module's
//! archive into the root module's archive (remapping generated resource
//! class references on the way), and collects the external dependencies the
//! merged archive publishes.

pub mod bundle;
pub mod collector;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod io;
pub mod manifest;
pub mod merge;
pub mod paths;
pub mod pipeline;
pub mod plan;
pub mod pom;
pub mod remap;
pub mod sources;

pub mod reporter;

pub use error::{ErrorKind, Result, UmbrellaError};
pub use paths::*;
pub use pipeline::{MergePipeline, VariantOutput, run_variant};
pub use plan::{ArchiveSource, Plan};
pub use reporter::{NullReporter, Reporter};

/// Version string reported by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
