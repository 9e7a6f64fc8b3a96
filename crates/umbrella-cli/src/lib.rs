//! umbrella - merge a module graph into one publishable archive
#![allow(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::missing_panics_doc)]
//!
//! The binary is a thin adapter: it loads a merge plan (`umbrella.toml`),
//! wires a console reporter, and calls into `umbrella-core`.
//!
//! # Build Layout
//!
//! ```text
//! <build>/
//! ├── intermediates/umbrella/<variant>/
//! │   ├── dependencies/        # one folder per merged module
//! │   ├── merged/              # main archive with dependencies folded in
//! │   └── external-dependencies.txt
//! └── outputs/umbrella/
//!     ├── <project>-<variant>.aar
//!     └── <project>-<variant>-sources.jar
//! ```

pub mod cmd;
pub mod ui;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use umbrella_core::BUILD_DIR_ENV;

#[derive(Debug, Parser)]
#[command(name = "umbrella")]
#[command(author, version, about = "Merge a module graph into one publishable archive", long_about = None)]
pub struct Cli {
    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Merge every exported module into the root module's archive
    Merge {
        /// Merge plan file
        #[arg(long, default_value = "umbrella.toml")]
        plan: PathBuf,
        /// Variants to merge (defaults to the plan's variants)
        #[arg(long = "variant", short = 'v')]
        variants: Vec<String>,
        /// Build directory (defaults to <plan dir>/build)
        #[arg(long, env = BUILD_DIR_ENV)]
        build_dir: Option<PathBuf>,
        /// Rebuild even when inputs are unchanged
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Collect the external dependencies the merged archive publishes
    Collect {
        /// Merge plan file
        #[arg(long, default_value = "umbrella.toml")]
        plan: PathBuf,
        /// Variant to collect for
        #[arg(long, short = 'v')]
        variant: String,
        /// Coordinate file to write (defaults to the build layout's)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Build directory (defaults to <plan dir>/build)
        #[arg(long, env = BUILD_DIR_ENV)]
        build_dir: Option<PathBuf>,
    },
    /// Write collected dependencies into a POM
    Pom {
        /// Coordinate file written by `umbrella collect`
        #[arg(long)]
        dependencies: PathBuf,
        /// POM file to write
        #[arg(long, short = 'o')]
        output: PathBuf,
        /// Project coordinate (group:artifact:version) for a fresh POM
        #[arg(long, required_unless_present = "into")]
        coordinate: Option<String>,
        /// Existing POM to add the dependencies to
        #[arg(long)]
        into: Option<PathBuf>,
    },
    /// Merge the sources jars of every merged module
    Sources {
        /// Merge plan file
        #[arg(long, default_value = "umbrella.toml")]
        plan: PathBuf,
        /// Variant to merge sources for
        #[arg(long, short = 'v')]
        variant: String,
        /// Build directory (defaults to <plan dir>/build)
        #[arg(long, env = BUILD_DIR_ENV)]
        build_dir: Option<PathBuf>,
    },
    /// Show the modules that get merged, in fold order
    Graph {
        /// Merge plan file
        #[arg(long, default_value = "umbrella.toml")]
        plan: PathBuf,
        /// Variant whose archives to show
        #[arg(long, short = 'v')]
        variant: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Remap resource class references in one class file
    #[command(hide = true)]
    Remap {
        /// Class file to remap
        class: PathBuf,
        /// Target namespace (e.g. com.example.umbrella)
        #[arg(long)]
        namespace: String,
        /// Where to write the remapped class (defaults to in place)
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: clap_complete::Shell,
    },
}
