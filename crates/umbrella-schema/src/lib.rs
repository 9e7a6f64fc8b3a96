//! Shared value types for umbrella.
//!
//! Everything the merge pipeline and the external-dependency collector pass
//! between each other lives here: module identities, namespaces, exclusion
//! rules, configuration classifications and the `group:name:version:scope`
//! coordinate format.

/// Dependency declaration classification.
pub mod classification;
/// Maven-style coordinates.
pub mod coordinate;
/// Exclusion rules.
pub mod exclusion;
/// Content hashing.
pub mod hash;
/// Core identity types.
pub mod types;

// Re-exports
pub use classification::*;
pub use coordinate::*;
pub use exclusion::*;
pub use hash::*;
pub use types::*;

/// Scope written for every collected external dependency.
pub const DEFAULT_SCOPE: &str = "compile";

/// Internal-name prefixes that are never remapped (platform and framework code).
pub const RESERVED_NAMESPACES: [&str; 3] = ["android/", "androidx/", "com/google/android/material/"];
