//! Reporter trait for dependency injection
//!
//! Core merge logic reports progress through this trait so that it is not
//! coupled to any particular terminal output.

use std::path::Path;
use umbrella_schema::{ModuleName, Variant};

pub trait Reporter: Send + Sync {
    /// A pipeline stage has started (e.g. "Extracting dependencies").
    fn stage(&self, variant: &Variant, title: &str);

    /// A dependency module has been extracted into the working layout.
    fn extracted(&self, variant: &Variant, module: &ModuleName, entries: usize);

    /// A dependency module has been folded into the main layout.
    fn folded(&self, variant: &Variant, module: &ModuleName, files: usize);

    /// A variant finished and produced `output`.
    fn variant_done(&self, variant: &Variant, output: &Path, skipped: bool);

    /// A variant failed with `reason`.
    fn variant_failed(&self, variant: &Variant, reason: &str);

    /// Log an informational message.
    fn info(&self, msg: &str);

    /// Log a warning message.
    fn warning(&self, msg: &str);

    /// Display a final summary of multiple variants.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn stage(&self, variant: &Variant, title: &str) {
        (**self).stage(variant, title)
    }
    fn extracted(&self, variant: &Variant, module: &ModuleName, entries: usize) {
        (**self).extracted(variant, module, entries)
    }
    fn folded(&self, variant: &Variant, module: &ModuleName, files: usize) {
        (**self).folded(variant, module, files)
    }
    fn variant_done(&self, variant: &Variant, output: &Path, skipped: bool) {
        (**self).variant_done(variant, output, skipped)
    }
    fn variant_failed(&self, variant: &Variant, reason: &str) {
        (**self).variant_failed(variant, reason)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs)
    }
}

/// A no-op reporter for silent operations (e.g., testing).
#[derive(Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn stage(&self, _: &Variant, _: &str) {}
    fn extracted(&self, _: &Variant, _: &ModuleName, _: usize) {}
    fn folded(&self, _: &Variant, _: &ModuleName, _: usize) {}
    fn variant_done(&self, _: &Variant, _: &Path, _: bool) {}
    fn variant_failed(&self, _: &Variant, _: &str) {}
    fn info(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
