//! Console progress reporter.
//!
//! Progress goes to stderr so stdout stays parseable (output paths only).
//! Lines are written whole, so concurrent variants interleave by line.

use std::io::Write;
use std::path::Path;

use umbrella_core::Reporter;
use umbrella_schema::{ModuleName, Variant};

/// Writes pipeline progress to stderr, one line per event.
#[derive(Debug, Default)]
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }

    fn line(&self, text: &str) {
        if self.quiet {
            return;
        }
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "{text}");
    }
}

impl Reporter for ConsoleReporter {
    fn stage(&self, variant: &Variant, title: &str) {
        self.line(&format!("[{variant}] {title}..."));
    }

    fn extracted(&self, variant: &Variant, module: &ModuleName, entries: usize) {
        self.line(&format!("[{variant}]   extracted {module} ({entries} files)"));
    }

    fn folded(&self, variant: &Variant, module: &ModuleName, files: usize) {
        self.line(&format!("[{variant}]   merged {module} ({files} files)"));
    }

    fn variant_done(&self, variant: &Variant, output: &Path, skipped: bool) {
        let name = output.file_name().map_or_else(|| output.display().to_string(), |n| n.to_string_lossy().into_owned());
        if skipped {
            self.line(&format!("[{variant}] {name} is up to date"));
        } else {
            self.line(&format!("[{variant}] Created {name}"));
        }
    }

    fn variant_failed(&self, variant: &Variant, reason: &str) {
        // Failures are shown even when quiet.
        let mut err = std::io::stderr().lock();
        let _ = writeln!(err, "[{variant}] failed: {reason}");
    }

    fn info(&self, msg: &str) {
        self.line(msg);
    }

    fn warning(&self, msg: &str) {
        self.line(&format!("warning: {msg}"));
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        let noun = if count == 1 { "variant" } else { "variants" };
        self.line(&format!("{count} {noun} {action} in {elapsed_secs:.1}s"));
    }
}
