//! Terminal output: progress reporting and tables.

pub mod reporter;
pub mod table;

pub use reporter::ConsoleReporter;
