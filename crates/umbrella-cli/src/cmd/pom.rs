use std::path::Path;

use anyhow::{Context, Result};
use umbrella_core::pom::write_pom;
use umbrella_schema::Declared;

/// Write the collected dependencies into a fresh or existing POM.
pub fn pom(dependencies: &Path, output: &Path, coordinate: Option<&str>, into: Option<&Path>) -> Result<()> {
    let project = coordinate
        .map(str::parse::<Declared>)
        .transpose()
        .context("Invalid project coordinate")?;

    let count = write_pom(dependencies, output, project.as_ref(), into)?;
    eprintln!("Wrote {count} dependencies to {}", output.display());
    Ok(())
}
