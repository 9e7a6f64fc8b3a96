use std::borrow::Cow;
use std::path::Path;

use anyhow::{Context, Result};
use umbrella_core::remap::Remapper;
use umbrella_schema::Namespace;

/// Remap one class file, in place unless `output` is given.
pub fn remap(class: &Path, namespace: &str, output: Option<&Path>) -> Result<()> {
    let bytes = std::fs::read(class).with_context(|| format!("Failed to read {}", class.display()))?;
    let remapper = Remapper::new(&Namespace::new(namespace));
    let remapped = remapper.remap(&class.display().to_string(), &bytes)?;

    let target = output.unwrap_or(class);
    match remapped {
        Cow::Borrowed(_) if output.is_none() => {
            eprintln!("No resource class references to remap");
            return Ok(());
        }
        Cow::Borrowed(_) => eprintln!("No resource class references to remap"),
        Cow::Owned(_) => eprintln!("Remapped into {}", remapper.target()),
    }
    std::fs::write(target, remapped.as_ref()).with_context(|| format!("Failed to write {}", target.display()))?;
    Ok(())
}
