//! Publication metadata: the `<dependencies>` block of a POM.

use std::fs;
use std::path::Path;

use quick_xml::escape::escape;
use tracing::info;
use umbrella_schema::{Coordinate, Declared};

use crate::collector::read_dependency_file;
use crate::error::{IoContext, Result, UmbrellaError};

const PROJECT_END: &str = "</project>";

/// Render a `<dependencies>` block indented for a top-level POM child.
/// Empty input renders nothing.
pub fn render_dependencies(deps: &[Coordinate]) -> String {
    if deps.is_empty() {
        return String::new();
    }
    let mut out = String::from("  <dependencies>\n");
    for dep in deps {
        out.push_str(&format!(
            "    <dependency>\n      <groupId>{}</groupId>\n      <artifactId>{}</artifactId>\n      <version>{}</version>\n      <scope>{}</scope>\n    </dependency>\n",
            escape(&dep.group),
            escape(&dep.name),
            escape(&dep.version),
            escape(&dep.scope),
        ));
    }
    out.push_str("  </dependencies>\n");
    out
}

/// Render a minimal POM for `project` (`group:artifact:version`) with
/// `deps` as its dependencies.
pub fn render_pom(project: &Declared, deps: &[Coordinate]) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<project xmlns="http://maven.apache.org/POM/4.0.0" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance" xsi:schemaLocation="http://maven.apache.org/POM/4.0.0 https://maven.apache.org/xsd/maven-4.0.0.xsd">
  <modelVersion>4.0.0</modelVersion>
  <groupId>{}</groupId>
  <artifactId>{}</artifactId>
  <version>{}</version>
  <packaging>aar</packaging>
{}</project>
"#,
        escape(&project.group),
        escape(&project.name),
        escape(&project.version),
        render_dependencies(deps)
    )
}

/// Insert a `<dependencies>` block before the closing `</project>` of an
/// existing POM.
pub fn insert_dependencies(pom: &str, deps: &[Coordinate], label: &Path) -> Result<String> {
    let Some(end) = pom.rfind(PROJECT_END) else {
        return Err(UmbrellaError::Pom {
            path: label.to_path_buf(),
            reason: format!("missing {PROJECT_END}"),
        });
    };
    let (head, tail) = pom.split_at(end);
    let mut out = String::with_capacity(pom.len() + 256);
    out.push_str(head.trim_end());
    out.push('\n');
    out.push_str(&render_dependencies(deps));
    out.push_str(tail);
    Ok(out)
}

/// Write a POM carrying the dependencies recorded in `dependency_file`.
///
/// With `into`, the block is added to that existing POM; otherwise a fresh
/// POM is rendered for `project`. Returns the number of dependencies.
///
/// # Errors
///
/// [`UmbrellaError::MissingDependencyFile`] when the collect step has not
/// produced `dependency_file` yet.
pub fn write_pom(
    dependency_file: &Path,
    output: &Path,
    project: Option<&Declared>,
    into: Option<&Path>,
) -> Result<usize> {
    if !dependency_file.exists() {
        return Err(UmbrellaError::MissingDependencyFile {
            path: dependency_file.to_path_buf(),
        });
    }
    let deps = read_dependency_file(dependency_file)?;

    let pom = match (into, project) {
        (Some(existing), _) => {
            let text = fs::read_to_string(existing).at(existing)?;
            insert_dependencies(&text, &deps, existing)?
        }
        (None, Some(project)) => render_pom(project, &deps),
        (None, None) => {
            return Err(UmbrellaError::Pom {
                path: output.to_path_buf(),
                reason: "either a project coordinate or an existing POM is required".into(),
            });
        }
    };

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent).at(parent)?;
    }
    fs::write(output, pom).at(output)?;
    info!("POM written to {} with {} dependencies", output.display(), deps.len());
    Ok(deps.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps() -> Vec<Coordinate> {
        vec![
            Coordinate::new("io.ktor", "ktor-client-core", "3.0.0", "compile"),
            Coordinate::new("org.x", "lib", "1.0.0", "compile"),
        ]
    }

    #[test]
    fn fresh_pom_lists_dependencies() {
        let project: Declared = "com.example:umbrella:1.0.0".parse().unwrap();
        let pom = render_pom(&project, &deps());
        assert!(pom.contains("<artifactId>umbrella</artifactId>"));
        assert!(pom.contains("<groupId>io.ktor</groupId>\n      <artifactId>ktor-client-core</artifactId>"));
        assert!(pom.contains("<scope>compile</scope>"));
        assert_eq!(pom.matches("<dependency>").count(), 2);
    }

    #[test]
    fn empty_dependencies_render_no_block() {
        let project: Declared = "g:a:1".parse().unwrap();
        assert!(!render_pom(&project, &[]).contains("<dependencies>"));
    }

    #[test]
    fn inserts_into_existing_pom() {
        let existing = "<project>\n  <artifactId>a</artifactId>\n</project>\n";
        let out = insert_dependencies(existing, &deps(), Path::new("pom.xml")).unwrap();
        assert!(out.starts_with("<project>\n  <artifactId>a</artifactId>\n  <dependencies>"));
        assert!(out.ends_with("  </dependencies>\n</project>\n"));

        assert!(insert_dependencies("<nope/>", &deps(), Path::new("pom.xml")).is_err());
    }

    #[test]
    fn missing_dependency_file_names_collect_step() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("external-dependencies.txt");
        let err = write_pom(&missing, &dir.path().join("pom.xml"), None, None).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("external-dependencies.txt"));
        assert!(msg.contains("umbrella collect"));
    }

    #[test]
    fn writes_pom_from_dependency_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("deps.txt");
        fs::write(&file, "org.x:lib:1.0.0:compile\nmalformed\n").unwrap();
        let project: Declared = "com.example:umbrella:1.0.0".parse().unwrap();
        let out = dir.path().join("out/pom.xml");

        assert_eq!(write_pom(&file, &out, Some(&project), None).unwrap(), 1);
        let pom = fs::read_to_string(&out).unwrap();
        assert!(pom.contains("<artifactId>lib</artifactId>"));
        assert!(!pom.contains("malformed"));
    }
}
