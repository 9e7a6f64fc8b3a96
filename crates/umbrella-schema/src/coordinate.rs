use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Errors produced by strict coordinate parsing.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum CoordinateError {
    /// The record did not contain the expected number of colon-separated fields.
    #[error("Invalid coordinate '{input}': expected {expected} colon-separated fields, got {actual}")]
    FieldCount {
        /// The rejected input.
        input: String,
        /// Number of fields required.
        expected: usize,
        /// Number of fields found.
        actual: usize,
    },

    /// One of the fields was empty.
    #[error("Invalid coordinate '{0}': empty field")]
    EmptyField(String),
}

/// Identity of an external dependency: `group:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyKey(String);

impl DependencyKey {
    /// Build a key from its group and name.
    pub fn new(group: &str, name: &str) -> Self {
        Self(format!("{group}:{name}"))
    }

    /// Return the key as `group:name`.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DependencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A fully specified external dependency: `group:name:version:scope`.
///
/// Ordering is by group, then name, then version and scope, which is the
/// order coordinate files are written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coordinate {
    /// Publishing group (e.g. `org.jetbrains.kotlinx`).
    pub group: String,
    /// Artifact name (e.g. `kotlinx-coroutines-core`).
    pub name: String,
    /// Exact resolved version.
    pub version: String,
    /// Publication scope (e.g. `compile`).
    pub scope: String,
}

impl Coordinate {
    /// Create a coordinate from its four parts.
    pub fn new(
        group: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            name: name.into(),
            version: version.into(),
            scope: scope.into(),
        }
    }

    /// Identity key used for deduplication.
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.group, &self.name)
    }

    /// Lenient parse used when reading coordinate files: anything that is not
    /// exactly four colon-separated fields yields `None`.
    pub fn from_record(record: &str) -> Option<Self> {
        let parts: Vec<&str> = record.split(':').collect();
        match parts.as_slice() {
            [group, name, version, scope] => Some(Self::new(*group, *name, *version, *scope)),
            _ => None,
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}:{}", self.group, self.name, self.version, self.scope)
    }
}

impl FromStr for Coordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 4 {
            return Err(CoordinateError::FieldCount {
                input: s.to_string(),
                expected: 4,
                actual: parts.len(),
            });
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoordinateError::EmptyField(s.to_string()));
        }
        Ok(Self::new(parts[0], parts[1], parts[2], parts[3]))
    }
}

/// A declared external dependency as written in a build file: `group:name:version`.
///
/// Scope is attached later by the collector.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Declared {
    /// Publishing group.
    pub group: String,
    /// Artifact name.
    pub name: String,
    /// Declared version.
    pub version: String,
}

impl Declared {
    /// Identity key used for deduplication.
    pub fn key(&self) -> DependencyKey {
        DependencyKey::new(&self.group, &self.name)
    }

    /// Attach a scope, producing a publishable coordinate.
    pub fn with_scope(&self, scope: &str) -> Coordinate {
        Coordinate::new(&self.group, &self.name, &self.version, scope)
    }
}

impl fmt::Display for Declared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.group, self.name, self.version)
    }
}

impl FromStr for Declared {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        if parts.len() != 3 {
            return Err(CoordinateError::FieldCount {
                input: s.to_string(),
                expected: 3,
                actual: parts.len(),
            });
        }
        if parts.iter().any(|p| p.is_empty()) {
            return Err(CoordinateError::EmptyField(s.to_string()));
        }
        Ok(Self {
            group: parts[0].to_string(),
            name: parts[1].to_string(),
            version: parts[2].to_string(),
        })
    }
}

impl TryFrom<String> for Declared {
    type Error = CoordinateError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Declared> for String {
    fn from(value: Declared) -> Self {
        value.to_string()
    }
}

/// Parse a newline-separated coordinate file, silently dropping malformed
/// and blank records.
pub fn parse_coordinates(content: &str) -> Vec<Coordinate> {
    content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .filter_map(Coordinate::from_record)
        .collect()
}

/// Render coordinates one per line, without a trailing newline.
pub fn render_coordinates(coordinates: &[Coordinate]) -> String {
    coordinates
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_with_four_fields_parses() {
        let c = Coordinate::from_record("com.example:library:1.0.0:compile").unwrap();
        assert_eq!(c.group, "com.example");
        assert_eq!(c.name, "library");
        assert_eq!(c.version, "1.0.0");
        assert_eq!(c.scope, "compile");
        assert_eq!(c.key().as_str(), "com.example:library");
    }

    #[test]
    fn records_with_wrong_field_count_are_dropped() {
        assert!(Coordinate::from_record("com.example:library:1.0.0").is_none());
        assert!(Coordinate::from_record("com.example:library:1.0.0:compile:extra").is_none());
        assert!(Coordinate::from_record("").is_none());
        assert!(Coordinate::from_record("invalid").is_none());
    }

    #[test]
    fn dotted_groups_survive() {
        let c = Coordinate::from_record("com.example.nested:lib:1.0:compile").unwrap();
        assert_eq!(c.group, "com.example.nested");
        assert_eq!(c.to_string(), "com.example.nested:lib:1.0:compile");
    }

    #[test]
    fn parse_coordinates_skips_garbage_lines() {
        let content = "a:b:1:compile\n\nbroken\nc:d:2:runtime\n  \n";
        let parsed = parse_coordinates(content);
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].to_string(), "c:d:2:runtime");
    }

    #[test]
    fn strict_parse_reports_field_count() {
        let err = "a:b:c".parse::<Coordinate>().unwrap_err();
        assert_eq!(
            err,
            CoordinateError::FieldCount {
                input: "a:b:c".into(),
                expected: 4,
                actual: 3
            }
        );
        assert!(matches!(
            "a::1:compile".parse::<Coordinate>(),
            Err(CoordinateError::EmptyField(_))
        ));
    }

    #[test]
    fn declared_parses_three_fields() {
        let d: Declared = "org.x:lib:1.0.0".parse().unwrap();
        assert_eq!(d.key().as_str(), "org.x:lib");
        assert_eq!(d.with_scope("compile").to_string(), "org.x:lib:1.0.0:compile");
        assert!("org.x:lib".parse::<Declared>().is_err());
    }

    #[test]
    fn render_joins_without_trailing_newline() {
        let coords = vec![
            Coordinate::new("a", "b", "1", "compile"),
            Coordinate::new("c", "d", "2", "compile"),
        ];
        assert_eq!(render_coordinates(&coords), "a:b:1:compile\nc:d:2:compile");
        assert_eq!(render_coordinates(&[]), "");
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_parsed_record_renders_as_one_line(content in "[a-z0-9.:\n ]{0,256}") {
                let parsed = parse_coordinates(&content);
                let lines = content.lines().filter(|l| !l.trim().is_empty()).count();
                prop_assert!(parsed.len() <= lines);
                for c in &parsed {
                    prop_assert_eq!(c.to_string().split(':').count(), 4);
                    prop_assert!(!c.to_string().contains('\n'));
                }
            }
        }
    }
}
