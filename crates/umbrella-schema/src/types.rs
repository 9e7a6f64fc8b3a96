use serde::{Deserialize, Serialize};
use std::borrow::Borrow;

/// A module path as the host build knows it (e.g. `core` or `feature:login`).
///
/// Leading colons are stripped so `:feature:login` and `feature:login` name
/// the same module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct ModuleName(String);

impl ModuleName {
    /// Create a module name, normalizing away leading `:` separators.
    pub fn new(name: &str) -> Self {
        Self(name.trim().trim_start_matches(':').to_string())
    }

    /// Return the normalized name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Folder name used for this module's extracted tree, which doubles as
    /// the owner prefix when renaming colliding resources.
    ///
    /// # Example
    ///
    /// ```
    /// use umbrella_schema::ModuleName;
    ///
    /// assert_eq!(ModuleName::new(":feature:login").owner(), "feature_login");
    /// ```
    pub fn owner(&self) -> String {
        self.0.replace([':', '/', '\\'], "_")
    }

    /// Last path segment, which is the artifact name the module publishes under.
    pub fn artifact(&self) -> &str {
        self.0.rsplit(':').next().unwrap_or(&self.0)
    }
}

impl std::fmt::Display for ModuleName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::ops::Deref for ModuleName {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for ModuleName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ModuleName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for ModuleName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.trim_start_matches(':')
    }
}

impl PartialEq<&str> for ModuleName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.trim_start_matches(':')
    }
}

impl From<&str> for ModuleName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ModuleName {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl From<ModuleName> for String {
    fn from(value: ModuleName) -> Self {
        value.0
    }
}

/// A build variant name (e.g. `release`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variant(String);

impl Variant {
    /// Create a variant name.
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Return the variant name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Variant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Variant {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl AsRef<std::path::Path> for Variant {
    fn as_ref(&self) -> &std::path::Path {
        std::path::Path::new(&self.0)
    }
}

impl From<&str> for Variant {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A package-style namespace (e.g. `com.example.export`).
///
/// Stored in dotted form; [`Namespace::internal`] yields the slash-separated
/// form used inside compiled code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Namespace(String);

impl Namespace {
    /// Create a namespace from either dotted or slash-separated form.
    pub fn new(ns: &str) -> Self {
        Self(ns.trim().replace('/', "."))
    }

    /// Dotted form, as written in manifests.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Slash-separated form, as written in compiled code.
    ///
    /// # Example
    ///
    /// ```
    /// use umbrella_schema::Namespace;
    ///
    /// assert_eq!(Namespace::new("com.example.app").internal(), "com/example/app");
    /// ```
    pub fn internal(&self) -> String {
        self.0.replace('.', "/")
    }

    /// Whether the namespace is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for Namespace {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Namespace {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}
