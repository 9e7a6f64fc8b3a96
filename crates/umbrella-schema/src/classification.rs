use serde::{Deserialize, Serialize};

/// Priority class of a dependency declaration surface.
///
/// A platform-specific declaration always wins over a common one with the
/// same dependency key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Shared across platforms (e.g. `commonMainApi`).
    #[default]
    Common,
    /// Specific to the target platform (e.g. `androidMainImplementation`).
    Platform,
}

/// What a configuration is used for by the host build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// A bucket of declared dependencies (`api`, `implementation`).
    #[default]
    Declaration,
    /// Test-only declarations; never exported.
    Test,
    /// Resolvable or consumable configuration derived from declarations.
    Resolvable,
}

/// Explicit classification of a configuration, supplied by the host instead
/// of being re-derived from configuration names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct SurfaceClass {
    /// Priority tier of the declarations on this surface.
    #[serde(default)]
    pub tier: Tier,
    /// How the host uses this configuration.
    #[serde(default)]
    pub role: Role,
    /// Build variants this surface applies to; empty means every variant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variants: Vec<String>,
}

impl SurfaceClass {
    /// Whether module edges declared on this surface are followed by the
    /// graph walker.
    pub fn is_exported(&self) -> bool {
        self.role == Role::Declaration
    }

    /// Whether this surface applies to `variant`.
    pub fn applies_to(&self, variant: &str) -> bool {
        self.variants.is_empty() || self.variants.iter().any(|v| v.eq_ignore_ascii_case(variant))
    }

    /// Whether declarations on this surface are collected for publication
    /// when building `variant`.
    pub fn is_relevant_for(&self, variant: &str) -> bool {
        self.is_exported() && self.applies_to(variant)
    }
}
