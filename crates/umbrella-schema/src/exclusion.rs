use serde::{Deserialize, Serialize};
use std::fmt;

/// A `(group, module)` exclusion pattern.
///
/// An omitted field acts as a wildcard, but a rule with both fields omitted
/// matches nothing.
///
/// # Example
///
/// ```
/// use umbrella_schema::ExclusionRule;
///
/// let rule = ExclusionRule::group("com.example");
/// assert!(rule.matches(Some("com.example"), Some("anything")));
/// assert!(!ExclusionRule::default().matches(Some("com.example"), Some("anything")));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ExclusionRule {
    /// Group to match, `None` for any group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Module (artifact) name to match, `None` for any module.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
}

impl ExclusionRule {
    /// Rule matching exactly one `group:module` pair.
    pub fn new(group: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            module: Some(module.into()),
        }
    }

    /// Rule matching every module in a group.
    pub fn group(group: impl Into<String>) -> Self {
        Self {
            group: Some(group.into()),
            module: None,
        }
    }

    /// Rule matching a module name in any group.
    pub fn module(module: impl Into<String>) -> Self {
        Self {
            group: None,
            module: Some(module.into()),
        }
    }

    /// Whether this rule excludes the given `group`/`module` pair.
    pub fn matches(&self, group: Option<&str>, module: Option<&str>) -> bool {
        let group_pattern = self.group.as_deref().filter(|g| !g.is_empty());
        let module_pattern = self.module.as_deref().filter(|m| !m.is_empty());

        match (group_pattern, module_pattern) {
            (Some(g), Some(m)) => group == Some(g) && module == Some(m),
            (Some(g), None) => group == Some(g),
            (None, Some(m)) => module == Some(m),
            (None, None) => false,
        }
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.group.as_deref().unwrap_or("*"),
            self.module.as_deref().unwrap_or("*")
        )
    }
}

/// Whether any rule in `rules` excludes the given pair.
pub fn is_excluded(rules: &[ExclusionRule], group: Option<&str>, module: Option<&str>) -> bool {
    rules.iter().any(|r| r.matches(group, module))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn both_fields_must_match() {
        let rule = ExclusionRule::new("com.example", "core");
        assert!(rule.matches(Some("com.example"), Some("core")));
        assert!(!rule.matches(Some("com.example"), Some("ui")));
        assert!(!rule.matches(Some("org.other"), Some("core")));
        assert!(!rule.matches(None, Some("core")));
    }

    #[test]
    fn group_only_is_a_wildcard_on_module() {
        let rule = ExclusionRule::group("com.example");
        assert!(rule.matches(Some("com.example"), Some("core")));
        assert!(rule.matches(Some("com.example"), None));
        assert!(!rule.matches(Some("com.example.sub"), Some("core")));
    }

    #[test]
    fn module_only_is_a_wildcard_on_group() {
        let rule = ExclusionRule::module("core");
        assert!(rule.matches(Some("any"), Some("core")));
        assert!(rule.matches(None, Some("core")));
        assert!(!rule.matches(Some("any"), Some("ui")));
    }

    #[test]
    fn empty_rule_matches_nothing() {
        let empty = ExclusionRule::default();
        assert!(!empty.matches(Some(""), Some("")));
        assert!(!empty.matches(None, None));

        let blank = ExclusionRule {
            group: Some(String::new()),
            module: Some(String::new()),
        };
        assert!(!blank.matches(Some(""), Some("")));
    }

    #[test]
    fn display_uses_star_for_wildcards() {
        assert_eq!(ExclusionRule::group("g").to_string(), "g:*");
        assert_eq!(ExclusionRule::module("m").to_string(), "*:m");
    }

    #[test]
    fn any_rule_excludes() {
        let rules = vec![ExclusionRule::module("a"), ExclusionRule::group("g")];
        assert!(is_excluded(&rules, Some("x"), Some("a")));
        assert!(is_excluded(&rules, Some("g"), Some("b")));
        assert!(!is_excluded(&rules, Some("x"), Some("b")));
        assert!(!is_excluded(&[], Some("x"), Some("b")));
    }
}
