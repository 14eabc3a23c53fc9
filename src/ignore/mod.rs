use crate::model::Result;
use indexmap::IndexMap;
use serde_json::{from_str, Value};
use std::fs;

pub const WILDCARD_REPOSITORY: &str = "*";

/// Per-repository file exclusion rules. A file matched by a rule contributes
/// nothing to any line-count metric.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    rules: IndexMap<String, IgnoreRule>,
}

#[derive(Debug, Clone, Default)]
struct IgnoreRule {
    path_prefixes: Vec<String>,
    extensions: Vec<String>,
}

// Create
impl IgnoreRules {
    /// Absence of the rules file, or any load failure, degrades to an empty
    /// table: nothing is ignored.
    pub fn load_or_default(path: &str) -> Self {
        Self::from_config(path).unwrap_or_default()
    }

    pub fn from_config(path: &str) -> Result<Self> {
        let json_str = fs::read_to_string(path)?;
        Self::from_json(&json_str)
    }
}

// Parser
impl IgnoreRules {
    pub fn from_json(json_str: &str) -> Result<Self> {
        let elements: IndexMap<String, Value> = from_str(json_str)?;
        let mut rules = IndexMap::new();
        for (repository, details) in elements {
            let path_prefixes = string_entries(&details["paths"])
                .map(|prefix| normalize_path(&prefix))
                .collect();
            let extensions = string_entries(&details["extensions"])
                .filter_map(|extension| normalize_extension(&extension))
                .collect();
            rules.insert(
                repository,
                IgnoreRule {
                    path_prefixes,
                    extensions,
                },
            );
        }
        Ok(Self { rules })
    }
}

// Evaluation
impl IgnoreRules {
    /// Exactly one rule record applies: the repository's own entry if
    /// present, otherwise the `"*"` wildcard entry, otherwise nothing is
    /// ignored. Repository-specific and wildcard rules are never merged.
    pub fn should_ignore(&self, repository: &str, file_path: &str) -> bool {
        let rule = self
            .rules
            .get(repository)
            .or_else(|| self.rules.get(WILDCARD_REPOSITORY));
        let Some(rule) = rule else {
            return false;
        };

        let path = normalize_path(file_path);
        let lowered = path.to_lowercase();
        rule.path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix))
            || rule
                .extensions
                .iter()
                .any(|extension| lowered.ends_with(extension))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

fn string_entries(value: &Value) -> impl Iterator<Item = String> + '_ {
    value
        .as_array()
        .into_iter()
        .flatten()
        .filter_map(|entry| entry.as_str().map(String::from))
}

fn normalize_path(path: &str) -> String {
    path.replace('\\', "/")
}

/// Empty entries are dropped: an empty suffix would match every path.
fn normalize_extension(extension: &str) -> Option<String> {
    let extension = extension.trim().to_lowercase();
    if extension.is_empty() {
        return None;
    }
    if extension.starts_with('.') {
        Some(extension)
    } else {
        Some(format!(".{extension}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(json: &str) -> IgnoreRules {
        IgnoreRules::from_json(json).unwrap()
    }

    #[test]
    fn empty_table_ignores_nothing() {
        let rules = IgnoreRules::default();
        assert!(!rules.should_ignore("octo-org/widgets", "docs/readme.md"));
    }

    #[test]
    fn matches_path_prefix() {
        let rules = rules(r#"{"octo-org/widgets": {"paths": ["docs/"]}}"#);
        assert!(rules.should_ignore("octo-org/widgets", "docs/readme.md"));
        assert!(!rules.should_ignore("octo-org/widgets", "src/docs.rs"));
    }

    #[test]
    fn matches_extension_case_insensitively() {
        let rules = rules(r#"{"octo-org/widgets": {"extensions": [".Lock", "snap"]}}"#);
        assert!(rules.should_ignore("octo-org/widgets", "Cargo.lock"));
        assert!(rules.should_ignore("octo-org/widgets", "tests/UI.SNAP"));
        assert!(!rules.should_ignore("octo-org/widgets", "src/main.rs"));
    }

    #[test]
    fn inserts_leading_dot_on_extensions() {
        let rules = rules(r#"{"*": {"extensions": ["min.js"]}}"#);
        assert!(rules.should_ignore("octo-org/widgets", "dist/app.min.js"));
        assert!(!rules.should_ignore("octo-org/widgets", "src/app.js"));
    }

    #[test]
    fn skips_empty_extension_entries() {
        let rules = rules(r#"{"*": {"extensions": ["", "  "]}}"#);
        assert!(!rules.should_ignore("octo-org/widgets", "anything/at/all.rs"));
    }

    #[test]
    fn falls_back_to_wildcard_entry() {
        let rules = rules(r#"{"*": {"paths": ["vendor/"]}}"#);
        assert!(rules.should_ignore("octo-org/widgets", "vendor/lib.rs"));
    }

    #[test]
    fn repository_entry_shadows_wildcard() {
        let rules = rules(
            r#"{
                "octo-org/widgets": {"paths": ["generated/"]},
                "*": {"paths": ["vendor/"]}
            }"#,
        );
        // The wildcard is not merged in once a repository entry exists.
        assert!(!rules.should_ignore("octo-org/widgets", "vendor/lib.rs"));
        assert!(rules.should_ignore("octo-org/widgets", "generated/schema.rs"));
        assert!(rules.should_ignore("octo-org/gadgets", "vendor/lib.rs"));
    }

    #[test]
    fn normalizes_backslashes() {
        let rules = rules(r#"{"*": {"paths": ["docs\\api/"]}}"#);
        assert!(rules.should_ignore("octo-org/widgets", "docs\\api\\index.md"));
        assert!(rules.should_ignore("octo-org/widgets", "docs/api/index.md"));
    }

    #[test]
    fn missing_file_degrades_to_default() {
        let rules = IgnoreRules::load_or_default("does-not-exist.json");
        assert!(rules.is_empty());
    }
}
