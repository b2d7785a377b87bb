//! Endpoint allow-list filtering.
//!
//! The filter file is a YAML document with three optional sections: `paths`
//! (glob rules with optional method lists), `operationIds`, and `tags`. An
//! endpoint is included when any section matches. Without a file, filtering
//! is disabled and everything passes. A file that parses to nothing is a
//! fatal misconfiguration rather than a match-nothing filter.
//!
//! Glob semantics for path rules: a pattern without `*` is exact equality,
//! `**` matches across path segments, `*` matches within a single segment.

use std::path::Path;

use crate::error::{Error, Result};

use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tokio::fs;

#[derive(Debug, Deserialize)]
struct FilterFile {
    #[serde(default)]
    paths: Vec<PathRule>,
    #[serde(default, rename = "operationIds")]
    operation_ids: Vec<String>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PathRule {
    path: String,
    #[serde(default)]
    methods: Vec<String>,
}

#[derive(Debug)]
enum PathPattern {
    Exact(String),
    Glob(Regex),
}

impl PathPattern {
    fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(expected) => expected == path,
            PathPattern::Glob(regex) => regex.is_match(path),
        }
    }
}

#[derive(Debug)]
struct CompiledPathRule {
    pattern: PathPattern,
    /// Lowercased at load time; empty means any method
    methods: Vec<String>,
}

#[derive(Debug)]
struct FilterRules {
    paths: Vec<CompiledPathRule>,
    operation_ids: Vec<String>,
    tags: Vec<String>,
}

/// Decides which (path, method) pairs are generated.
#[derive(Debug)]
pub struct EndpointFilter {
    rules: Option<FilterRules>,
}

impl EndpointFilter {
    /// A filter that includes everything (no filter file configured).
    pub fn disabled() -> Self {
        Self { rules: None }
    }

    /// Load filter rules from a YAML file. The file must exist and contain
    /// at least one populated criterion.
    pub async fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::EndpointFilterFileNotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    /// Parse filter rules from YAML content.
    pub fn parse(content: &str) -> Result<Self> {
        let document: serde_yaml::Value = serde_yaml::from_str(content)
            .map_err(|e| Error::EndpointFilterInvalidYaml(e.to_string()))?;
        if document.is_null() {
            return Err(Error::EndpointFilterEmpty);
        }

        let file: FilterFile = serde_yaml::from_value(document)
            .map_err(|e| Error::EndpointFilterInvalidYaml(e.to_string()))?;
        if file.paths.is_empty() && file.operation_ids.is_empty() && file.tags.is_empty() {
            return Err(Error::EndpointFilterEmpty);
        }

        let paths = file
            .paths
            .into_iter()
            .map(|rule| {
                Ok(CompiledPathRule {
                    pattern: compile_pattern(&rule.path)?,
                    methods: rule.methods.iter().map(|m| m.to_lowercase()).collect(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            rules: Some(FilterRules {
                paths,
                operation_ids: file.operation_ids,
                tags: file.tags,
            }),
        })
    }

    /// Whether a (path, method) pair with the given operation details passes.
    ///
    /// The three criteria are independent: a match on any one includes the
    /// endpoint.
    pub fn is_included(&self, path: &str, method: &str, details: &Value) -> bool {
        let Some(rules) = &self.rules else {
            return true;
        };

        let method = method.to_lowercase();
        for rule in &rules.paths {
            if rule.pattern.matches(path)
                && (rule.methods.is_empty() || rule.methods.contains(&method))
            {
                return true;
            }
        }

        if let Some(operation_id) = details.get("operationId").and_then(Value::as_str) {
            if rules.operation_ids.iter().any(|id| id == operation_id) {
                return true;
            }
        }

        if let Some(tags) = details.get("tags").and_then(Value::as_array) {
            for tag in tags.iter().filter_map(Value::as_str) {
                if rules.tags.iter().any(|t| t == tag) {
                    return true;
                }
            }
        }

        false
    }
}

/// Convert a path glob to a matcher.
///
/// `**` must be rewritten before `*` so it is not degraded into two
/// single-segment wildcards.
fn compile_pattern(path: &str) -> Result<PathPattern> {
    if !path.contains('*') {
        return Ok(PathPattern::Exact(path.to_string()));
    }

    let escaped = regex::escape(path)
        .replace(r"\*\*", ".+")
        .replace(r"\*", "[^/]+");
    let regex = Regex::new(&format!("^{escaped}$"))
        .map_err(|e| Error::EndpointFilterInvalidYaml(e.to_string()))?;
    Ok(PathPattern::Glob(regex))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn path_filter(pattern: &str) -> EndpointFilter {
        EndpointFilter::parse(&format!("paths:\n  - path: \"{pattern}\"\n")).unwrap()
    }

    #[test]
    fn test_disabled_filter_includes_everything() {
        let filter = EndpointFilter::disabled();
        assert!(filter.is_included("/anything", "get", &json!({})));
    }

    #[tokio::test]
    async fn test_missing_file_is_fatal() {
        let result = EndpointFilter::load(Path::new("/nonexistent/filters.yaml")).await;
        assert!(matches!(result, Err(Error::EndpointFilterFileNotFound(_))));
    }

    #[test]
    fn test_invalid_yaml_is_fatal() {
        let result = EndpointFilter::parse("paths: [unclosed");
        assert!(matches!(result, Err(Error::EndpointFilterInvalidYaml(_))));
    }

    #[test]
    fn test_empty_file_is_fatal() {
        for content in ["", "# just a comment\n", "paths: []\noperationIds: []\ntags: []\n"] {
            let result = EndpointFilter::parse(content);
            assert!(
                matches!(result, Err(Error::EndpointFilterEmpty)),
                "expected empty error for {content:?}"
            );
        }
    }

    #[test]
    fn test_exact_path_match() {
        let filter = path_filter("/users");
        assert!(filter.is_included("/users", "get", &json!({})));
        assert!(!filter.is_included("/users/123", "get", &json!({})));
    }

    #[test]
    fn test_single_segment_wildcard() {
        let filter = path_filter("/users/*");
        assert!(filter.is_included("/users/123", "get", &json!({})));
        assert!(!filter.is_included("/users/123/orders", "get", &json!({})));
        assert!(!filter.is_included("/users", "get", &json!({})));
    }

    #[test]
    fn test_multi_segment_wildcard() {
        let filter = path_filter("/users/**");
        assert!(filter.is_included("/users/123", "get", &json!({})));
        assert!(filter.is_included("/users/123/orders", "get", &json!({})));
    }

    #[test]
    fn test_wildcard_in_middle_of_path() {
        let filter = path_filter("/users/*/orders");
        assert!(filter.is_included("/users/123/orders", "get", &json!({})));
        assert!(!filter.is_included("/users/123/45/orders", "get", &json!({})));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        let filter = path_filter("/users.list");
        assert!(filter.is_included("/users.list", "get", &json!({})));
        assert!(!filter.is_included("/usersXlist", "get", &json!({})));
    }

    #[test]
    fn test_method_list_restricts_path_match() {
        let filter = EndpointFilter::parse(
            "paths:\n  - path: /users\n    methods: [GET, post]\n",
        )
        .unwrap();
        assert!(filter.is_included("/users", "get", &json!({})));
        assert!(filter.is_included("/users", "POST", &json!({})));
        assert!(!filter.is_included("/users", "delete", &json!({})));
    }

    #[test]
    fn test_operation_id_match_is_case_sensitive() {
        let filter = EndpointFilter::parse("operationIds:\n  - getUser\n").unwrap();
        assert!(filter.is_included("/x", "get", &json!({"operationId": "getUser"})));
        assert!(!filter.is_included("/x", "get", &json!({"operationId": "getuser"})));
        assert!(!filter.is_included("/x", "get", &json!({})));
    }

    #[test]
    fn test_tag_intersection() {
        let filter = EndpointFilter::parse("tags:\n  - admin\n").unwrap();
        assert!(filter.is_included("/x", "get", &json!({"tags": ["public", "admin"]})));
        assert!(!filter.is_included("/x", "get", &json!({"tags": ["public"]})));
    }

    #[test]
    fn test_or_semantics_across_criteria() {
        let filter = EndpointFilter::parse(
            "paths:\n  - path: /other\noperationIds:\n  - someOp\ntags:\n  - admin\n",
        )
        .unwrap();
        // Path and operationId criteria both miss; the tag match includes it
        let details = json!({"operationId": "getUser", "tags": ["admin"]});
        assert!(filter.is_included("/users", "get", &details));
    }

    #[tokio::test]
    async fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("filters.yaml");
        std::fs::write(&path, "tags:\n  - billing\n").unwrap();
        let filter = EndpointFilter::load(&path).await.unwrap();
        assert!(filter.is_included("/x", "get", &json!({"tags": ["billing"]})));
    }
}
