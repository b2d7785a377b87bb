//! Function generation: deterministic naming and per-endpoint rendering.
//!
//! Each included (path, method) pair becomes one handler file under
//! `<output>/lambdas/`. Names are derived from the method and path, bounded
//! so that `<namespace>_<name>` never exceeds the 64-character identifier
//! limit cloud resource names are subject to. Over-budget names are truncated
//! and given a short digest suffix so they stay unique and stable.

use crate::config::Config;
use crate::endpoint_filter::EndpointFilter;
use crate::error::{Error, Result};
use crate::spec::Spec;
use crate::template::TemplateService;

use sha2::{Digest, Sha512};
use tera::Context;
use tokio::fs;

/// Maximum length of `<namespace>_<function name>`
const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Hex characters taken from the digest for truncated names
const HASH_SUFFIX_LENGTH: usize = 4;

/// HTTP methods that become functions; other keys under a path entry
/// (parameters, summary, extensions) are skipped.
const METHODS: [&str; 6] = ["get", "put", "post", "delete", "patch", "head"];

/// Renders one handler per included endpoint.
pub struct FunctionGenerator<'a> {
    templates: &'a TemplateService,
    config: &'a Config,
    max_length: usize,
    prefix_length: usize,
}

impl<'a> FunctionGenerator<'a> {
    pub fn new(templates: &'a TemplateService, namespace: &str, config: &'a Config) -> Self {
        // The namespace prefix and its joining underscore eat into the budget
        let max_length = MAX_IDENTIFIER_LENGTH.saturating_sub(namespace.len() + 1);
        let prefix_length = max_length.saturating_sub(HASH_SUFFIX_LENGTH + 1);
        Self {
            templates,
            config,
            max_length,
            prefix_length,
        }
    }

    /// Derive the function name for a (method, path) pair.
    ///
    /// Deterministic: the same input always yields the same name, truncated
    /// names included.
    pub fn function_name(&self, method: &str, path: &str) -> String {
        let cleaned: String = path
            .chars()
            .filter(|c| *c != '{' && *c != '}')
            .map(|c| if c == '/' || c == '.' { '_' } else { c })
            .collect();
        let name = format!("{}_{}", method, cleaned.trim_matches('_'));

        if name.chars().count() <= self.max_length {
            return name;
        }

        let digest = Sha512::digest(name.as_bytes());
        let suffix = format!("{:02x}{:02x}", digest[0], digest[1]);
        let prefix: String = name.chars().take(self.prefix_length).collect();
        format!("{prefix}_{suffix}")
    }

    /// Generate a handler file per included endpoint, returning the sorted
    /// list of function names.
    pub async fn generate(
        &self,
        spec: &Spec,
        filter: &EndpointFilter,
        base_url: &str,
    ) -> Result<Vec<String>> {
        let paths = spec
            .paths()
            .ok_or_else(|| Error::spec("spec declares no paths"))?;

        let lambdas_dir = self.config.output_dir.join("lambdas");
        fs::create_dir_all(&lambdas_dir).await?;

        let mut names = Vec::new();
        for (path, operations) in paths {
            let Some(operations) = operations.as_object() else {
                continue;
            };
            for (method, details) in operations {
                if !METHODS.contains(&method.as_str()) {
                    continue;
                }
                if !filter.is_included(path, method, details) {
                    log::debug!("Skipping filtered endpoint {method} {path}");
                    continue;
                }

                let name = self.function_name(method, path);
                let context = self.build_context(base_url, method, path, details);
                let rendered = self.templates.render("lambda.py.tera", &context)?;
                fs::write(lambdas_dir.join(format!("{name}.py")), rendered).await?;
                names.push(name);
            }
        }

        names.sort();
        log::info!("Generated {} functions in {}", names.len(), lambdas_dir.display());
        Ok(names)
    }

    fn build_context(
        &self,
        base_url: &str,
        method: &str,
        path: &str,
        details: &serde_json::Value,
    ) -> Context {
        let mut context = Context::new();
        context.insert("base_url", &base_url);
        context.insert("method", &method);
        context.insert("path", &path);
        context.insert("details", details);
        context.insert("preprocessor", &handler_module(&self.config.preprocessor));
        context.insert("preprocessor_handler", &self.config.preprocessor);
        context.insert("postprocessor", &handler_module(&self.config.postprocessor));
        context.insert("postprocessor_handler", &self.config.postprocessor);
        context.insert("xray_tracing", &self.config.xray_tracing);
        context
    }
}

/// Module part of a `module.function` handler reference, for imports.
fn handler_module(reference: &str) -> String {
    match reference.rsplit_once('.') {
        Some((module, _)) => module.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    struct Fixture {
        _dir: tempfile::TempDir,
        templates: TemplateService,
        config: Config,
    }

    fn fixture(lambda_template: &str) -> Fixture {
        let dir = tempdir().unwrap();
        let templates_dir = dir.path().join("templates");
        std::fs::create_dir_all(&templates_dir).unwrap();
        std::fs::write(templates_dir.join("lambda.py.tera"), lambda_template).unwrap();

        let mut config = Config::default();
        config.template_path = templates_dir.clone();
        config.output_dir = dir.path().join("out");
        std::fs::create_dir_all(&config.output_dir).unwrap();

        Fixture {
            templates: TemplateService::new(&templates_dir).unwrap(),
            _dir: dir,
            config,
        }
    }

    #[test]
    fn test_function_name_strips_braces_and_separators() {
        let fixture = fixture("x");
        let generator = FunctionGenerator::new(&fixture.templates, "ns", &fixture.config);
        assert_eq!(generator.function_name("get", "/users/{id}"), "get_users_id");
        assert_eq!(generator.function_name("post", "/v1.2/pets/"), "post_v1_2_pets");
    }

    #[test]
    fn test_long_names_are_truncated_with_digest_suffix() {
        let fixture = fixture("x");
        let generator = FunctionGenerator::new(&fixture.templates, "ns", &fixture.config);
        let path = format!("/{}", "segment/".repeat(20));
        let name = generator.function_name("get", &path);

        // namespace "ns" leaves a budget of 64 - 3 characters
        assert_eq!(name.chars().count(), 61);
        let (prefix, suffix) = name.rsplit_once('_').unwrap();
        assert_eq!(suffix.len(), 4);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert!(prefix.starts_with("get_segment"));

        // Stable across repeated calls
        assert_eq!(generator.function_name("get", &path), name);
    }

    #[test]
    fn test_different_long_paths_get_different_suffixes() {
        let fixture = fixture("x");
        let generator = FunctionGenerator::new(&fixture.templates, "ns", &fixture.config);
        let a = generator.function_name("get", &format!("/{}/a", "x".repeat(80)));
        let b = generator.function_name("get", &format!("/{}/b", "x".repeat(80)));
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_generate_writes_sorted_handlers() {
        let fixture = fixture("# {{ method }} {{ path }} via {{ base_url }}");
        let generator = FunctionGenerator::new(&fixture.templates, "ns", &fixture.config);
        let spec = Spec::parse(
            r#"{"paths": {
                "/zebras": {"get": {}},
                "/apes": {"get": {}, "parameters": []},
                "/apes/{id}": {"delete": {}}
            }}"#,
        )
        .unwrap();

        let names = generator
            .generate(&spec, &EndpointFilter::disabled(), "https://api.example.com")
            .await
            .unwrap();

        assert_eq!(names, vec!["delete_apes_id", "get_apes", "get_zebras"]);
        let handler = fixture.config.output_dir.join("lambdas").join("get_zebras.py");
        let content = std::fs::read_to_string(handler).unwrap();
        assert_eq!(content, "# get /zebras via https://api.example.com");
    }

    #[tokio::test]
    async fn test_generate_skips_unsupported_methods() {
        let fixture = fixture("x");
        let generator = FunctionGenerator::new(&fixture.templates, "ns", &fixture.config);
        let spec = Spec::parse(
            r#"{"paths": {"/users": {"options": {}, "trace": {}, "get": {}}}}"#,
        )
        .unwrap();

        let names = generator
            .generate(&spec, &EndpointFilter::disabled(), "https://x")
            .await
            .unwrap();
        assert_eq!(names, vec!["get_users"]);
    }

    #[tokio::test]
    async fn test_generate_applies_endpoint_filter() {
        let fixture = fixture("x");
        let generator = FunctionGenerator::new(&fixture.templates, "ns", &fixture.config);
        let spec = Spec::parse(
            r#"{"paths": {"/users": {"get": {}}, "/orders": {"get": {}}}}"#,
        )
        .unwrap();
        let filter = EndpointFilter::parse("paths:\n  - path: /users\n").unwrap();

        let names = generator.generate(&spec, &filter, "https://x").await.unwrap();
        assert_eq!(names, vec!["get_users"]);
    }

    #[tokio::test]
    async fn test_generate_without_paths_is_an_error() {
        let fixture = fixture("x");
        let generator = FunctionGenerator::new(&fixture.templates, "ns", &fixture.config);
        let spec = Spec::parse("{}").unwrap();
        let result = generator
            .generate(&spec, &EndpointFilter::disabled(), "https://x")
            .await;
        assert!(matches!(result, Err(Error::Spec(_))));
    }

    #[tokio::test]
    async fn test_preprocessor_context_splits_module() {
        let fixture = fixture("import {{ preprocessor }} -> {{ preprocessor_handler }}");
        let mut config = fixture.config.clone();
        config.auth_enabled = false;
        config.preprocessor = "hooks.custom.pre".to_string();
        let generator = FunctionGenerator::new(&fixture.templates, "ns", &config);
        let spec = Spec::parse(r#"{"paths": {"/a": {"get": {}}}}"#).unwrap();

        generator
            .generate(&spec, &EndpointFilter::disabled(), "https://x")
            .await
            .unwrap();

        let content =
            std::fs::read_to_string(config.output_dir.join("lambdas").join("get_a.py")).unwrap();
        assert_eq!(content, "import hooks.custom -> hooks.custom.pre");
    }
}
