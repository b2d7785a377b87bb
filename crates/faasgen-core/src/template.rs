//! Template rendering service built on Tera.
//!
//! Loads every `.tera` file under the configured template root once, then
//! renders by template name. Template text is user-supplied; this service
//! only guarantees that a named template exists before rendering it.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

use tera::{Context, Tera};

/// Renders named templates from a directory of `.tera` files.
#[derive(Debug)]
pub struct TemplateService {
    tera: Tera,
    root: PathBuf,
}

impl TemplateService {
    /// Load all templates under `template_path` (recursively).
    pub fn new(template_path: &Path) -> Result<Self> {
        let pattern = format!("{}/**/*.tera", template_path.display());
        let tera = Tera::new(&pattern)?;
        log::debug!(
            "Loaded {} templates from {}",
            tera.get_template_names().count(),
            template_path.display()
        );
        Ok(Self {
            tera,
            root: template_path.to_path_buf(),
        })
    }

    /// Whether a template with the given name was loaded.
    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    /// Render a named template with the given context.
    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        if !self.has_template(name) {
            return Err(Error::template(format!(
                "template '{}' not found in {}",
                name,
                self.root.display()
            )));
        }
        Ok(self.tera.render(name, context)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_renders_loaded_template() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("greeting.tera"), "hello {{ name }}").unwrap();
        let service = TemplateService::new(dir.path()).unwrap();

        let mut context = Context::new();
        context.insert("name", "world");
        assert_eq!(service.render("greeting.tera", &context).unwrap(), "hello world");
    }

    #[test]
    fn test_missing_template_is_an_error() {
        let dir = tempdir().unwrap();
        let service = TemplateService::new(dir.path()).unwrap();
        let result = service.render("absent.tera", &Context::new());
        assert!(matches!(result, Err(Error::Template(_))));
    }

    #[test]
    fn test_loads_nested_templates() {
        let dir = tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("infra")).unwrap();
        std::fs::write(dir.path().join("infra").join("main.tf.tera"), "x").unwrap();
        let service = TemplateService::new(dir.path()).unwrap();
        assert!(service.has_template("infra/main.tf.tera"));
    }
}
