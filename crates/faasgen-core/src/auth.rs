//! Auth hook generation.
//!
//! When auth is enabled and a security scheme was selected, one preprocessor
//! module implementing that scheme's credential injection is rendered into
//! the shared layer directory. The rendered module exposes a `preprocessor`
//! function the generated handlers wire in before each request.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::security::{type_kebab, SecurityScheme};
use crate::template::TemplateService;

use tera::Context;
use tokio::fs;

/// Render `auth_hooks.py` for the selected scheme into `<output>/layer/`.
///
/// Overwrites any previous run's output.
pub async fn generate_auth_hooks(
    templates: &TemplateService,
    scheme: &SecurityScheme,
    namespace: &str,
    output_dir: &Path,
) -> Result<PathBuf> {
    let mut context = Context::new();
    context.insert("namespace", &namespace);
    context.insert("scheme_name", &scheme.name);
    context.insert("scheme_type", &scheme.scheme_type);
    context.insert("scheme_type_kebab", &type_kebab(&scheme.scheme_type));
    context.insert("scheme_scheme", &scheme.http_scheme);
    context.insert("scheme_location", &scheme.location);
    context.insert("scheme_param_name", &scheme.param_name);
    context.insert("scheme_bearer_format", &scheme.bearer_format);

    let rendered = templates.render("auth_hooks.py.tera", &context)?;

    let layer_dir = output_dir.join("layer");
    fs::create_dir_all(&layer_dir).await?;
    let output = layer_dir.join("auth_hooks.py");
    fs::write(&output, rendered).await?;
    log::info!(
        "Generated auth hooks for scheme '{}' ({})",
        scheme.name,
        scheme.scheme_type
    );
    Ok(output)
}
