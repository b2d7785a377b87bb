//! Generation orchestration.
//!
//! Drives the whole pipeline for one run: load the spec, pick a security
//! scheme, render auth hooks, filter endpoints, resolve the base URL,
//! generate one handler per endpoint, and finish with the single infra file
//! describing them all. Fail-fast: the first error aborts the run.

use std::path::PathBuf;

use crate::auth::generate_auth_hooks;
use crate::config::Config;
use crate::endpoint_filter::EndpointFilter;
use crate::error::Result;
use crate::functions::FunctionGenerator;
use crate::iac::InfraGenerator;
use crate::security::{extract_security_schemes, global_security, select_security_scheme};
use crate::server_url::resolve_server_url;
use crate::spec::Spec;
use crate::template::TemplateService;

use tokio::fs;

/// Handler wired in by generated functions when auth hooks are produced
const AUTH_PREPROCESSOR: &str = "auth_hooks.preprocessor";

/// What a generation run produced.
#[derive(Debug)]
pub struct GenerationSummary {
    /// Sorted names of the generated functions
    pub functions: Vec<String>,
    /// Path of the rendered infra file
    pub infra_file: PathBuf,
    /// Path of the rendered auth hooks module, when one was generated
    pub auth_hooks_file: Option<PathBuf>,
}

/// Run the full generation pipeline for one namespace and spec.
pub async fn generate(
    namespace: &str,
    spec_location: &str,
    config: &Config,
) -> Result<GenerationSummary> {
    config.validate()?;
    fs::create_dir_all(&config.output_dir).await?;

    log::info!("Generating '{namespace}' from {spec_location}");
    let spec = Spec::load(spec_location).await?;
    let templates = TemplateService::new(&config.template_path)?;

    // Scheme selection only matters when auth hooks will be generated;
    // disabling auth also bypasses the unsupported-schemes error.
    let schemes = extract_security_schemes(&spec);
    let referenced = global_security(&spec);
    let selected = if config.auth_enabled {
        select_security_scheme(&schemes, &referenced)?
    } else {
        None
    };

    let mut effective = config.clone();
    let mut auth_hooks_file = None;
    if let Some(scheme) = selected {
        auth_hooks_file =
            Some(generate_auth_hooks(&templates, scheme, namespace, &config.output_dir).await?);
        effective.preprocessor = AUTH_PREPROCESSOR.to_string();
    }

    let filter = match &config.include_endpoints {
        Some(path) => EndpointFilter::load(path).await?,
        None => EndpointFilter::disabled(),
    };

    let base_url = resolve_server_url(&spec, config.server.as_ref())?;
    log::debug!("Resolved base URL: {base_url}");

    let functions = FunctionGenerator::new(&templates, namespace, &effective)
        .generate(&spec, &filter, &base_url)
        .await?;

    let infra_file = InfraGenerator::new(&templates, namespace, &effective)
        .generate(&functions, selected)
        .await?;

    Ok(GenerationSummary {
        functions,
        infra_file,
        auth_hooks_file,
    })
}
