//! Infrastructure-as-code output formats and the infra file generator.
//!
//! One infra file is rendered per run, describing every generated function
//! plus the auth wiring. The format decides which template renders and what
//! the output file is called; the context is shared between formats.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::config::Config;
use crate::error::Result;
use crate::security::{type_kebab, SecurityScheme};
use crate::template::TemplateService;

use serde::Serialize;
use tera::Context;
use tokio::fs;

/// Supported infrastructure output formats.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IacFormat {
    #[default]
    Terraform,
    Cdk,
}

impl IacFormat {
    /// String form, matching the config/CLI value.
    pub fn as_str(&self) -> &'static str {
        match self {
            IacFormat::Terraform => "terraform",
            IacFormat::Cdk => "cdk",
        }
    }

    /// Template rendered for this format.
    pub fn template_name(&self) -> &'static str {
        match self {
            IacFormat::Terraform => "main.tf.tera",
            IacFormat::Cdk => "construct.py.tera",
        }
    }

    /// Name of the rendered output file.
    pub fn output_name(&self) -> &'static str {
        match self {
            IacFormat::Terraform => "main.tf",
            IacFormat::Cdk => "construct.py",
        }
    }

    /// All supported formats.
    pub fn all() -> &'static [IacFormat] {
        &[IacFormat::Terraform, IacFormat::Cdk]
    }
}

impl FromStr for IacFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "terraform" => Ok(IacFormat::Terraform),
            "cdk" => Ok(IacFormat::Cdk),
            _ => Err(format!("unknown IaC format '{s}', expected terraform or cdk")),
        }
    }
}

impl fmt::Display for IacFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Renders the single infra file for a generation run.
pub struct InfraGenerator<'a> {
    templates: &'a TemplateService,
    namespace: &'a str,
    config: &'a Config,
}

impl<'a> InfraGenerator<'a> {
    pub fn new(templates: &'a TemplateService, namespace: &'a str, config: &'a Config) -> Self {
        Self {
            templates,
            namespace,
            config,
        }
    }

    /// Render and write the infra file, returning its path.
    ///
    /// `lambdas` is the sorted function-name list; `auth_scheme` is the
    /// selected security scheme, if auth hooks were generated.
    pub async fn generate(
        &self,
        lambdas: &[String],
        auth_scheme: Option<&SecurityScheme>,
    ) -> Result<PathBuf> {
        let context = self.build_context(lambdas, auth_scheme);
        let rendered = self
            .templates
            .render(self.config.iac.template_name(), &context)?;

        let output = self.config.output_dir.join(self.config.iac.output_name());
        fs::write(&output, rendered).await?;
        log::info!("Generated {}", output.display());
        Ok(output)
    }

    fn build_context(&self, lambdas: &[String], auth_scheme: Option<&SecurityScheme>) -> Context {
        let mut context = Context::new();
        context.insert("auth_enabled", &auth_scheme.is_some());
        context.insert(
            "auth_scheme_name",
            &auth_scheme.map(|scheme| scheme.name.as_str()),
        );
        context.insert(
            "auth_scheme_type",
            &auth_scheme.map(|scheme| type_kebab(&scheme.scheme_type)),
        );
        context.insert("auth_ttl", &self.config.auth_ttl_seconds());
        context.insert("bundle", &self.config.bundle);
        context.insert("iam_role_prefix", &self.config.iam_role_prefix);
        context.insert("lambdas", &lambdas);
        context.insert("layers", &self.config.layers);
        context.insert("namespace", &self.namespace);
        context.insert(
            "role_permissions_boundary",
            &self.config.role_permissions_boundary,
        );
        context.insert("subnets", &self.config.subnets);
        context.insert("tags", &self.config.tags);
        context.insert("vpc_id", &self.config.vpc_id);
        context.insert("xray_tracing", &self.config.xray_tracing);
        context
    }
}
