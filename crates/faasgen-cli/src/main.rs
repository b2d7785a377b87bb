//! faasgen command-line interface.

use std::path::PathBuf;
use std::process::exit;

use anyhow::Context;
use clap::Parser;
use faasgen_core::{generate, Config, ConfigOverrides, Error};
use tracing_subscriber::EnvFilter;

/// Generate serverless function handlers and infrastructure-as-code from an
/// OpenAPI specification.
#[derive(Parser, Debug)]
#[command(name = "faasgen", version, about)]
struct Cli {
    /// Namespace prefixed to every generated resource name
    namespace: String,

    /// Path or URL of the OpenAPI spec (JSON or YAML)
    spec: String,

    /// Config file, or a directory containing faasgen.toml
    #[arg(long, value_name = "PATH")]
    config_file: Option<PathBuf>,

    /// Directory generated artifacts are written to
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// Comma-separated Lambda layer ARNs
    #[arg(long)]
    layers: Option<String>,

    /// Path to code bundled into the runtime layer
    #[arg(long, value_name = "PATH")]
    bundle: Option<String>,

    /// Infrastructure output format: terraform or cdk
    #[arg(long, value_name = "FORMAT")]
    iac: Option<String>,

    /// Replace the spec's server URL outright
    #[arg(long, value_name = "URL")]
    server_url: Option<String>,

    /// Endpoint allow-list YAML file
    #[arg(long, value_name = "PATH")]
    include_endpoints: Option<String>,

    /// Skip auth hook generation even when the spec declares security
    #[arg(long)]
    no_auth: bool,

    /// Enable X-Ray tracing on generated functions
    #[arg(long)]
    xray: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    if let Some(server_url) = &cli.server_url {
        url::Url::parse(server_url)
            .with_context(|| format!("invalid --server-url '{server_url}'"))?;
    }

    let mut config = Config::load(cli.config_file.as_deref())
        .await
        .context("failed to load configuration")?;
    config
        .merge(&ConfigOverrides {
            output_dir: cli.output_dir,
            layers: cli.layers,
            bundle: cli.bundle,
            iac: cli.iac,
            server_url: cli.server_url,
            include_endpoints: cli.include_endpoints,
            xray_tracing: cli.xray.then_some(true),
            no_auth: cli.no_auth.then_some(true),
        })
        .context("failed to apply command-line overrides")?;

    match generate(&cli.namespace, &cli.spec, &config).await {
        Ok(summary) => {
            tracing::info!(
                "Generated {} functions and {}",
                summary.functions.len(),
                summary.infra_file.display()
            );
            Ok(())
        }
        Err(Error::UnsupportedSecurityScheme(names)) => {
            tracing::error!(
                "Cannot generate auth hooks: spec only references unsupported security schemes: {}",
                names.join(", ")
            );
            tracing::error!("Disable auth ([auth] enabled = false, or --no-auth) to generate anyway");
            exit(1);
        }
        Err(e) => Err(e).context("generation failed"),
    }
}
