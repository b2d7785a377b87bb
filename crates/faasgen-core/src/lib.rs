//! faasgen-core: generate serverless function handlers and matching
//! infrastructure-as-code from an OpenAPI specification.
//!
//! The pipeline: a layered [`config::Config`] (defaults, config file, CLI
//! overrides) drives [`generate::generate`], which loads the spec, selects a
//! security scheme for auth hooks, filters endpoints against an optional
//! allow-list, resolves the server URL, and renders one handler per endpoint
//! plus a single Terraform or CDK infra file via user-supplied Tera
//! templates.
//!
//! # Examples
//!
//! ```no_run
//! use faasgen_core::{generate, Config};
//!
//! # #[tokio::main]
//! # async fn main() -> faasgen_core::Result<()> {
//! let config = Config::load(None).await?;
//! let summary = generate("petstore", "openapi.yaml", &config).await?;
//! println!("generated {} functions", summary.functions.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod endpoint_filter;
pub mod error;
pub mod functions;
pub mod generate;
pub mod iac;
pub mod security;
pub mod server_url;
pub mod spec;
pub mod template;

pub use crate::config::{Config, ConfigOverrides, ServerOverride};
pub use crate::endpoint_filter::EndpointFilter;
pub use crate::error::{Error, Result};
pub use crate::generate::{generate, GenerationSummary};
pub use crate::iac::IacFormat;
pub use crate::security::SecurityScheme;
pub use crate::spec::Spec;
