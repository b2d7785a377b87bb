//! Error handling for the faasgen code generation library.
//!
//! This module defines the main error type `Error` used throughout the library,
//! along with a convenient `Result` type alias. It uses `thiserror` for easy
//! error handling and implements conversions from common error types.
//!
//! Every error here is fatal: generation either completes for the whole
//! filtered endpoint set or aborts at the first failure.

use thiserror::Error;

/// Result type for faasgen generation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for faasgen generation operations
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// Template engine error
    #[error("Template engine error: {0}")]
    Tera(#[from] tera::Error),

    /// Template error
    #[error("Template error: {0}")]
    Template(String),

    /// Config file could not be found
    #[error("Config file not found: {0}")]
    ConfigFileNotFound(String),

    /// Config file is not valid TOML
    #[error("The config file isn't valid TOML: {0}")]
    InvalidConfig(String),

    /// Config key is not a known configuration value
    #[error("Unknown configuration value: {0}")]
    UnknownConfigValue(String),

    /// Config field failed validation
    #[error("Invalid value for {field}: {reason}")]
    InvalidConfigValue { field: String, reason: String },

    /// Spec content is neither valid JSON nor valid YAML
    #[error("The spec file isn't valid JSON or YAML")]
    InvalidSpec,

    /// Spec could not be downloaded
    #[error("Failed to download spec: {0}")]
    DownloadSpec(String),

    /// Spec is structurally unusable for generation
    #[error("OpenAPI error: {0}")]
    Spec(String),

    /// Config supplies a server variable the spec does not declare
    #[error("Unknown server variable '{name}', spec declares: [{}]", available.join(", "))]
    UnknownServerVariable {
        name: String,
        available: Vec<String>,
    },

    /// Spec server variable has neither a default nor a config override
    #[error("Server variable '{0}' has no default and no configured value")]
    MissingServerVariable(String),

    /// Global security references only unsupported scheme types
    #[error("Unsupported security schemes: {}", .0.join(", "))]
    UnsupportedSecurityScheme(Vec<String>),

    /// Endpoint filter file could not be found
    #[error("Endpoint filter file not found: {0}")]
    EndpointFilterFileNotFound(String),

    /// Endpoint filter file contains invalid YAML
    #[error("Invalid YAML in endpoint filter file: {0}")]
    EndpointFilterInvalidYaml(String),

    /// Endpoint filter file is empty or contains no filter criteria
    #[error("Endpoint filter file contains no filter criteria")]
    EndpointFilterEmpty,
}

impl Error {
    /// Create a new template error
    pub fn template<S: Into<String>>(msg: S) -> Self {
        Self::Template(msg.into())
    }

    /// Create a new spec structure error
    pub fn spec<S: Into<String>>(msg: S) -> Self {
        Self::Spec(msg.into())
    }

    /// Create a new field validation error
    pub fn invalid_value<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
