//! Configuration management for faasgen code generation.
//!
//! This module defines the `Config` struct and related functionality for
//! managing generation settings. Configuration is built in three layers:
//! defaults first, then a TOML config file, then CLI-supplied overrides.
//! Each field is validated on assignment by a dedicated validator so the
//! rules stay unit-testable in isolation.
//!
//! # Examples
//!
//! ```no_run
//! use faasgen_core::config::{Config, ConfigOverrides};
//!
//! # #[tokio::main]
//! # async fn main() -> faasgen_core::Result<()> {
//! let mut config = Config::load(None).await?;
//! config.merge(&ConfigOverrides {
//!     output_dir: Some("out".to_string()),
//!     ..Default::default()
//! })?;
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

// Internal imports (std, crate)
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::iac::IacFormat;

// External imports (alphabetized)
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::fs;

/// File name looked up when the config path is a directory or unset
pub const CONFIG_FILE_NAME: &str = "faasgen.toml";

/// Marker identifying the runtime/observability support layer in a layer ARN
pub const RUNTIME_LAYER_MARKER: &str = "lambdapowertools";

/// Well-known layer reference prepended when no runtime-support layer is configured
pub const DEFAULT_RUNTIME_LAYER: &str =
    "arn:aws:lambda:us-east-1:017000801446:layer:AWSLambdaPowertoolsPythonV3-python313-x86_64:18";

/// Upper bound on the credential TTL, keeping the seconds conversion in u32
pub const MAX_AUTH_TTL_MINUTES: u32 = u32::MAX / 60;

static SUBNET_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^subnet-[0-9a-f]+$").unwrap());

/// Server override from config: either a literal URL or a variable map.
///
/// The two forms are mutually exclusive, which the enum enforces by shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ServerOverride {
    /// Replace the spec's server URL outright
    Url(String),
    /// Substitute values for variables declared by the spec's server entry
    Variables(BTreeMap<String, String>),
}

/// Validated configuration for a generation run.
///
/// Immutable after `load` + `merge` + `validate`, apart from the
/// orchestrator wiring the generated auth preprocessor into its own copy.
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Output directory for generated artifacts, created if missing
    pub output_dir: PathBuf,

    /// Optional path to code bundled into the runtime layer; must exist
    pub bundle: Option<PathBuf>,

    /// Lambda layer ARNs; always contains a runtime-support layer entry
    pub layers: Vec<String>,

    /// Prefix for generated IAM role names
    pub iam_role_prefix: String,

    /// IAM permissions boundary attached to generated roles
    pub role_permissions_boundary: Option<String>,

    /// VPC subnet ids, each matching `subnet-<hex>`
    pub subnets: Vec<String>,

    /// VPC id; set together with `subnets` or not at all
    pub vpc_id: Option<String>,

    /// Resource tags applied to generated infrastructure
    pub tags: BTreeMap<String, String>,

    /// Root directory containing the generation templates
    pub template_path: PathBuf,

    /// Infrastructure output format
    pub iac: IacFormat,

    /// Custom preprocessor handler reference (`module.function`)
    pub preprocessor: String,

    /// Custom postprocessor handler reference (`module.function`)
    pub postprocessor: String,

    /// Whether auth hooks are generated for a selected security scheme
    pub auth_enabled: bool,

    /// Credential cache TTL in minutes; must be positive
    pub auth_ttl_minutes: u32,

    /// Optional server override applied during URL resolution
    pub server: Option<ServerOverride>,

    /// Path to the endpoint allow-list file, if filtering is wanted
    pub include_endpoints: Option<PathBuf>,

    /// Whether generated functions enable X-Ray tracing
    pub xray_tracing: bool,
}

/// CLI-supplied overrides, merged over file values with the falsy-skip
/// policy: `None`, empty strings, and `false` leave the field unchanged.
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    pub output_dir: Option<String>,
    pub layers: Option<String>,
    pub bundle: Option<String>,
    pub iac: Option<String>,
    pub server_url: Option<String>,
    pub include_endpoints: Option<String>,
    pub xray_tracing: Option<bool>,
    pub no_auth: Option<bool>,
}

impl Default for Config {
    fn default() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self {
            output_dir: cwd.join("output"),
            bundle: None,
            layers: validate_layers(Vec::new(), DEFAULT_RUNTIME_LAYER, RUNTIME_LAYER_MARKER),
            iam_role_prefix: String::new(),
            role_permissions_boundary: None,
            subnets: Vec::new(),
            vpc_id: None,
            tags: BTreeMap::new(),
            template_path: cwd.join("templates"),
            iac: IacFormat::default(),
            preprocessor: String::new(),
            postprocessor: String::new(),
            auth_enabled: true,
            auth_ttl_minutes: 5,
            server: None,
            include_endpoints: None,
            xray_tracing: false,
        }
    }
}

// Known top-level keys, in application order. `iac` comes first so the
// template_path check sees the configured format.
const KEY_ORDER: [&str; 17] = [
    "iac",
    "output_dir",
    "bundle",
    "layers",
    "iam_role_prefix",
    "role_permissions_boundary",
    "subnets",
    "vpc_id",
    "tags",
    "template_path",
    "preprocessor",
    "postprocessor",
    "auth_enabled",
    "auth_ttl_minutes",
    "server",
    "include_endpoints",
    "xray_tracing",
];

impl Config {
    /// Load configuration, starting from defaults and overlaying the file.
    ///
    /// File discovery: an explicit directory looks for `faasgen.toml` inside
    /// it, an explicit file path is used as-is, and both are fatal when
    /// missing. With no explicit path, a missing `faasgen.toml` in the
    /// current directory just means "use defaults".
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let mut config = Config::default();

        if let Some(file) = locate_config_file(path, &cwd)? {
            let content = fs::read_to_string(&file).await?;
            let base_dir = file.parent().map(Path::to_path_buf).unwrap_or(cwd);
            config.apply_file(&content, &base_dir)?;
        }

        Ok(config)
    }

    /// Overlay the parsed contents of a config file.
    ///
    /// Relative paths in the file resolve against `base_dir`, the directory
    /// containing the file.
    pub fn apply_file(&mut self, content: &str, base_dir: &Path) -> Result<()> {
        let value: toml::Value =
            toml::from_str(content).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        let table = match value {
            toml::Value::Table(table) => table,
            _ => return Err(Error::InvalidConfig("expected a table".to_string())),
        };

        let table = flatten_auth_table(table)?;

        for key in table.keys() {
            if !KEY_ORDER.contains(&key.as_str()) {
                return Err(Error::UnknownConfigValue(key.clone()));
            }
        }

        for key in KEY_ORDER {
            if let Some(value) = table.get(key) {
                self.set(key, value, base_dir)?;
            }
        }

        Ok(())
    }

    /// Overlay CLI overrides, skipping falsy values.
    ///
    /// The full server URL override is special-cased: when present it
    /// replaces any file-level variable map rather than merging with it.
    pub fn merge(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        let cwd = std::env::current_dir()?;

        if let Some(value) = nonempty(&overrides.output_dir) {
            self.set_output_dir(value)?;
        }
        if let Some(value) = nonempty(&overrides.layers) {
            self.layers =
                validate_layers(split_list(value), DEFAULT_RUNTIME_LAYER, RUNTIME_LAYER_MARKER);
        }
        if let Some(value) = nonempty(&overrides.bundle) {
            self.set_bundle(value, &cwd)?;
        }
        if let Some(value) = nonempty(&overrides.iac) {
            self.iac = value
                .parse()
                .map_err(|e: String| Error::invalid_value("iac", e))?;
        }
        if let Some(value) = nonempty(&overrides.include_endpoints) {
            self.include_endpoints = Some(absolute(Path::new(value), &cwd));
        }
        if overrides.xray_tracing == Some(true) {
            self.xray_tracing = true;
        }
        if overrides.no_auth == Some(true) {
            self.auth_enabled = false;
        }
        if let Some(value) = nonempty(&overrides.server_url) {
            self.server = Some(ServerOverride::Url(value.to_string()));
        }

        Ok(())
    }

    /// Check the cross-field invariants and the template directory contents.
    pub fn validate(&self) -> Result<()> {
        if self.subnets.is_empty() != self.vpc_id.is_none() {
            return Err(Error::invalid_value(
                "subnets",
                "subnets and vpc_id must be set together or not at all",
            ));
        }
        if self.auth_enabled && !self.preprocessor.is_empty() {
            return Err(Error::invalid_value(
                "preprocessor",
                "auth_enabled and a custom preprocessor are mutually exclusive",
            ));
        }
        if self.auth_ttl_minutes == 0 {
            return Err(Error::invalid_value(
                "auth_ttl_minutes",
                "must be a positive integer",
            ));
        }
        let infra_template = self.template_path.join(self.iac.template_name());
        if !infra_template.is_file() {
            return Err(Error::invalid_value(
                "template_path",
                format!("infra template not found: {}", infra_template.display()),
            ));
        }
        Ok(())
    }

    /// Credential cache TTL as passed to the infra template, in seconds.
    pub fn auth_ttl_seconds(&self) -> u32 {
        self.auth_ttl_minutes * 60
    }

    fn set(&mut self, key: &str, value: &toml::Value, base_dir: &Path) -> Result<()> {
        match key {
            "output_dir" => {
                let dir = expect_str(key, value)?;
                self.set_output_dir(dir)?;
            }
            "bundle" => {
                let path = expect_str(key, value)?;
                self.set_bundle(path, base_dir)?;
            }
            "layers" => {
                let entries = expect_string_list(key, value)?;
                self.layers =
                    validate_layers(entries, DEFAULT_RUNTIME_LAYER, RUNTIME_LAYER_MARKER);
            }
            "iam_role_prefix" => self.iam_role_prefix = expect_str(key, value)?.to_string(),
            "role_permissions_boundary" => {
                self.role_permissions_boundary = Some(expect_str(key, value)?.to_string());
            }
            "subnets" => {
                let entries = expect_string_list(key, value)?;
                self.subnets = validate_subnets(entries)?;
            }
            "vpc_id" => self.vpc_id = Some(expect_str(key, value)?.to_string()),
            "tags" => self.tags = expect_string_table(key, value)?,
            "template_path" => {
                let path = expect_str(key, value)?;
                self.template_path = absolute(Path::new(path), base_dir);
            }
            "iac" => {
                let format = expect_str(key, value)?;
                self.iac = format
                    .parse()
                    .map_err(|e: String| Error::invalid_value(key, e))?;
            }
            "preprocessor" => self.preprocessor = expect_str(key, value)?.to_string(),
            "postprocessor" => self.postprocessor = expect_str(key, value)?.to_string(),
            "auth_enabled" => self.auth_enabled = expect_bool(key, value)?,
            "auth_ttl_minutes" => {
                let ttl = expect_int(key, value)?;
                if ttl <= 0 || ttl > i64::from(MAX_AUTH_TTL_MINUTES) {
                    return Err(Error::invalid_value(
                        key,
                        format!("must be between 1 and {MAX_AUTH_TTL_MINUTES}"),
                    ));
                }
                self.auth_ttl_minutes = ttl as u32;
            }
            "server" => self.server = Some(parse_server_override(value)?),
            "include_endpoints" => {
                let path = expect_str(key, value)?;
                self.include_endpoints = Some(absolute(Path::new(path), base_dir));
            }
            "xray_tracing" => self.xray_tracing = expect_bool(key, value)?,
            _ => return Err(Error::UnknownConfigValue(key.to_string())),
        }
        Ok(())
    }

    fn set_output_dir(&mut self, dir: &str) -> Result<()> {
        let cwd = std::env::current_dir()?;
        let path = absolute(Path::new(dir), &cwd);
        std::fs::create_dir_all(&path)?;
        self.output_dir = path.canonicalize()?;
        Ok(())
    }

    fn set_bundle(&mut self, path: &str, base_dir: &Path) -> Result<()> {
        let path = absolute(Path::new(path), base_dir);
        let resolved = path.canonicalize().map_err(|_| {
            Error::invalid_value("bundle", format!("path does not exist: {}", path.display()))
        })?;
        self.bundle = Some(resolved);
        Ok(())
    }
}

/// Resolve the config file to read, if any.
///
/// Returns `Ok(None)` only for the implicit current-directory lookup; an
/// explicitly named file or directory that is missing is fatal.
pub fn locate_config_file(explicit: Option<&Path>, cwd: &Path) -> Result<Option<PathBuf>> {
    match explicit {
        Some(path) => {
            let file = if path.is_dir() {
                path.join(CONFIG_FILE_NAME)
            } else {
                path.to_path_buf()
            };
            if !file.is_file() {
                return Err(Error::ConfigFileNotFound(file.display().to_string()));
            }
            Ok(Some(file))
        }
        None => {
            let file = cwd.join(CONFIG_FILE_NAME);
            if file.is_file() {
                Ok(Some(file))
            } else {
                Ok(None)
            }
        }
    }
}

/// Normalize a layer list, prepending the default runtime-support layer when
/// no entry carries the marker. Idempotent once the marker is present.
pub fn validate_layers(entries: Vec<String>, default_layer: &str, marker: &str) -> Vec<String> {
    let mut layers: Vec<String> = entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect();

    let has_runtime_layer = layers
        .iter()
        .any(|entry| entry.to_lowercase().contains(marker));
    if !has_runtime_layer {
        layers.insert(0, default_layer.to_string());
    }

    layers
}

/// Check each subnet id against the `subnet-<hex>` pattern.
pub fn validate_subnets(entries: Vec<String>) -> Result<Vec<String>> {
    let subnets: Vec<String> = entries
        .into_iter()
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect();

    for subnet in &subnets {
        if !SUBNET_RE.is_match(subnet) {
            return Err(Error::invalid_value(
                "subnets",
                format!("'{subnet}' does not match subnet-<hex>"),
            ));
        }
    }

    Ok(subnets)
}

/// Split a comma-separated list, trimming entries and dropping empties.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|entry| entry.trim().to_string())
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn absolute(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn nonempty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Flatten an `[auth]` sub-table into top-level keys before field application.
fn flatten_auth_table(mut table: toml::value::Table) -> Result<toml::value::Table> {
    let Some(auth) = table.remove("auth") else {
        return Ok(table);
    };
    let auth = match auth {
        toml::Value::Table(auth) => auth,
        _ => return Err(Error::invalid_value("auth", "expected a table")),
    };
    for (key, value) in auth {
        match key.as_str() {
            "enabled" => {
                table.insert("auth_enabled".to_string(), value);
            }
            "ttl_minutes" => {
                table.insert("auth_ttl_minutes".to_string(), value);
            }
            _ => return Err(Error::UnknownConfigValue(format!("auth.{key}"))),
        }
    }
    Ok(table)
}

fn parse_server_override(value: &toml::Value) -> Result<ServerOverride> {
    let table = value
        .as_table()
        .ok_or_else(|| Error::invalid_value("server", "expected a table"))?;

    let url = table.get("url");
    let variables = table.get("variables");

    for key in table.keys() {
        if key != "url" && key != "variables" {
            return Err(Error::UnknownConfigValue(format!("server.{key}")));
        }
    }

    match (url, variables) {
        (Some(_), Some(_)) => Err(Error::invalid_value(
            "server",
            "url and variables are mutually exclusive",
        )),
        (Some(url), None) => {
            let url = url
                .as_str()
                .ok_or_else(|| Error::invalid_value("server.url", "expected a string"))?;
            Ok(ServerOverride::Url(url.to_string()))
        }
        (None, Some(variables)) => {
            let variables = expect_string_table("server.variables", variables)?;
            Ok(ServerOverride::Variables(variables))
        }
        (None, None) => Err(Error::invalid_value(
            "server",
            "expected either url or variables",
        )),
    }
}

fn expect_str<'a>(key: &str, value: &'a toml::Value) -> Result<&'a str> {
    value
        .as_str()
        .ok_or_else(|| Error::invalid_value(key, format!("expected a string, got {}", value.type_str())))
}

fn expect_bool(key: &str, value: &toml::Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| Error::invalid_value(key, format!("expected a boolean, got {}", value.type_str())))
}

fn expect_int(key: &str, value: &toml::Value) -> Result<i64> {
    value
        .as_integer()
        .ok_or_else(|| Error::invalid_value(key, format!("expected an integer, got {}", value.type_str())))
}

/// Accept either a comma-separated string or a list of strings.
fn expect_string_list(key: &str, value: &toml::Value) -> Result<Vec<String>> {
    match value {
        toml::Value::String(raw) => Ok(split_list(raw)),
        toml::Value::Array(entries) => entries
            .iter()
            .map(|entry| entry.as_str().map(String::from).ok_or_else(|| {
                Error::invalid_value(key, "expected a list of strings")
            }))
            .collect(),
        _ => Err(Error::invalid_value(
            key,
            format!("expected a string or list, got {}", value.type_str()),
        )),
    }
}

fn expect_string_table(key: &str, value: &toml::Value) -> Result<BTreeMap<String, String>> {
    let table = value
        .as_table()
        .ok_or_else(|| Error::invalid_value(key, format!("expected a table, got {}", value.type_str())))?;
    table
        .iter()
        .map(|(k, v)| {
            let v = v
                .as_str()
                .ok_or_else(|| Error::invalid_value(key, format!("expected a string for '{k}'")))?;
            Ok((k.clone(), v.to_string()))
        })
        .collect()
}
