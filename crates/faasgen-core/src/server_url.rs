//! Server URL resolution.
//!
//! Resolves the base URL generated functions call, from the spec's first
//! `servers` entry plus the optional config-level override. A literal URL
//! override short-circuits everything; a variable-map override is validated
//! against the variables the spec actually declares before substitution.

use std::collections::BTreeMap;

use crate::config::ServerOverride;
use crate::error::{Error, Result};
use crate::spec::Spec;

use serde_json::Value;

/// Resolve the base URL for generated functions.
pub fn resolve_server_url(spec: &Spec, overrides: Option<&ServerOverride>) -> Result<String> {
    if let Some(ServerOverride::Url(url)) = overrides {
        return Ok(url.clone());
    }

    let server = spec
        .servers()
        .and_then(|servers| servers.first())
        .ok_or_else(|| Error::spec("spec declares no servers"))?;
    let base_url = server
        .get("url")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::spec("server entry has no url"))?;

    let empty = BTreeMap::new();
    let config_variables = match overrides {
        Some(ServerOverride::Variables(variables)) => variables,
        _ => &empty,
    };

    let declared = server.get("variables").and_then(Value::as_object);
    let Some(declared) = declared else {
        // Nothing to substitute; overriding a variable here is a config error
        if let Some(name) = config_variables.keys().next() {
            return Err(Error::UnknownServerVariable {
                name: name.clone(),
                available: Vec::new(),
            });
        }
        return Ok(base_url.to_string());
    };

    for name in config_variables.keys() {
        if !declared.contains_key(name) {
            return Err(Error::UnknownServerVariable {
                name: name.clone(),
                available: declared.keys().cloned().collect(),
            });
        }
    }

    let mut resolved = base_url.to_string();
    for (name, details) in declared {
        let value = match config_variables.get(name) {
            Some(value) => value.clone(),
            None => details
                .get("default")
                .and_then(Value::as_str)
                .map(String::from)
                .ok_or_else(|| Error::MissingServerVariable(name.clone()))?,
        };
        resolved = resolved.replace(&format!("{{{name}}}"), &value);
    }

    Ok(resolved)
}
