//! OpenAPI spec loading and parsing.
//!
//! The spec is kept as raw `serde_json::Value` rather than a typed model:
//! generation only touches a handful of well-known fields, and an untyped
//! document tolerates the extensions and minor spec-version drift real API
//! descriptions carry. Loading dispatches on the location's URL scheme; a
//! `http://`/`https://` prefix fetches over HTTP, anything else is a file
//! path. Parsing tries JSON first and falls back to YAML.

use std::path::Path;

use crate::error::{Error, Result};

use serde_json::Value;
use tokio::fs;

/// A parsed OpenAPI document with accessors for the fields generation uses.
#[derive(Debug, Clone)]
pub struct Spec {
    document: Value,
}

impl Spec {
    /// Load and parse a spec from a local path or an HTTP(S) URL.
    pub async fn load(location: &str) -> Result<Self> {
        let content = if location.starts_with("http://") || location.starts_with("https://") {
            Self::fetch(location).await?
        } else {
            fs::read_to_string(Path::new(location)).await?
        };
        Self::parse(&content)
    }

    /// Parse spec content, trying JSON before YAML.
    ///
    /// The ordering matters for error reporting: content that is neither
    /// surfaces the YAML failure path as a single `InvalidSpec` error.
    pub fn parse(content: &str) -> Result<Self> {
        let document: Value = match serde_json::from_str(content) {
            Ok(document) => document,
            Err(_) => serde_yaml::from_str(content).map_err(|_| Error::InvalidSpec)?,
        };
        if !document.is_object() {
            return Err(Error::InvalidSpec);
        }
        Ok(Self { document })
    }

    async fn fetch(url: &str) -> Result<String> {
        log::info!("Downloading spec from {url}");
        let response = reqwest::get(url)
            .await
            .map_err(|e| Error::DownloadSpec(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::DownloadSpec(format!("{url} returned {status}")));
        }
        response
            .text()
            .await
            .map_err(|e| Error::DownloadSpec(e.to_string()))
    }

    /// The `paths` object, if present.
    pub fn paths(&self) -> Option<&serde_json::Map<String, Value>> {
        self.document.get("paths")?.as_object()
    }

    /// The `servers` array, if present.
    pub fn servers(&self) -> Option<&Vec<Value>> {
        self.document.get("servers")?.as_array()
    }

    /// The `components.securitySchemes` object, if present.
    pub fn security_schemes(&self) -> Option<&serde_json::Map<String, Value>> {
        self.document
            .get("components")?
            .get("securitySchemes")?
            .as_object()
    }

    /// The top-level `security` array, if present.
    pub fn global_security(&self) -> Option<&Vec<Value>> {
        self.document.get("security")?.as_array()
    }
}
