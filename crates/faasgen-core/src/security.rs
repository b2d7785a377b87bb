//! Security scheme extraction and selection.
//!
//! Reads `components.securitySchemes` and the top-level `security` array from
//! a parsed spec, then deterministically picks at most one scheme to generate
//! credential-injection hooks for. Bearer auth is preferred over basic, basic
//! over API keys, and header-carried API keys over query or cookie ones.
//!
//! # Examples
//!
//! ```
//! use faasgen_core::security::{extract_security_schemes, global_security, select_security_scheme};
//! use faasgen_core::spec::Spec;
//!
//! # fn main() -> faasgen_core::Result<()> {
//! let spec = Spec::parse(r#"{
//!     "components": {"securitySchemes": {"bearer": {"type": "http", "scheme": "bearer"}}},
//!     "security": [{"bearer": []}]
//! }"#)?;
//! let schemes = extract_security_schemes(&spec);
//! let referenced = global_security(&spec);
//! let selected = select_security_scheme(&schemes, &referenced)?;
//! assert_eq!(selected.map(|s| s.name.as_str()), Some("bearer"));
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;

use crate::error::{Error, Result};
use crate::spec::Spec;

use serde::Serialize;
use serde_json::Value;

/// A security scheme declared in `components.securitySchemes`.
///
/// Unknown scheme types are captured as-is rather than dropped, so they can
/// participate in the only-unsupported-schemes error path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecurityScheme {
    /// Scheme identifier (the key in `securitySchemes`)
    pub name: String,
    /// Declared `type`: apiKey, http, mutualTLS, oauth2, openIdConnect, or anything else
    pub scheme_type: String,
    /// `name` attribute of an apiKey scheme (header/query/cookie parameter name)
    pub param_name: Option<String>,
    /// `in` attribute of an apiKey scheme
    pub location: Option<String>,
    /// `scheme` attribute of an http scheme (basic or bearer)
    pub http_scheme: Option<String>,
    /// `bearerFormat` attribute of an http bearer scheme
    pub bearer_format: Option<String>,
}

/// Extract all declared security schemes, keyed by name.
pub fn extract_security_schemes(spec: &Spec) -> BTreeMap<String, SecurityScheme> {
    let mut schemes = BTreeMap::new();
    let Some(declared) = spec.security_schemes() else {
        return schemes;
    };

    for (name, details) in declared {
        let scheme_type = details
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        schemes.insert(
            name.clone(),
            SecurityScheme {
                name: name.clone(),
                scheme_type,
                param_name: string_attr(details, "name"),
                location: string_attr(details, "in"),
                http_scheme: string_attr(details, "scheme"),
                bearer_format: string_attr(details, "bearerFormat"),
            },
        );
    }

    schemes
}

/// Flatten the top-level `security` array into the list of referenced scheme
/// names, preserving spec order and duplicates.
pub fn global_security(spec: &Spec) -> Vec<String> {
    let Some(requirements) = spec.global_security() else {
        return Vec::new();
    };

    let mut names = Vec::new();
    for requirement in requirements {
        if let Some(requirement) = requirement.as_object() {
            for name in requirement.keys() {
                names.push(name.clone());
            }
        }
    }
    names
}

/// Pick the scheme to generate auth hooks for, if any.
///
/// Referenced schemes that can be implemented are ranked and the best one
/// wins. When the global security block references only schemes requiring an
/// interactive flow (oauth2, openIdConnect), that is a hard error naming
/// them; a spec with no security at all selects nothing and generation
/// proceeds without auth.
pub fn select_security_scheme<'a>(
    schemes: &'a BTreeMap<String, SecurityScheme>,
    referenced: &[String],
) -> Result<Option<&'a SecurityScheme>> {
    if schemes.is_empty() || referenced.is_empty() {
        return Ok(None);
    }

    let mut best: Option<(u8, &SecurityScheme)> = None;
    let mut unsupported: Vec<String> = Vec::new();

    for name in referenced {
        let Some(scheme) = schemes.get(name) else {
            continue;
        };
        match priority(scheme) {
            Some(rank) => {
                // First reference wins a tie
                if best.map_or(true, |(current, _)| rank < current) {
                    best = Some((rank, scheme));
                }
            }
            None => {
                if matches!(scheme.scheme_type.as_str(), "oauth2" | "openIdConnect")
                    && !unsupported.contains(name)
                {
                    unsupported.push(name.clone());
                }
            }
        }
    }

    match best {
        Some((_, scheme)) => Ok(Some(scheme)),
        None if !unsupported.is_empty() => Err(Error::UnsupportedSecurityScheme(unsupported)),
        None => Ok(None),
    }
}

/// Scheme type in kebab case, for template contexts and resource names.
///
/// Breaks only on a lowercase-to-uppercase boundary, so an uppercase run
/// stays one word: `apiKey` -> `api-key`, `mutualTLS` -> `mutual-tls`.
pub fn type_kebab(scheme_type: &str) -> String {
    let mut kebab = String::with_capacity(scheme_type.len() + 2);
    let mut prev_lowercase = false;
    for c in scheme_type.chars() {
        if c.is_ascii_uppercase() {
            if prev_lowercase {
                kebab.push('-');
            }
            kebab.push(c.to_ascii_lowercase());
        } else {
            kebab.push(c);
        }
        prev_lowercase = c.is_ascii_lowercase();
    }
    kebab
}

fn priority(scheme: &SecurityScheme) -> Option<u8> {
    match scheme.scheme_type.as_str() {
        "http" => match scheme.http_scheme.as_deref() {
            Some("bearer") => Some(1),
            Some("basic") => Some(2),
            _ => None,
        },
        "apiKey" => match scheme.location.as_deref() {
            Some("header") => Some(3),
            Some("query") => Some(4),
            Some("cookie") => Some(5),
            _ => None,
        },
        "mutualTLS" => Some(6),
        _ => None,
    }
}

fn string_attr(details: &Value, key: &str) -> Option<String> {
    details.get(key).and_then(Value::as_str).map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scheme(name: &str, scheme_type: &str) -> SecurityScheme {
        SecurityScheme {
            name: name.to_string(),
            scheme_type: scheme_type.to_string(),
            param_name: None,
            location: None,
            http_scheme: None,
            bearer_format: None,
        }
    }

    fn http(name: &str, sub: &str) -> SecurityScheme {
        SecurityScheme {
            http_scheme: Some(sub.to_string()),
            ..scheme(name, "http")
        }
    }

    fn api_key(name: &str, location: &str) -> SecurityScheme {
        SecurityScheme {
            location: Some(location.to_string()),
            param_name: Some("X-API-Key".to_string()),
            ..scheme(name, "apiKey")
        }
    }

    fn map(schemes: Vec<SecurityScheme>) -> BTreeMap<String, SecurityScheme> {
        schemes.into_iter().map(|s| (s.name.clone(), s)).collect()
    }

    fn names(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn test_extract_captures_unknown_types() {
        let spec = Spec::parse(
            r#"{"components": {"securitySchemes": {
                "weird": {"type": "futuristic"},
                "key": {"type": "apiKey", "name": "X-Key", "in": "header"}
            }}}"#,
        )
        .unwrap();
        let schemes = extract_security_schemes(&spec);
        assert_eq!(schemes.len(), 2);
        assert_eq!(schemes["weird"].scheme_type, "futuristic");
        assert_eq!(schemes["key"].param_name.as_deref(), Some("X-Key"));
        assert_eq!(schemes["key"].location.as_deref(), Some("header"));
    }

    #[test]
    fn test_global_security_preserves_order_and_duplicates() {
        let spec = Spec::parse(
            r#"{"security": [{"b": []}, {"a": []}, {"b": []}]}"#,
        )
        .unwrap();
        assert_eq!(global_security(&spec), names(&["b", "a", "b"]));
    }

    #[test]
    fn test_select_empty_inputs_return_none() {
        let schemes = map(vec![http("bearer", "bearer")]);
        assert_eq!(
            select_security_scheme(&BTreeMap::new(), &names(&["bearer"])).unwrap(),
            None
        );
        assert_eq!(select_security_scheme(&schemes, &[]).unwrap(), None);
    }

    #[test]
    fn test_select_unreferenced_schemes_return_none() {
        let schemes = map(vec![http("bearer", "bearer")]);
        let selected = select_security_scheme(&schemes, &names(&["other"])).unwrap();
        assert_eq!(selected, None);
    }

    #[test]
    fn test_bearer_beats_basic() {
        let schemes = map(vec![http("basicauth", "basic"), http("bearerauth", "bearer")]);
        let selected = select_security_scheme(&schemes, &names(&["basicauth", "bearerauth"]))
            .unwrap()
            .unwrap();
        assert_eq!(selected.name, "bearerauth");
    }

    #[test]
    fn test_header_key_beats_query_key() {
        let schemes = map(vec![api_key("qkey", "query"), api_key("hkey", "header")]);
        let selected = select_security_scheme(&schemes, &names(&["qkey", "hkey"]))
            .unwrap()
            .unwrap();
        assert_eq!(selected.name, "hkey");
    }

    #[test]
    fn test_cookie_key_beats_mutual_tls() {
        let schemes = map(vec![scheme("mtls", "mutualTLS"), api_key("ckey", "cookie")]);
        let selected = select_security_scheme(&schemes, &names(&["mtls", "ckey"]))
            .unwrap()
            .unwrap();
        assert_eq!(selected.name, "ckey");
    }

    #[test]
    fn test_only_unsupported_schemes_is_an_error() {
        let schemes = map(vec![scheme("oauth", "oauth2"), scheme("oidc", "openIdConnect")]);
        let result = select_security_scheme(&schemes, &names(&["oauth", "oidc"]));
        match result {
            Err(Error::UnsupportedSecurityScheme(listed)) => {
                assert_eq!(listed, names(&["oauth", "oidc"]));
            }
            other => panic!("expected UnsupportedSecurityScheme, got {other:?}"),
        }
    }

    #[test]
    fn test_supported_scheme_wins_over_unsupported() {
        let schemes = map(vec![scheme("oauth", "oauth2"), http("bearer", "bearer")]);
        let selected = select_security_scheme(&schemes, &names(&["oauth", "bearer"]))
            .unwrap()
            .unwrap();
        assert_eq!(selected.name, "bearer");
    }

    #[test]
    fn test_unknown_types_are_silently_ignored() {
        let schemes = map(vec![scheme("weird", "futuristic")]);
        let selected = select_security_scheme(&schemes, &names(&["weird"])).unwrap();
        assert_eq!(selected, None);
    }

    #[test]
    fn test_selection_is_deterministic() {
        let schemes = map(vec![
            http("a", "bearer"),
            http("b", "bearer"),
            api_key("c", "header"),
        ]);
        let referenced = names(&["b", "a", "c"]);
        let first = select_security_scheme(&schemes, &referenced).unwrap().unwrap();
        for _ in 0..3 {
            let again = select_security_scheme(&schemes, &referenced).unwrap().unwrap();
            assert_eq!(again.name, first.name);
        }
        // First reference wins the tie between equal-priority bearer schemes
        assert_eq!(first.name, "b");
    }

    #[test]
    fn test_type_kebab() {
        assert_eq!(type_kebab("apiKey"), "api-key");
        assert_eq!(type_kebab("mutualTLS"), "mutual-tls");
        assert_eq!(type_kebab("http"), "http");
        assert_eq!(type_kebab("oauth2"), "oauth2");
    }
}
