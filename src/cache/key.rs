//! Cache key derivation.
//!
//! A key identifies one upstream resource: the logical resource type plus its
//! canonicalized query parameters, encoded into an opaque ASCII token. The
//! encoding is reversible, so distinct inputs always produce distinct keys.

use std::collections::BTreeMap;
use std::fmt;

use base64::{Engine, engine::general_purpose::STANDARD};

/// Opaque cache key for one `(resource type, params)` pair.
///
/// Usable as a map key or as an identifier handed to external systems.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApiCacheKey(String);

impl ApiCacheKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ApiCacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the cache key for a resource type and its query parameters.
///
/// Parameters are canonicalized with sorted keys and without percent-encoding,
/// so parameter insertion order never changes the key. Values must not contain
/// `&`, `=`, or `/`; that is a contract on callers, not validated here.
pub fn derive_key(resource_type: &str, params: &BTreeMap<String, String>) -> ApiCacheKey {
    let canonical = params
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<_>>()
        .join("&");

    ApiCacheKey(STANDARD.encode(format!("{resource_type}/{canonical}")))
}
