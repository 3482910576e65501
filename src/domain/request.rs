//! Inbound request model, normalized away from the transport.

use std::collections::BTreeMap;

use axum::http::Method;
use bytes::Bytes;

/// One normalized inbound request. Immutable once constructed.
#[derive(Debug, Clone)]
pub struct ServerRequest {
    pub method: Method,
    /// Path component, without the query string.
    pub path: String,
    /// Matched wildcard path parameter, when the route captured one.
    pub path_param: Option<String>,
    /// Query parameters; keys are unique.
    pub query: BTreeMap<String, String>,
    /// Raw request body.
    pub body: Bytes,
    /// Scheme and host of the inbound request, used when a relative redirect
    /// needs an absolute location.
    pub host_url: String,
}

impl ServerRequest {
    /// The slug this request resolves: the matched path parameter when
    /// present, otherwise the request path. Any query part is stripped.
    pub fn slug(&self) -> String {
        let raw = self.path_param.as_deref().unwrap_or(&self.path);
        raw.split_once('?').map_or(raw, |(path, _)| path).to_string()
    }

    /// The path with its query parameters reattached in canonical order.
    pub fn path_with_query(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = self
            .query
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{}", self.path, query)
    }

    /// Write requests skip rendering and return an empty body.
    pub fn is_mutating(&self) -> bool {
        !matches!(self.method, Method::GET | Method::HEAD)
    }
}
