//! Per-request response state.
//!
//! `ResponseData` is the accumulating result bag for one request: created
//! fresh, owned exclusively by the pipeline invocation that created it, and
//! discarded once the response is written. `ResolvedContent` is the same
//! state shape as stored in the response cache.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error carried as data through the pipeline rather than propagated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{message}")]
#[serde(rename_all = "camelCase")]
pub struct ContentError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    #[serde(default)]
    pub message: String,
}

impl ContentError {
    pub fn with_status(status_code: u16, message: impl Into<String>) -> Self {
        Self {
            status_code: Some(status_code),
            message: message.into(),
        }
    }

    /// Resolved status code, defaulting to 500.
    pub fn status(&self) -> u16 {
        self.status_code.unwrap_or(500)
    }
}

/// Routing state accumulated while resolving one request.
///
/// Every field is optional; the default is an empty success state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResponseState {
    /// Redirect path or absolute URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    /// Status code override for the outgoing response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_code: Option<u16>,
    /// Error carried as data; selects the error branch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ContentError>,
    /// Extra response headers.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
    /// Routing metadata, e.g. the selected template name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<serde_json::Value>,
    /// Resolved content payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
    /// Expiry hint override, in seconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_seconds: Option<u64>,
}

/// The pipeline's accumulating result for one request.
#[derive(Debug, Clone, Default)]
pub struct ResponseData {
    pub state: ResponseState,
}

impl ResponseData {
    pub fn from_state(state: ResponseState) -> Self {
        Self { state }
    }
}

/// Parsed upstream payload as stored in the response cache.
///
/// Entries carry no intrinsic TTL: expiry is driven entirely by explicit
/// invalidation, never by entry age.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedContent {
    pub state: ResponseState,
}

impl ResolvedContent {
    pub fn to_response_data(&self) -> ResponseData {
        ResponseData {
            state: self.state.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_error_defaults_to_500() {
        let error = ContentError {
            status_code: None,
            message: "boom".to_string(),
        };
        assert_eq!(error.status(), 500);
        assert_eq!(ContentError::with_status(404, "missing").status(), 404);
    }

    #[test]
    fn state_parses_wire_shape() {
        let state: ResponseState = serde_json::from_str(
            r#"{"error":{"statusCode":404,"message":"not found"},"meta":{"template":"error"}}"#,
        )
        .expect("state parses");
        let error = state.error.expect("error present");
        assert_eq!(error.status(), 404);
        assert_eq!(state.meta.expect("meta present")["template"], "error");
    }

    #[test]
    fn empty_state_serializes_to_empty_object() {
        let state = ResponseState::default();
        assert_eq!(
            serde_json::to_string(&state).expect("state serializes"),
            "{}"
        );
    }
}
