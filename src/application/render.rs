//! Rendering seam.
//!
//! The template engine is an external collaborator; the gateway only needs a
//! body for the resolved state. [`JsonRenderer`] is the shipped default and
//! matches the fallback shape used for error bodies.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::response::ResponseData;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("render failed: {0}")]
    Failed(String),
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, data: &ResponseData) -> Result<String, RenderError>;
}

/// Serializes the response state as JSON.
pub struct JsonRenderer;

#[async_trait]
impl Renderer for JsonRenderer {
    async fn render(&self, data: &ResponseData) -> Result<String, RenderError> {
        serde_json::to_string(&data.state).map_err(|err| RenderError::Failed(err.to_string()))
    }
}
