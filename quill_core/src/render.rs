use bytes::Bytes;
use serde_json::{json, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize render context")]
    Context(#[from] serde_json::Error),

    #[error("template {0} failed: {1}")]
    Template(String, String),
}

/// Turns a template name and a context into output bytes.
///
/// The feed service only builds contexts; whatever markup the surrounding
/// application wants lives behind this trait.
pub trait Renderer: Send + Sync {
    fn render(&self, template: &str, context: &Value) -> Result<Bytes, RenderError>;
}

/// Renders `{"template": .., "context": ..}` as compact JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRenderer;

impl Renderer for JsonRenderer {
    fn render(&self, template: &str, context: &Value) -> Result<Bytes, RenderError> {
        let document = json!({
            "template": template,
            "context": context,
        });
        Ok(Bytes::from(serde_json::to_vec(&document)?))
    }
}
