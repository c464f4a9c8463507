//! Language model boundary for schema-conformant structured output.

use crate::router::domain::JsonSchema;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Request for one structured object.
#[derive(Debug, Clone, PartialEq)]
pub struct StructuredRequest {
    /// System instructions.
    pub system: String,
    /// User prompt.
    pub prompt: String,
    /// Name of the requested object type.
    pub schema_name: String,
    /// Schema the object must satisfy.
    pub schema: JsonSchema,
}

/// Model that returns JSON objects conforming to a schema.
#[async_trait]
pub trait StructuredModel: Send + Sync {
    /// Generates one object for `request`.
    ///
    /// Implementations are not required to validate the output; callers
    /// validate against `request.schema`.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError`] when the model cannot be reached or replies
    /// with something other than a JSON object.
    async fn generate_object(&self, request: StructuredRequest) -> Result<Value, ModelError>;
}

/// Errors returned by model adapters.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// No API credential is available.
    #[error("missing credential: environment variable {0} is not set")]
    MissingCredential(String),

    /// The HTTP exchange failed.
    #[error("model transport error: {0}")]
    Transport(Arc<dyn std::error::Error + Send + Sync>),

    /// The provider returned a non-success status.
    #[error("model provider returned status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body.
        body: String,
    },

    /// The reply did not contain a JSON object.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),
}

impl ModelError {
    /// Wraps a transport error.
    pub fn transport(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport(Arc::new(err))
    }
}
