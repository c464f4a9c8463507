//! Classification port mapping events onto tasks.

use super::ModelError;
use crate::router::domain::SchemaViolations;
use crate::task::domain::{CanonicalEvent, ClassificationResult, TaskSummary};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Input to one classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRequest {
    /// Event being classified.
    pub event: CanonicalEvent,
    /// Recent tasks offered as context.
    pub recent_tasks: Vec<TaskSummary>,
    /// Reference time for relative scheduling.
    pub now: DateTime<Utc>,
}

/// Decides which tasks an event creates or relates to.
#[async_trait]
pub trait TaskClassifier: Send + Sync {
    /// Classifies one event. No retries are attempted.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError`] when the model fails or its output
    /// does not satisfy the result schema.
    async fn classify(
        &self,
        request: ClassificationRequest,
    ) -> Result<ClassificationResult, ClassificationError>;
}

/// Errors raised by classifiers and tool selectors.
#[derive(Debug, Clone, Error)]
pub enum ClassificationError {
    /// The model call failed.
    #[error(transparent)]
    Model(#[from] ModelError),

    /// The model output violated the result schema.
    #[error("model output failed schema validation: {0}")]
    SchemaMismatch(SchemaViolations),

    /// The model output could not be decoded.
    #[error("model output could not be decoded: {0}")]
    InvalidOutput(String),

    /// A prompt template failed to render.
    #[error("prompt rendering failed: {0}")]
    Prompt(String),

    /// The selection named a tool outside the catalog.
    #[error("model selected unknown tool: {0}")]
    UnknownTool(String),

    /// The call did not finish in time.
    #[error("model call timed out after {0:?}")]
    Timeout(Duration),
}
