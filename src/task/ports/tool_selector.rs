//! Tool selection port.

use super::ClassificationError;
use crate::router::domain::ToolDescriptor;
use crate::task::domain::{Task, ToolSelection};
use async_trait::async_trait;

/// Chooses the tool calls that accomplish a task.
#[async_trait]
pub trait ToolSelector: Send + Sync {
    /// Selects an ordered, possibly empty list of calls from `tools`.
    ///
    /// # Errors
    ///
    /// Returns [`ClassificationError`] when the model fails, its output is
    /// malformed, or it names a tool outside `tools`.
    async fn select(
        &self,
        task: &Task,
        tools: &[ToolDescriptor],
    ) -> Result<ToolSelection, ClassificationError>;
}
