//! Tool execution port used after selection.

use crate::task::domain::ToolCall;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Runs selected tool calls.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Executes one call and returns its output.
    ///
    /// # Errors
    ///
    /// Returns [`ToolExecutionError`] when the tool is unknown or fails.
    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolExecutionError>;
}

/// Errors raised while executing a tool call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToolExecutionError {
    /// No tool is exposed under the name.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// The tool ran and failed.
    #[error("tool {tool_name} failed: {message}")]
    Failed {
        /// Tool that failed.
        tool_name: String,
        /// Failure description.
        message: String,
    },
}
