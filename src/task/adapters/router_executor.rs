//! Tool executor backed by an [`AgentRouter`].

use crate::router::services::AgentRouter;
use crate::task::domain::ToolCall;
use crate::task::ports::{ToolExecutionError, ToolExecutor};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Runs selected tool calls through the router's tool catalog.
///
/// Tool names resolve to the concrete route they were published under; the
/// call is dispatched as a fresh top-level request with the arguments as
/// parameters.
#[derive(Debug, Clone)]
pub struct RouterToolExecutor {
    router: Arc<AgentRouter>,
}

impl RouterToolExecutor {
    /// Creates an executor over `router`.
    #[must_use]
    pub const fn new(router: Arc<AgentRouter>) -> Self {
        Self { router }
    }
}

#[async_trait]
impl ToolExecutor for RouterToolExecutor {
    async fn execute(&self, call: &ToolCall) -> Result<Value, ToolExecutionError> {
        let path = self
            .router
            .tool_path(&call.tool_name)
            .ok_or_else(|| ToolExecutionError::UnknownTool(call.tool_name.clone()))?;
        debug!(tool = %call.tool_name, %path, "executing tool call");

        self.router
            .invoke(&path, Value::Object(call.arguments.clone()))
            .await
            .map_err(|err| ToolExecutionError::Failed {
                tool_name: call.tool_name.clone(),
                message: err.to_string(),
            })
    }
}
