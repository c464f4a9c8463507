//! Async handler traits plugged into the router.

use crate::router::context::AgentContext;
use crate::router::domain::AgentResult;
use crate::router::services::Next;
use async_trait::async_trait;
use serde_json::Value;

/// Terminal handler serving a path.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Serves the request described by `ctx` and returns the agent output.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::router::domain::RouterError`] when the agent fails,
    /// including errors propagated from sub-calls.
    async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value>;
}

/// Layer wrapping every handler whose path matches its pattern.
#[async_trait]
pub trait Middleware: Send + Sync {
    /// Handles the request, calling `next.run(ctx)` to continue the chain.
    ///
    /// Returning without calling `next` short-circuits the remaining layers
    /// and the handler.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::router::domain::RouterError`] to abort the request.
    async fn handle(&self, ctx: &mut AgentContext<'_>, next: Next<'_>) -> AgentResult<Value>;
}

/// Schema-validated tool handler.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Runs the tool with parameters that already passed schema validation.
    ///
    /// # Errors
    ///
    /// Returns a [`crate::router::domain::RouterError`] when the tool fails.
    async fn call(&self, ctx: &mut AgentContext<'_>, params: Value) -> AgentResult<Value>;
}
