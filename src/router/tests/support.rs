//! Small agents and middleware shared by the dispatch tests.

use crate::router::context::AgentContext;
use crate::router::domain::{AgentResult, RouterError};
use crate::router::ports::{Agent, Middleware, ToolHandler};
use crate::router::services::Next;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};

/// Shared, ordered record of handler activity.
#[derive(Debug, Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().expect("trace lock").push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("trace lock").clone()
    }
}

/// Returns a fixed value and records its label.
pub struct Fixed {
    pub label: &'static str,
    pub trace: Trace,
}

#[async_trait]
impl Agent for Fixed {
    async fn run(&self, _ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        self.trace.push(self.label);
        Ok(json!({ "handled_by": self.label }))
    }
}

/// Echoes the request parameters and captured path parameters.
pub struct Echo;

#[async_trait]
impl Agent for Echo {
    async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        Ok(json!({
            "params": ctx.params().cloned().unwrap_or(Value::Null),
            "path_params": ctx.path_params(),
            "path": ctx.current_path(),
            "depth": ctx.call_depth(),
        }))
    }
}

/// Calls another agent and returns its output.
pub struct Delegate {
    pub target: &'static str,
}

#[async_trait]
impl Agent for Delegate {
    async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        ctx.call_agent(self.target, Some(json!({ "from": ctx.current_path() })))
            .await
    }
}

/// Calls itself until the router refuses.
pub struct Recursive;

#[async_trait]
impl Agent for Recursive {
    async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        let path = ctx.current_path().to_owned();
        ctx.call_agent(&path, None).await
    }
}

/// Always fails.
pub struct Failing;

#[async_trait]
impl Agent for Failing {
    async fn run(&self, _ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        Err(RouterError::Handler("boom".to_owned()))
    }
}

/// Records entry and exit around the rest of the chain.
pub struct Around {
    pub label: &'static str,
    pub trace: Trace,
}

#[async_trait]
impl Middleware for Around {
    async fn handle(&self, ctx: &mut AgentContext<'_>, next: Next<'_>) -> AgentResult<Value> {
        self.trace.push(format!("{}:before", self.label));
        let result = next.run(ctx).await;
        self.trace.push(format!("{}:after", self.label));
        result
    }
}

/// Answers without calling the rest of the chain.
pub struct ShortCircuit;

#[async_trait]
impl Middleware for ShortCircuit {
    async fn handle(&self, _ctx: &mut AgentContext<'_>, _next: Next<'_>) -> AgentResult<Value> {
        Ok(json!({ "blocked": true }))
    }
}

/// Stores a value in request state before continuing.
pub struct SetState {
    pub key: &'static str,
    pub value: Value,
}

#[async_trait]
impl Middleware for SetState {
    async fn handle(&self, ctx: &mut AgentContext<'_>, next: Next<'_>) -> AgentResult<Value> {
        ctx.state_mut().insert(self.key.to_owned(), self.value.clone());
        next.run(ctx).await
    }
}

/// Returns the request state.
pub struct ReadState;

#[async_trait]
impl Agent for ReadState {
    async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        Ok(Value::Object(ctx.state().clone()))
    }
}

/// Adds two numbers.
pub struct Add;

#[async_trait]
impl ToolHandler for Add {
    async fn call(&self, _ctx: &mut AgentContext<'_>, params: Value) -> AgentResult<Value> {
        let left = params.get("a").and_then(Value::as_f64).unwrap_or_default();
        let right = params.get("b").and_then(Value::as_f64).unwrap_or_default();
        Ok(json!({ "sum": left + right }))
    }
}

/// Returns its validated parameters.
pub struct EchoTool;

#[async_trait]
impl ToolHandler for EchoTool {
    async fn call(&self, _ctx: &mut AgentContext<'_>, params: Value) -> AgentResult<Value> {
        Ok(params)
    }
}
