//! Shared world state for agent routing BDD scenarios.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rstest::fixture;
use serde_json::{Value, json};
use switchboard::router::{
    context::AgentContext,
    domain::AgentResult,
    ports::{Agent, Middleware},
    response::AgentResponse,
    services::{AgentRouter, Next},
};

/// Ordered record of middleware activity.
#[derive(Debug, Clone, Default)]
pub struct Trace(Arc<Mutex<Vec<String>>>);

impl Trace {
    fn push(&self, entry: String) {
        if let Ok(mut entries) = self.0.lock() {
            entries.push(entry);
        }
    }

    /// Returns the recorded entries.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().map(|entries| entries.clone()).unwrap_or_default()
    }
}

/// Agent answering with the pattern it was registered under.
pub struct Labelled(pub String);

#[async_trait]
impl Agent for Labelled {
    async fn run(&self, _ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        Ok(json!({ "handled_by": self.0 }))
    }
}

/// Agent that calls its own path until the router refuses.
pub struct SelfCalling;

#[async_trait]
impl Agent for SelfCalling {
    async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        let path = ctx.current_path().to_owned();
        ctx.call_agent(&path, None).await
    }
}

/// Middleware recording entry and exit around the rest of the chain.
pub struct Around {
    pub label: String,
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

/// Scenario world for agent routing behaviour tests.
pub struct RoutingWorld {
    pub router: AgentRouter,
    pub trace: Trace,
    pub response: Option<AgentResponse>,
}

impl RoutingWorld {
    /// Creates a world with an empty router.
    #[must_use]
    pub fn new() -> Self {
        Self {
            router: AgentRouter::new(),
            trace: Trace::default(),
            response: None,
        }
    }

    /// Returns the last response.
    ///
    /// # Errors
    ///
    /// Returns an error if no request was sent.
    pub fn response(&self) -> Result<&AgentResponse, eyre::Report> {
        self.response
            .as_ref()
            .ok_or_else(|| eyre::eyre!("no request sent in scenario"))
    }
}

impl Default for RoutingWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixture that creates a new scenario world.
#[fixture]
pub fn world() -> RoutingWorld {
    RoutingWorld::default()
}

/// Runs an async operation within sync step definitions.
pub fn run_async<T>(future: impl std::future::Future<Output = T>) -> T {
    tokio::task::block_in_place(|| tokio::runtime::Handle::current().block_on(future))
}
