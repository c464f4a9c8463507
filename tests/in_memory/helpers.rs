//! Shared test helpers for in-memory integration tests.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use switchboard::router::context::AgentContext;
use switchboard::router::domain::{AgentResult, ToolSpec};
use switchboard::router::ports::ToolHandler;
use switchboard::router::services::AgentRouter;
use switchboard::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{CanonicalEvent, WorkspaceId},
    ports::{ModelError, StructuredModel, StructuredRequest},
};

/// Provides a fresh in-memory store for each test.
#[fixture]
pub fn store() -> Arc<InMemoryTaskStore> {
    Arc::new(InMemoryTaskStore::new())
}

/// Provides a clock for services under test.
#[fixture]
pub fn clock() -> Arc<DefaultClock> {
    Arc::new(DefaultClock)
}

/// Builds a workspace identifier.
///
/// # Panics
///
/// Panics if `name` is blank.
pub fn workspace(name: &str) -> WorkspaceId {
    WorkspaceId::new(name).expect("valid workspace id")
}

/// Builds a Slack message event on channel `C1`.
///
/// # Panics
///
/// Panics if the fixed timestamp is invalid.
pub fn slack_message(event_id: &str, text: &str) -> CanonicalEvent {
    CanonicalEvent::new(
        "slack",
        "message",
        event_id,
        Utc.with_ymd_and_hms(2026, 3, 6, 9, 0, 0)
            .single()
            .expect("valid timestamp"),
    )
    .with_text(text)
    .with_channel("C1")
    .with_original_payload(json!({
        "team_id": "T1",
        "event": { "channel": "C1", "text": text }
    }))
}

/// Structured model that replays canned objects in order.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Value>>,
    schema_names: Mutex<Vec<String>>,
}

impl ScriptedModel {
    /// Creates a model that answers with `replies`, one per request.
    pub fn replying(replies: impl IntoIterator<Item = Value>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().collect()),
            schema_names: Mutex::new(Vec::new()),
        })
    }

    /// Returns the schema names of every request received so far.
    ///
    /// # Panics
    ///
    /// Panics if the request log lock is poisoned.
    pub fn schema_names(&self) -> Vec<String> {
        self.schema_names.lock().expect("request log lock").clone()
    }
}

#[async_trait]
impl StructuredModel for ScriptedModel {
    async fn generate_object(&self, request: StructuredRequest) -> Result<Value, ModelError> {
        self.schema_names
            .lock()
            .expect("request log lock")
            .push(request.schema_name);
        self.replies
            .lock()
            .expect("reply queue lock")
            .pop_front()
            .ok_or_else(|| ModelError::MalformedResponse("no scripted reply".to_owned()))
    }
}

/// Looks up an invoice by number.
pub struct InvoiceLookup;

#[async_trait]
impl ToolHandler for InvoiceLookup {
    async fn call(&self, _ctx: &mut AgentContext<'_>, params: Value) -> AgentResult<Value> {
        let number = params.get("number").and_then(Value::as_str).unwrap_or_default();
        Ok(json!({ "number": number, "status": "sent" }))
    }
}

/// Builds a router exposing `/invoices/lookup` as the `invoices_lookup` tool.
///
/// # Panics
///
/// Panics if the tool specification is rejected.
pub fn invoice_router() -> AgentRouter {
    let spec = ToolSpec::new(
        "Look up an invoice by number",
        json!({
            "type": "object",
            "required": ["number"],
            "properties": { "number": { "type": "string", "minLength": 1 } },
            "additionalProperties": false
        }),
    )
    .expect("valid tool spec");
    let mut router = AgentRouter::new();
    router.tool("/invoices/lookup", spec, InvoiceLookup);
    router
}
