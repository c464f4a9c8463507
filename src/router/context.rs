//! Request types and the per-call context handed to agents and middleware.

use super::domain::{AgentResult, RouterError, ToolDescriptor, resolve_path};
use super::response::ResponseWriter;
use super::services::{AgentRouter, Invocation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::Span;

/// Role of a request message author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    /// End user.
    User,
    /// Model or agent.
    Assistant,
    /// System instructions.
    System,
    /// Tool output.
    Tool,
}

/// A conversational message carried by a request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestMessage {
    /// Message author role.
    pub role: MessageRole,
    /// Plain text content.
    #[serde(default)]
    pub content: String,
    /// Structured message parts.
    #[serde(default)]
    pub parts: Vec<Value>,
}

impl RequestMessage {
    /// Creates a text message.
    #[must_use]
    pub fn text(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            parts: Vec::new(),
        }
    }

    /// Returns the message text.
    ///
    /// Concatenates the `text` parts when present, otherwise returns
    /// `content`.
    #[must_use]
    pub fn text_content(&self) -> String {
        let from_parts: String = self
            .parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| part.get("text").and_then(Value::as_str))
            .collect();
        if from_parts.is_empty() {
            self.content.trim().to_owned()
        } else {
            from_parts.trim().to_owned()
        }
    }
}

/// Incoming request payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentRequest {
    /// Conversation messages.
    #[serde(default)]
    pub messages: Vec<RequestMessage>,
    /// Structured parameters, validated against a tool schema when one
    /// applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// Additional request fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AgentRequest {
    /// Creates a request carrying only parameters.
    #[must_use]
    pub fn with_params(params: Value) -> Self {
        Self {
            params: Some(params),
            ..Self::default()
        }
    }

    /// Creates a request with a single user message.
    #[must_use]
    pub fn from_user_text(text: impl Into<String>) -> Self {
        Self {
            messages: vec![RequestMessage::text(MessageRole::User, text)],
            ..Self::default()
        }
    }

    /// Returns the most recent message written by `role`.
    #[must_use]
    pub fn last_message_from(&self, role: MessageRole) -> Option<&RequestMessage> {
        self.messages.iter().rev().find(|message| message.role == role)
    }
}

/// Outcome of executing an agent exposed as a tool.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// The agent returned a value.
    Value(Value),
    /// The agent failed; the text is suitable for a model to read.
    Error(String),
}

impl ToolOutput {
    /// Returns `true` when the call failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }

    /// Converts the output into a JSON value for transcripts.
    #[must_use]
    pub fn into_value(self) -> Value {
        match self {
            Self::Value(value) => value,
            Self::Error(text) => serde_json::json!({ "error": text }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ToolTarget {
    Agent,
    Tool,
}

/// An agent or tool route wrapped as a callable tool.
#[derive(Debug, Clone)]
pub struct AgentTool<'r> {
    parent: AgentContext<'r>,
    path: String,
    target: ToolTarget,
    descriptor: ToolDescriptor,
}

impl AgentTool<'_> {
    /// Returns the LLM-facing descriptor.
    #[must_use]
    pub const fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    /// Returns the absolute path the tool dispatches to.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Executes the tool with `args`.
    ///
    /// Failures are reported as [`ToolOutput::Error`] rather than as Rust
    /// errors so they can be handed back to a model.
    pub async fn execute(&self, args: Value) -> ToolOutput {
        let result = match self.target {
            ToolTarget::Agent => self.parent.call_agent(&self.path, Some(args)).await,
            ToolTarget::Tool => self.parent.call_tool(&self.path, args).await,
        };
        match result {
            Ok(value) => ToolOutput::Value(value),
            Err(err) => {
                tracing::warn!(path = %self.path, error = %err, "tool execution failed");
                ToolOutput::Error(err.to_string())
            }
        }
    }
}

/// Per-call context shared by middleware and the terminal handler.
#[derive(Debug, Clone)]
pub struct AgentContext<'r> {
    router: &'r AgentRouter,
    request: AgentRequest,
    path_params: BTreeMap<String, String>,
    state: Map<String, Value>,
    request_id: String,
    current_path: String,
    call_depth: usize,
    response: ResponseWriter,
    span: Span,
}

impl<'r> AgentContext<'r> {
    pub(crate) fn root(
        router: &'r AgentRouter,
        request: AgentRequest,
        request_id: String,
        path: String,
        response: ResponseWriter,
    ) -> Self {
        let span = tracing::info_span!(
            "agent_call",
            request_id = %request_id,
            path = %path,
            depth = 0_usize
        );
        Self {
            router,
            request,
            path_params: BTreeMap::new(),
            state: Map::new(),
            request_id,
            current_path: path,
            call_depth: 0,
            response,
            span,
        }
    }

    fn sub_context(&self, path: String, params: Option<Value>, call_depth: usize) -> Self {
        let span = tracing::info_span!(
            parent: &self.span,
            "agent_call",
            request_id = %self.request_id,
            path = %path,
            depth = call_depth
        );
        Self {
            router: self.router,
            request: AgentRequest {
                messages: self.request.messages.clone(),
                params,
                extra: self.request.extra.clone(),
            },
            path_params: BTreeMap::new(),
            state: self.state.clone(),
            request_id: self.request_id.clone(),
            current_path: path,
            call_depth,
            response: self.response.clone(),
            span,
        }
    }

    /// Returns the request payload.
    #[must_use]
    pub const fn request(&self) -> &AgentRequest {
        &self.request
    }

    /// Returns the request payload for modification by middleware.
    pub const fn request_mut(&mut self) -> &mut AgentRequest {
        &mut self.request
    }

    /// Returns the request parameters, if any.
    #[must_use]
    pub const fn params(&self) -> Option<&Value> {
        self.request.params.as_ref()
    }

    /// Returns a captured path parameter.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params.get(name).map(String::as_str)
    }

    /// Returns all captured path parameters.
    #[must_use]
    pub const fn path_params(&self) -> &BTreeMap<String, String> {
        &self.path_params
    }

    pub(crate) fn set_path_params(&mut self, params: BTreeMap<String, String>) {
        self.path_params = params;
    }

    /// Returns request-scoped state.
    #[must_use]
    pub const fn state(&self) -> &Map<String, Value> {
        &self.state
    }

    /// Returns request-scoped state for modification.
    ///
    /// Sub-calls receive a copy; writes made by a sub-call are not visible to
    /// its caller.
    pub const fn state_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.state
    }

    /// Returns the request identifier shared by every sub-call.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Returns the path being served.
    #[must_use]
    pub fn current_path(&self) -> &str {
        &self.current_path
    }

    /// Returns the number of agent hops from the top-level request.
    #[must_use]
    pub const fn call_depth(&self) -> usize {
        self.call_depth
    }

    /// Returns the response writer.
    #[must_use]
    pub const fn response(&self) -> &ResponseWriter {
        &self.response
    }

    /// Returns the tracing span for this call.
    #[must_use]
    pub const fn span(&self) -> &Span {
        &self.span
    }

    /// Invokes the agent at `path` directly.
    ///
    /// `path` is resolved relative to the current path; `/x` and `@/x` are
    /// absolute.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MaxCallDepthExceeded`] when the call chain is
    /// too deep, or any error raised while dispatching the sub-call.
    pub async fn call_agent(&self, path: &str, args: Option<Value>) -> AgentResult<Value> {
        let max_depth = self.router.options().max_call_depth;
        if self.call_depth >= max_depth {
            return Err(RouterError::MaxCallDepthExceeded(max_depth));
        }
        let resolved = resolve_path(&self.current_path, path);
        let mut sub = self.sub_context(resolved, args, self.call_depth.saturating_add(1));
        self.router.dispatch(&mut sub, Invocation::Internal).await
    }

    /// Invokes the tool route at `path` directly.
    ///
    /// Tool calls do not count towards the call depth.
    ///
    /// # Errors
    ///
    /// Returns any error raised while dispatching, including schema
    /// validation failures.
    pub async fn call_tool(&self, path: &str, params: Value) -> AgentResult<Value> {
        let resolved = resolve_path(&self.current_path, path);
        let mut sub = self.sub_context(resolved, Some(params), self.call_depth);
        self.router.dispatch(&mut sub, Invocation::Internal).await
    }

    /// Wraps the agent at `path` as a tool using its registered definition.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::ToolDefinitionMissing`] when no tool definition
    /// was attached with `act_as_tool`.
    pub fn agent_as_tool(&self, path: &str) -> AgentResult<AgentTool<'r>> {
        let resolved = resolve_path(&self.current_path, path);
        let spec = self
            .router
            .tool_definition_for(&resolved)
            .ok_or_else(|| RouterError::ToolDefinitionMissing(resolved.clone()))?;
        Ok(AgentTool {
            descriptor: spec.descriptor_for(&resolved),
            parent: self.clone(),
            path: resolved,
            target: ToolTarget::Agent,
        })
    }

    /// Wraps the tool route at `path` as a tool.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::NotFound`] when no tool route matches.
    pub fn attach_tool(&self, path: &str) -> AgentResult<AgentTool<'r>> {
        let resolved = resolve_path(&self.current_path, path);
        let spec = self
            .router
            .tool_route_spec(&resolved)
            .ok_or_else(|| RouterError::NotFound(resolved.clone()))?;
        Ok(AgentTool {
            descriptor: spec.descriptor_for(&resolved),
            parent: self.clone(),
            path: resolved,
            target: ToolTarget::Tool,
        })
    }
}
