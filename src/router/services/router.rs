//! Path-based router dispatching requests through middleware to agents and
//! tools.

use crate::router::context::{AgentContext, AgentRequest};
use crate::router::domain::{
    AgentResult, RouteMatch, RoutePattern, RouterError, ToolDescriptor, ToolSpec, normalize_path,
};
use crate::router::ports::{Agent, Middleware, ToolHandler};
use crate::router::response::{AgentResponse, ResponseChunk, ResponseWriter};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{Instrument, debug, info, warn};
use uuid::Uuid;

/// Default limit on nested agent calls.
pub const DEFAULT_MAX_CALL_DEPTH: usize = 10;

/// Router behaviour options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterOptions {
    /// Maximum number of nested agent hops below a top-level request.
    pub max_call_depth: usize,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            max_call_depth: DEFAULT_MAX_CALL_DEPTH,
        }
    }
}

/// How a dispatch was initiated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Invocation {
    /// A top-level request.
    External,
    /// A sub-call made from inside a handler.
    Internal,
}

struct MiddlewareLayer {
    pattern: RoutePattern,
    middleware: Arc<dyn Middleware>,
}

impl MiddlewareLayer {
    fn applies(&self, path: &str, invocation: Invocation) -> bool {
        match invocation {
            Invocation::External => self.pattern.matches(path).is_some(),
            Invocation::Internal => {
                !self.pattern.has_wildcard()
                    && !self.pattern.has_params()
                    && self.pattern.matches(path).is_some()
            }
        }
    }
}

enum RouteTarget {
    Agent(Arc<dyn Agent>),
    Tool {
        spec: ToolSpec,
        handler: Arc<dyn ToolHandler>,
    },
}

struct RouteEntry {
    pattern: RoutePattern,
    target: RouteTarget,
}

struct ToolDefinition {
    pattern: RoutePattern,
    spec: ToolSpec,
}

/// Registry of middleware layers, terminal handlers, and tool definitions.
///
/// Built with `&mut self` registration calls, then served through `&self`.
///
/// # Examples
///
/// ```
/// use async_trait::async_trait;
/// use serde_json::{Value, json};
/// use switchboard::router::{
///     context::{AgentContext, AgentRequest},
///     domain::AgentResult,
///     ports::Agent,
///     services::AgentRouter,
/// };
///
/// struct Hello;
///
/// #[async_trait]
/// impl Agent for Hello {
///     async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
///         ctx.response().write_text("hello");
///         Ok(json!({ "greeted": true }))
///     }
/// }
///
/// # tokio::runtime::Runtime::new().expect("runtime").block_on(async {
/// let mut router = AgentRouter::new();
/// router.agent("/hello", Hello);
/// let response = router.handle("/hello", AgentRequest::default()).await;
/// assert_eq!(response.outcome, Ok(json!({ "greeted": true })));
/// assert_eq!(response.text(), "hello");
/// # });
/// ```
#[derive(Default)]
pub struct AgentRouter {
    options: RouterOptions,
    middleware: Vec<MiddlewareLayer>,
    routes: Vec<RouteEntry>,
    tool_definitions: Vec<ToolDefinition>,
}

impl fmt::Debug for AgentRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentRouter")
            .field("options", &self.options)
            .field(
                "middleware",
                &pattern_list(self.middleware.iter().map(|layer| &layer.pattern)),
            )
            .field(
                "routes",
                &pattern_list(self.routes.iter().map(|route| &route.pattern)),
            )
            .field(
                "tool_definitions",
                &pattern_list(self.tool_definitions.iter().map(|def| &def.pattern)),
            )
            .finish()
    }
}

fn pattern_list<'a>(patterns: impl Iterator<Item = &'a RoutePattern>) -> Vec<&'a str> {
    patterns.map(RoutePattern::as_str).collect()
}

impl AgentRouter {
    /// Creates an empty router with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty router with the given options.
    #[must_use]
    pub fn with_options(options: RouterOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Returns the router options.
    #[must_use]
    pub const fn options(&self) -> &RouterOptions {
        &self.options
    }

    /// Registers middleware for every path matching `pattern`.
    ///
    /// Layers run in registration order.
    pub fn use_middleware(
        &mut self,
        pattern: &str,
        middleware: impl Middleware + 'static,
    ) -> &mut Self {
        self.middleware.push(MiddlewareLayer {
            pattern: RoutePattern::parse(pattern),
            middleware: Arc::new(middleware),
        });
        self
    }

    /// Registers an agent as the terminal handler for `path`.
    ///
    /// Registering the same path again replaces the earlier handler.
    pub fn agent(&mut self, path: &str, agent: impl Agent + 'static) -> &mut Self {
        self.insert_route(RouteEntry {
            pattern: RoutePattern::parse(path),
            target: RouteTarget::Agent(Arc::new(agent)),
        });
        self
    }

    /// Registers a schema-validated tool handler for `path`.
    pub fn tool(
        &mut self,
        path: &str,
        spec: ToolSpec,
        handler: impl ToolHandler + 'static,
    ) -> &mut Self {
        self.insert_route(RouteEntry {
            pattern: RoutePattern::parse(path),
            target: RouteTarget::Tool {
                spec,
                handler: Arc::new(handler),
            },
        });
        self
    }

    /// Attaches tool metadata to the agent at `path`, allowing it to be
    /// exposed through [`AgentContext::agent_as_tool`].
    pub fn act_as_tool(&mut self, path: &str, spec: ToolSpec) -> &mut Self {
        let pattern = RoutePattern::parse(path);
        if let Some(existing) = self
            .tool_definitions
            .iter_mut()
            .find(|definition| definition.pattern == pattern)
        {
            existing.spec = spec;
        } else {
            self.tool_definitions.push(ToolDefinition { pattern, spec });
        }
        self
    }

    /// Mounts every layer, route, and tool definition of `router` beneath
    /// `prefix`.
    pub fn mount(&mut self, prefix: &str, router: Self) -> &mut Self {
        let Self {
            middleware,
            routes,
            tool_definitions,
            ..
        } = router;
        for layer in middleware {
            self.middleware.push(MiddlewareLayer {
                pattern: layer.pattern.with_prefix(prefix),
                middleware: layer.middleware,
            });
        }
        for route in routes {
            self.insert_route(RouteEntry {
                pattern: route.pattern.with_prefix(prefix),
                target: route.target,
            });
        }
        for definition in tool_definitions {
            let mounted = definition.pattern.with_prefix(prefix);
            self.act_as_tool(mounted.as_str(), definition.spec);
        }
        self
    }

    fn insert_route(&mut self, entry: RouteEntry) {
        if let Some(existing) = self
            .routes
            .iter_mut()
            .find(|route| route.pattern == entry.pattern)
        {
            warn!(path = %entry.pattern, "replacing previously registered handler");
            *existing = entry;
        } else {
            self.routes.push(entry);
        }
    }

    /// Handles a top-level request and collects the response.
    pub async fn handle(&self, path: &str, request: AgentRequest) -> AgentResponse {
        self.run_request(path, request, ResponseWriter::new()).await
    }

    /// Handles a top-level request, forwarding chunks to `sink` as they are
    /// written.
    pub async fn handle_streaming(
        &self,
        path: &str,
        request: AgentRequest,
        sink: UnboundedSender<ResponseChunk>,
    ) -> AgentResponse {
        self.run_request(path, request, ResponseWriter::streaming(sink))
            .await
    }

    /// Invokes the handler at `path` as a top-level call with `params`.
    ///
    /// # Errors
    ///
    /// Returns the [`RouterError`] raised while dispatching.
    pub async fn invoke(&self, path: &str, params: Value) -> AgentResult<Value> {
        self.run_request(path, AgentRequest::with_params(params), ResponseWriter::new())
            .await
            .outcome
    }

    async fn run_request(
        &self,
        path: &str,
        request: AgentRequest,
        writer: ResponseWriter,
    ) -> AgentResponse {
        let request_id = Uuid::new_v4().to_string();
        let normalized = normalize_path(path);
        let mut ctx = AgentContext::root(
            self,
            request,
            request_id.clone(),
            normalized,
            writer.clone(),
        );
        info!(parent: ctx.span(), "handling agent request");

        let outcome = self.dispatch(&mut ctx, Invocation::External).await;
        match &outcome {
            Ok(_) => debug!(parent: ctx.span(), "agent request completed"),
            Err(err) => {
                warn!(parent: ctx.span(), error = %err, "agent request failed");
                writer.write_error(err.to_string());
            }
        }

        AgentResponse {
            request_id,
            outcome,
            chunks: writer.snapshot(),
        }
    }

    pub(crate) async fn dispatch(
        &self,
        ctx: &mut AgentContext<'_>,
        invocation: Invocation,
    ) -> AgentResult<Value> {
        let path = ctx.current_path().to_owned();
        let (route, matched) = self
            .best_route(&path)
            .ok_or_else(|| RouterError::NotFound(path.clone()))?;
        ctx.set_path_params(matched.into_params());

        let chain: Vec<Arc<dyn Middleware>> = self
            .middleware
            .iter()
            .filter(|layer| layer.applies(&path, invocation))
            .map(|layer| Arc::clone(&layer.middleware))
            .collect();
        debug!(
            parent: ctx.span(),
            route = %route.pattern,
            middleware = chain.len(),
            "dispatching"
        );

        let next = Next {
            chain: &chain,
            terminal: Terminal {
                target: &route.target,
                tool_spec: self.tool_definition_for(&path),
            },
        };
        let span = ctx.span().clone();
        next.run(ctx).instrument(span).await
    }

    fn best_route(&self, path: &str) -> Option<(&RouteEntry, RouteMatch)> {
        // Reversed so that the earliest registration wins a specificity tie.
        self.routes
            .iter()
            .rev()
            .filter_map(|route| route.pattern.matches(path).map(|matched| (route, matched)))
            .max_by(|(_, left), (_, right)| left.specificity().cmp(right.specificity()))
    }

    pub(crate) fn tool_definition_for(&self, path: &str) -> Option<&ToolSpec> {
        self.tool_definitions
            .iter()
            .rev()
            .filter_map(|definition| {
                definition
                    .pattern
                    .matches(path)
                    .map(|matched| (&definition.spec, matched))
            })
            .max_by(|(_, left), (_, right)| left.specificity().cmp(right.specificity()))
            .map(|(spec, _)| spec)
    }

    pub(crate) fn tool_route_spec(&self, path: &str) -> Option<&ToolSpec> {
        match self.best_route(path) {
            Some((
                RouteEntry {
                    target: RouteTarget::Tool { spec, .. },
                    ..
                },
                _,
            )) => Some(spec),
            _ => None,
        }
    }

    /// Returns every tool exposed at a concrete path, paired with that path.
    ///
    /// Agents exposed with [`Self::act_as_tool`] come first, then tool
    /// routes, each in registration order. Names are unique; the first
    /// registration of a name wins.
    #[must_use]
    pub fn tool_entries(&self) -> Vec<(String, ToolDescriptor)> {
        let definitions = self
            .tool_definitions
            .iter()
            .map(|definition| (&definition.pattern, &definition.spec));
        let tool_routes = self.routes.iter().filter_map(|route| match &route.target {
            RouteTarget::Tool { spec, .. } => Some((&route.pattern, spec)),
            RouteTarget::Agent(_) => None,
        });

        let mut entries: Vec<(String, ToolDescriptor)> = Vec::new();
        for (pattern, spec) in definitions.chain(tool_routes) {
            if pattern.has_wildcard() || pattern.has_params() {
                continue;
            }
            let descriptor = spec.descriptor_for(pattern.as_str());
            if entries.iter().any(|(_, known)| known.name == descriptor.name) {
                continue;
            }
            entries.push((pattern.as_str().to_owned(), descriptor));
        }
        entries
    }

    /// Returns the LLM-facing catalog of every exposed tool.
    #[must_use]
    pub fn tool_catalog(&self) -> Vec<ToolDescriptor> {
        self.tool_entries()
            .into_iter()
            .map(|(_, descriptor)| descriptor)
            .collect()
    }

    /// Returns the path of the tool exposed under `name`.
    #[must_use]
    pub fn tool_path(&self, name: &str) -> Option<String> {
        self.tool_entries()
            .into_iter()
            .find(|(_, descriptor)| descriptor.name == name)
            .map(|(path, _)| path)
    }
}

#[derive(Clone, Copy)]
struct Terminal<'a> {
    target: &'a RouteTarget,
    tool_spec: Option<&'a ToolSpec>,
}

impl Terminal<'_> {
    async fn run(self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        match self.target {
            RouteTarget::Agent(agent) => {
                if let (Some(spec), Some(params)) = (self.tool_spec, ctx.params()) {
                    validate_input(spec, params, ctx.current_path())?;
                }
                agent.run(ctx).await
            }
            RouteTarget::Tool { spec, handler } => {
                let params = tool_params(ctx);
                validate_input(spec, &params, ctx.current_path())?;
                handler.call(ctx, params).await
            }
        }
    }
}

/// Remainder of a middleware chain.
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    terminal: Terminal<'a>,
}

impl Next<'_> {
    /// Runs the remaining middleware and then the terminal handler.
    ///
    /// # Errors
    ///
    /// Returns any error raised by a later layer or the handler.
    pub async fn run(self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        match self.chain.split_first() {
            Some((layer, rest)) => {
                let next = Next {
                    chain: rest,
                    terminal: self.terminal,
                };
                layer.handle(ctx, next).await
            }
            None => self.terminal.run(ctx).await,
        }
    }
}

fn validate_input(spec: &ToolSpec, params: &Value, path: &str) -> AgentResult<()> {
    spec.input_schema()
        .validate(params)
        .map_err(|errors| RouterError::Validation {
            path: path.to_owned(),
            errors,
        })
}

/// Tool parameters with captured path parameters filled in where absent.
fn tool_params(ctx: &AgentContext<'_>) -> Value {
    match ctx.params() {
        Some(Value::Object(fields)) => Value::Object(with_path_params(fields.clone(), ctx)),
        Some(other) => other.clone(),
        None => Value::Object(with_path_params(Map::new(), ctx)),
    }
}

fn with_path_params(mut fields: Map<String, Value>, ctx: &AgentContext<'_>) -> Map<String, Value> {
    for (name, value) in ctx.path_params() {
        if name == crate::router::domain::WILDCARD_PARAM {
            continue;
        }
        fields
            .entry(name.clone())
            .or_insert_with(|| Value::String(value.clone()));
    }
    fields
}
