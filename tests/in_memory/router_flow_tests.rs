//! In-memory integration tests for routing across mounted routers.

use async_trait::async_trait;
use rstest::{fixture, rstest};
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use switchboard::router::{
    context::{AgentContext, AgentRequest, MessageRole, ToolOutput},
    domain::{AgentResult, RouterError, ToolSpec},
    ports::{Agent, Middleware},
    response::ResponseChunk,
    services::{AgentRouter, Next},
};
use tokio::sync::mpsc;

/// Records the paths its layer saw.
struct Audit(Arc<Mutex<Vec<String>>>);

#[async_trait]
impl Middleware for Audit {
    async fn handle(&self, ctx: &mut AgentContext<'_>, next: Next<'_>) -> AgentResult<Value> {
        if let Ok(mut seen) = self.0.lock() {
            seen.push(ctx.current_path().to_owned());
        }
        next.run(ctx).await
    }
}

/// Summarizes the user's text by truncating it.
struct Summarizer;

#[async_trait]
impl Agent for Summarizer {
    async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        let text = ctx
            .params()
            .and_then(|params| params.get("text"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_owned();
        ctx.response().write_text("summarizing");
        let summary: String = text.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
        Ok(json!({ "summary": summary }))
    }
}

/// Hands the latest user message to the summarizer tool.
struct Assistant;

#[async_trait]
impl Agent for Assistant {
    async fn run(&self, ctx: &mut AgentContext<'_>) -> AgentResult<Value> {
        let text = ctx
            .request()
            .last_message_from(MessageRole::User)
            .map(|message| message.content.clone())
            .unwrap_or_default();
        let tool = ctx.agent_as_tool("@/docs/summarize")?;
        match tool.execute(json!({ "text": text })).await {
            ToolOutput::Value(value) => Ok(json!({ "reply": value })),
            ToolOutput::Error(message) => Err(RouterError::Handler(message)),
        }
    }
}

#[fixture]
fn audit_log() -> Arc<Mutex<Vec<String>>> {
    Arc::new(Mutex::new(Vec::new()))
}

fn app(audit_log: &Arc<Mutex<Vec<String>>>) -> AgentRouter {
    let spec = ToolSpec::new(
        "Summarize a passage of text",
        json!({
            "type": "object",
            "required": ["text"],
            "properties": { "text": { "type": "string", "minLength": 1 } }
        }),
    )
    .expect("valid tool spec");
    let mut docs = AgentRouter::new();
    docs.agent("/summarize", Summarizer)
        .act_as_tool("/summarize", spec);

    let mut chat = AgentRouter::new();
    chat.agent("/assistant", Assistant);

    let mut root = AgentRouter::new();
    root.use_middleware("*", Audit(Arc::clone(audit_log)))
        .mount("/docs", docs)
        .mount("/chat", chat);
    root
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mounted_agents_cooperate_through_tools(audit_log: Arc<Mutex<Vec<String>>>) {
    let router = app(&audit_log);

    let response = router
        .handle(
            "/chat/assistant",
            AgentRequest::from_user_text("quarterly numbers look strong overall"),
        )
        .await;

    assert_eq!(
        response.outcome.expect("request should succeed"),
        json!({ "reply": { "summary": "quarterly numbers look" } })
    );
    assert!(response.chunks.contains(&ResponseChunk::Text {
        text: "summarizing".to_owned()
    }));
    let seen = audit_log.lock().expect("audit lock").clone();
    assert_eq!(seen, vec!["/chat/assistant"]);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn mounted_tool_definitions_reach_the_catalog(audit_log: Arc<Mutex<Vec<String>>>) {
    let router = app(&audit_log);

    let catalog = router.tool_catalog();

    let names: Vec<_> = catalog.iter().map(|tool| tool.name.as_str()).collect();
    assert_eq!(names, vec!["docs_summarize"]);
    assert_eq!(router.tool_path("docs_summarize").as_deref(), Some("/docs/summarize"));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn streamed_chunks_arrive_in_order(audit_log: Arc<Mutex<Vec<String>>>) {
    let router = app(&audit_log);
    let (sender, mut receiver) = mpsc::unbounded_channel();

    let response = router
        .handle_streaming(
            "/chat/assistant",
            AgentRequest::from_user_text("ship it"),
            sender,
        )
        .await;

    let mut streamed = Vec::new();
    while let Ok(chunk) = receiver.try_recv() {
        streamed.push(chunk);
    }
    assert_eq!(streamed, response.chunks);
    assert!(!streamed.is_empty());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn unknown_paths_report_not_found(audit_log: Arc<Mutex<Vec<String>>>) {
    let router = app(&audit_log);

    let response = router
        .handle("/chat/missing", AgentRequest::from_user_text("hello"))
        .await;

    assert!(matches!(response.outcome, Err(RouterError::NotFound(_))));
    assert!(matches!(
        response.chunks.last(),
        Some(ResponseChunk::Error { .. })
    ));
}
