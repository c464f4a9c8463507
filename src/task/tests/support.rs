//! Fixtures and test doubles shared by the task tests.

use crate::router::domain::ToolDescriptor;
use crate::task::adapters::memory::InMemoryTaskStore;
use crate::task::domain::{
    CanonicalEvent, ClassificationResult, NewTask, Task, ToolCall, ToolSelection, WorkspaceId,
};
use crate::task::ports::{
    ClassificationError, ClassificationRequest, ModelError, StructuredModel, StructuredRequest,
    TaskClassifier, TaskRepository, ToolExecutionError, ToolExecutor, ToolSelector,
};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use mockable::DefaultClock;
use mockall::mock;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

mock! {
    pub Selector {}

    #[async_trait]
    impl ToolSelector for Selector {
        async fn select(
            &self,
            task: &Task,
            tools: &[ToolDescriptor],
        ) -> Result<ToolSelection, ClassificationError>;
    }
}

mock! {
    pub Executor {}

    #[async_trait]
    impl ToolExecutor for Executor {
        async fn execute(&self, call: &ToolCall) -> Result<Value, ToolExecutionError>;
    }
}

mock! {
    pub Classifier {}

    #[async_trait]
    impl TaskClassifier for Classifier {
        async fn classify(
            &self,
            request: ClassificationRequest,
        ) -> Result<ClassificationResult, ClassificationError>;
    }
}

/// Selector and classifier that never answer within a short timeout.
pub struct Stalled;

#[async_trait]
impl ToolSelector for Stalled {
    async fn select(
        &self,
        _task: &Task,
        _tools: &[ToolDescriptor],
    ) -> Result<ToolSelection, ClassificationError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ToolSelection::default())
    }
}

#[async_trait]
impl TaskClassifier for Stalled {
    async fn classify(
        &self,
        _request: ClassificationRequest,
    ) -> Result<ClassificationResult, ClassificationError> {
        tokio::time::sleep(Duration::from_secs(5)).await;
        Ok(ClassificationResult::default())
    }
}

/// Structured model replaying canned replies and recording every request.
#[derive(Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<Value, ModelError>>>,
    requests: Mutex<Vec<StructuredRequest>>,
}

impl ScriptedModel {
    pub fn replying(replies: impl IntoIterator<Item = Value>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn failing(error: ModelError) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::from([Err(error)])),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<StructuredRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl StructuredModel for ScriptedModel {
    async fn generate_object(&self, request: StructuredRequest) -> Result<Value, ModelError> {
        self.requests.lock().expect("requests lock").push(request);
        self.replies
            .lock()
            .expect("replies lock")
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::MalformedResponse("no scripted reply".to_owned())))
    }
}

pub fn clock() -> Arc<DefaultClock> {
    Arc::new(DefaultClock)
}

pub fn workspace(name: &str) -> WorkspaceId {
    WorkspaceId::new(name).expect("valid workspace id")
}

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
}

pub async fn stored_task(store: &InMemoryTaskStore, new_task: NewTask) -> Task {
    let task = Task::create(new_task, &DefaultClock).expect("valid task");
    store.store_task(&task).await.expect("task stored");
    task
}
