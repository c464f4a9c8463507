//! Drives one task from intake to a terminal status while recording an
//! activity trail.

use super::bounded;
use crate::router::domain::ToolDescriptor;
use crate::task::{
    domain::{
        Activity, ActivityDraft, ActivityValidationError, MessageMetadata, NewActivity, Task,
        TaskDomainError, TaskId, TaskStatus, TOOL_CALL_ACTIVITY, TOOL_RESULT_ACTIVITY,
        ToolCall, ToolSelection,
    },
    ports::{
        ClassificationError, StoreError, TaskStore, ToolExecutionError, ToolExecutor,
        ToolSelector,
    },
};
use mockable::Clock;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, info, warn};

/// Default limit for one tool selection call.
pub const DEFAULT_SELECTION_TIMEOUT: Duration = Duration::from_secs(30);

const STARTED_NOTE: &str = "Task execution started.";
const NO_SELECTOR_NOTE: &str = "Execution failed: no tool selector is configured.";
const NO_TOOLS_NOTE: &str = "No tools selected for execution.";
const COMPLETED_NOTE: &str = "Task execution completed successfully.";
const FAILED_NOTE: &str = "Task execution failed.";

/// Errors raised while processing a task.
#[derive(Debug, Clone, Error)]
pub enum TaskProcessorError {
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A status change was rejected.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// An activity draft was invalid.
    #[error(transparent)]
    Activity(#[from] ActivityValidationError),
    /// Tool selection failed or timed out.
    #[error(transparent)]
    Selection(#[from] ClassificationError),
    /// A selected tool failed.
    #[error(transparent)]
    Execution(#[from] ToolExecutionError),
}

/// Outcome of one [`TaskProcessor::execute`] pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessReport {
    /// Processed task.
    pub task_id: TaskId,
    /// Status the task ended in.
    pub status: TaskStatus,
    /// Number of activities appended during the pass.
    pub activities_logged: usize,
    /// Failure description when the task failed.
    pub error: Option<String>,
}

/// Task execution driver.
///
/// Tool execution is optional: without an executor the processor records
/// the selected calls and leaves dispatch to another component.
pub struct TaskProcessor<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    selector: Option<Arc<dyn ToolSelector>>,
    executor: Option<Arc<dyn ToolExecutor>>,
    tools: Vec<ToolDescriptor>,
    selection_timeout: Duration,
}

impl<S, C> TaskProcessor<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a processor without a selector, executor, or tools.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            store,
            clock,
            selector: None,
            executor: None,
            tools: Vec::new(),
            selection_timeout: DEFAULT_SELECTION_TIMEOUT,
        }
    }

    /// Sets the tool selector.
    #[must_use]
    pub fn with_selector(mut self, selector: Arc<dyn ToolSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Sets the executor that runs selected calls.
    #[must_use]
    pub fn with_executor(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the tool catalog offered to the selector.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<ToolDescriptor>) -> Self {
        self.tools = tools;
        self
    }

    /// Sets the limit for one selection call.
    #[must_use]
    pub const fn with_selection_timeout(mut self, limit: Duration) -> Self {
        self.selection_timeout = limit;
        self
    }

    /// Validates `draft` and appends it to the task's activity log.
    ///
    /// The store assigns the sequence number atomically.
    ///
    /// # Errors
    ///
    /// Returns [`TaskProcessorError::Activity`] for invalid drafts and
    /// [`TaskProcessorError::Store`] when the append fails.
    pub async fn log_activity(
        &self,
        task_id: TaskId,
        draft: ActivityDraft,
    ) -> Result<Activity, TaskProcessorError> {
        let new_activity = NewActivity::from_draft(draft, &*self.clock)?;
        Ok(self.store.append_activity(task_id, new_activity).await?)
    }

    /// Runs the task and reports where it ended.
    ///
    /// Failures never escape: they move the task to `failed` and append one
    /// `system_update` activity carrying the error. Tasks that are already
    /// terminal are returned untouched.
    pub async fn execute(&self, mut task: Task) -> ProcessReport {
        let task_id = task.id();
        let mut logged = 0;
        if task.status().is_terminal() {
            warn!(%task_id, status = %task.status(), "skipping terminal task");
            return report(&task, logged, None);
        }
        info!(%task_id, name = %task.name(), "executing task");

        match self.run(&mut task, &mut logged).await {
            Ok(()) => report(&task, logged, None),
            Err(err) => {
                let message = err.to_string();
                error!(%task_id, error = %message, "task execution failed");
                self.record_failure(&mut task, &message, &mut logged).await;
                report(&task, logged, Some(message))
            }
        }
    }

    async fn run(&self, task: &mut Task, logged: &mut usize) -> Result<(), TaskProcessorError> {
        let task_id = task.id();
        self.log_counted(task_id, ActivityDraft::system_update(STARTED_NOTE), logged)
            .await?;
        if task.status() != TaskStatus::Progress {
            task.transition_to(TaskStatus::Progress, &*self.clock)?;
            self.store.update_task(task).await?;
        }

        let Some(selector) = self.selector.as_ref() else {
            warn!(%task_id, "no tool selector configured");
            task.transition_to(TaskStatus::Failed, &*self.clock)?;
            self.store.update_task(task).await?;
            self.log_counted(task_id, ActivityDraft::system_update(NO_SELECTOR_NOTE), logged)
                .await?;
            return Ok(());
        };

        let selection = bounded(self.selection_timeout, selector.select(task, &self.tools)).await?;
        let output = if selection.tool_calls.is_empty() {
            self.log_counted(task_id, ActivityDraft::system_update(NO_TOOLS_NOTE), logged)
                .await?;
            None
        } else {
            let tool_call = self
                .log_counted(task_id, self.tool_call_draft(task_id, &selection), logged)
                .await?;
            self.execute_calls(task_id, &tool_call, &selection.tool_calls, logged)
                .await?
        };

        match output {
            Some(results) => task.complete(results, &*self.clock)?,
            None => task.transition_to(TaskStatus::Completed, &*self.clock)?,
        }
        self.store.update_task(task).await?;
        self.log_counted(task_id, ActivityDraft::system_update(COMPLETED_NOTE), logged)
            .await?;
        info!(%task_id, "task completed");
        Ok(())
    }

    async fn execute_calls(
        &self,
        task_id: TaskId,
        tool_call: &Activity,
        calls: &[ToolCall],
        logged: &mut usize,
    ) -> Result<Option<Value>, TaskProcessorError> {
        let Some(executor) = self.executor.as_ref() else {
            return Ok(None);
        };
        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let output = executor.execute(call).await?;
            let mut data = Map::new();
            data.insert("output".to_owned(), output.clone());
            let draft = ActivityDraft::new(TOOL_RESULT_ACTIVITY)
                .with_metadata_entry(
                    "note",
                    Value::String(format!("Tool {} completed.", call.tool_name)),
                )
                .with_metadata_entry("tool_name", Value::String(call.tool_name.clone()))
                .with_metadata_entry("arguments", Value::Object(call.arguments.clone()))
                .with_ai_generated_data(data)
                .with_parent(tool_call.id());
            self.log_counted(task_id, draft, logged).await?;
            results.push(json!({ "tool_name": call.tool_name, "output": output }));
        }
        Ok(Some(Value::Array(results)))
    }

    fn tool_call_draft(&self, task_id: TaskId, selection: &ToolSelection) -> ActivityDraft {
        let count = selection.tool_calls.len();
        let invocations = selection
            .tool_calls
            .iter()
            .filter_map(|call| serde_json::to_value(call).ok())
            .collect();
        let message = MessageMetadata::new(
            "assistant",
            format!("Executing tools: {}", selection.tool_names().join(", ")),
            format!("tool-request-{task_id}"),
            self.clock.utc(),
        )
        .with_tool_invocations(invocations);

        ActivityDraft::new(TOOL_CALL_ACTIVITY)
            .with_metadata_entry(
                "note",
                Value::String(format!("AI selected {count} tool(s) to run.")),
            )
            .with_metadata_entry("selection_notes", Value::String(selection.notes.clone()))
            .with_message_metadata(message)
    }

    async fn log_counted(
        &self,
        task_id: TaskId,
        draft: ActivityDraft,
        logged: &mut usize,
    ) -> Result<Activity, TaskProcessorError> {
        let activity = self.log_activity(task_id, draft).await?;
        *logged += 1;
        Ok(activity)
    }

    async fn record_failure(&self, task: &mut Task, message: &str, logged: &mut usize) {
        let task_id = task.id();
        if task.status().can_transition_to(TaskStatus::Failed) {
            let persisted = async {
                task.transition_to(TaskStatus::Failed, &*self.clock)?;
                self.store.update_task(task).await?;
                Ok::<(), TaskProcessorError>(())
            }
            .await;
            if let Err(err) = persisted {
                error!(%task_id, error = %err, "could not mark task failed");
            }
        }

        let draft = ActivityDraft::system_update(FAILED_NOTE)
            .with_metadata_entry("error", Value::String(message.to_owned()));
        if let Err(err) = self.log_counted(task_id, draft, logged).await {
            error!(%task_id, error = %err, "could not record task failure");
        }
    }
}

fn report(task: &Task, activities_logged: usize, error: Option<String>) -> ProcessReport {
    ProcessReport {
        task_id: task.id(),
        status: task.status(),
        activities_logged,
        error,
    }
}
