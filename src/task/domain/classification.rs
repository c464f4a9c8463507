//! Structured outputs of the classifier and the tool selector.

use super::{TaskId, TaskPriority};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Triage verdict produced before full classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageDecision {
    /// The event asks for new work.
    NewTask,
    /// The event refers to existing work.
    OldTask,
    /// The event needs no action.
    Irrelevant,
}

/// Triage output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Triage {
    /// Verdict.
    pub decision: TriageDecision,
    /// Short justification.
    pub reason: String,
}

/// Rule asking for future events to be linked to a new task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WatcherPlan {
    /// Provider to watch.
    pub provider_name: String,
    /// Event type to watch.
    pub event_type: String,
    /// Structural payload query; an empty query matches every candidate.
    #[serde(default)]
    pub match_query: Map<String, Value>,
}

/// Task the classifier wants created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTaskPlan {
    /// Short task name.
    pub name: String,
    /// Detailed description.
    #[serde(rename = "ai_description")]
    pub description: String,
    /// Assessed priority.
    pub priority: TaskPriority,
    /// Structured task input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    /// Scheduled time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Watcher to create for the task.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watcher: Option<WatcherPlan>,
}

/// Classification of one event against the current task set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Tasks to create.
    #[serde(default)]
    pub new_tasks: Vec<NewTaskPlan>,
    /// Existing tasks the event relates to.
    #[serde(default)]
    pub existing_task_ids: Vec<TaskId>,
    /// Short explanation of the decision.
    #[serde(default)]
    pub notes: String,
}

impl ClassificationResult {
    /// Returns an empty result carrying `notes`.
    #[must_use]
    pub fn empty(notes: impl Into<String>) -> Self {
        Self {
            notes: notes.into(),
            ..Self::default()
        }
    }

    /// Returns `true` when no task is created or referenced.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.new_tasks.is_empty() && self.existing_task_ids.is_empty()
    }
}

/// One tool invocation chosen by the selector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Catalog name of the tool.
    pub tool_name: String,
    /// Tool arguments.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Ordered tool invocations for a task; may be empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolSelection {
    /// Calls to run in order.
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    /// Short explanation of the choice.
    #[serde(default)]
    pub notes: String,
}

impl ToolSelection {
    /// Returns the selected tool names in order.
    #[must_use]
    pub fn tool_names(&self) -> Vec<&str> {
        self.tool_calls
            .iter()
            .map(|call| call.tool_name.as_str())
            .collect()
    }
}
