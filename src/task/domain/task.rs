//! Task aggregate root and related lifecycle types.

use super::{
    EventId, ParseTaskPriorityError, ParseTaskStatusError, ParseTaskTypeError, TaskDomainError,
    TaskId, WorkspaceId,
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::fmt;

/// Task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    /// Created and waiting to run.
    Pending,
    /// Waiting for its scheduled time.
    Scheduled,
    /// Currently running.
    Progress,
    /// Waiting for human input.
    InputAwait,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Retired; final.
    Archived,
}

impl TaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 7] = [
        Self::Pending,
        Self::Scheduled,
        Self::Progress,
        Self::InputAwait,
        Self::Completed,
        Self::Failed,
        Self::Archived,
    ];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::Progress => "progress",
            Self::InputAwait => "input-await",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Archived => "archived",
        }
    }

    /// Returns `true` for `completed`, `failed`, and `archived`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Archived)
    }

    /// Returns `true` if a task may move from `self` to `target`.
    ///
    /// Non-terminal statuses may move to any other status. `completed` and
    /// `failed` may only be archived. `archived` is final.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        match self {
            Self::Archived => false,
            Self::Completed | Self::Failed => matches!(target, Self::Archived),
            Self::Pending | Self::Scheduled | Self::Progress | Self::InputAwait => {
                self as u8 != target as u8
            }
        }
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = ParseTaskStatusError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "progress" => Ok(Self::Progress),
            "input-await" => Ok(Self::InputAwait),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "archived" => Ok(Self::Archived),
            _ => Err(ParseTaskStatusError(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a task came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    /// Ordinary task.
    #[default]
    Default,
    /// Task waiting on a matching future event.
    Watcher,
    /// Task due at a scheduled time.
    Scheduled,
    /// Task considered out of date.
    Stale,
}

impl TaskType {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Watcher => "watcher",
            Self::Scheduled => "scheduled",
            Self::Stale => "stale",
        }
    }
}

impl TryFrom<&str> for TaskType {
    type Error = ParseTaskTypeError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "default" => Ok(Self::Default),
            "watcher" => Ok(Self::Watcher),
            "scheduled" => Ok(Self::Scheduled),
            "stale" => Ok(Self::Stale),
            _ => Err(ParseTaskTypeError(value.to_owned())),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    /// Low priority.
    Low,
    /// Medium priority.
    Medium,
    /// High priority.
    High,
    /// Critical priority.
    Critical,
}

impl TaskPriority {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl TryFrom<&str> for TaskPriority {
    type Error = ParseTaskPriorityError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            _ => Err(ParseTaskPriorityError(value.to_owned())),
        }
    }
}

/// Parameter object for creating a task.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTask {
    workspace_id: WorkspaceId,
    name: String,
    task_type: TaskType,
    status: TaskStatus,
    priority: Option<TaskPriority>,
    authorized_users: Option<BTreeSet<String>>,
    triggering_event_id: Option<EventId>,
    input: Value,
    metadata: Map<String, Value>,
    provider_name: Option<String>,
    ai_description: Option<String>,
    scheduled_for: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
}

impl NewTask {
    /// Creates a pending default task.
    #[must_use]
    pub fn new(workspace_id: WorkspaceId, name: impl Into<String>) -> Self {
        Self {
            workspace_id,
            name: name.into(),
            task_type: TaskType::Default,
            status: TaskStatus::Pending,
            priority: None,
            authorized_users: None,
            triggering_event_id: None,
            input: Value::Null,
            metadata: Map::new(),
            provider_name: None,
            ai_description: None,
            scheduled_for: None,
            expires_at: None,
        }
    }

    /// Sets the task type.
    #[must_use]
    pub const fn with_task_type(mut self, task_type: TaskType) -> Self {
        self.task_type = task_type;
        self
    }

    /// Sets the initial status.
    #[must_use]
    pub const fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Sets the priority.
    #[must_use]
    pub const fn with_priority(mut self, priority: TaskPriority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Restricts the task to the given users.
    #[must_use]
    pub fn with_authorized_users(mut self, users: impl IntoIterator<Item = String>) -> Self {
        self.authorized_users = Some(users.into_iter().collect());
        self
    }

    /// Records the event that caused the task.
    #[must_use]
    pub const fn with_triggering_event(mut self, event_id: EventId) -> Self {
        self.triggering_event_id = Some(event_id);
        self
    }

    /// Sets the task input.
    #[must_use]
    pub fn with_input(mut self, input: Value) -> Self {
        self.input = input;
        self
    }

    /// Sets the task metadata.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Sets the provider the task relates to.
    #[must_use]
    pub fn with_provider_name(mut self, provider_name: impl Into<String>) -> Self {
        self.provider_name = Some(provider_name.into());
        self
    }

    /// Sets the AI-generated description.
    #[must_use]
    pub fn with_ai_description(mut self, description: impl Into<String>) -> Self {
        self.ai_description = Some(description.into());
        self
    }

    /// Sets the scheduled time.
    #[must_use]
    pub const fn with_scheduled_for(mut self, scheduled_for: DateTime<Utc>) -> Self {
        self.scheduled_for = Some(scheduled_for);
        self
    }

    /// Sets the expiry time.
    #[must_use]
    pub const fn with_expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

/// Task aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    workspace_id: WorkspaceId,
    name: String,
    task_type: TaskType,
    status: TaskStatus,
    priority: Option<TaskPriority>,
    authorized_users: Option<BTreeSet<String>>,
    triggering_event_id: Option<EventId>,
    input: Value,
    output: Option<Value>,
    metadata: Map<String, Value>,
    provider_name: Option<String>,
    ai_description: Option<String>,
    scheduled_for: Option<DateTime<Utc>>,
    expires_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedTaskData {
    /// Persisted task identifier.
    pub id: TaskId,
    /// Owning workspace.
    pub workspace_id: WorkspaceId,
    /// Task name.
    pub name: String,
    /// Task type.
    pub task_type: TaskType,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Optional priority.
    pub priority: Option<TaskPriority>,
    /// Optional user allow-list.
    pub authorized_users: Option<BTreeSet<String>>,
    /// Event that caused the task, if any.
    pub triggering_event_id: Option<EventId>,
    /// Task input.
    pub input: Value,
    /// Task output, if any.
    pub output: Option<Value>,
    /// Task metadata.
    pub metadata: Map<String, Value>,
    /// Related provider, if any.
    pub provider_name: Option<String>,
    /// AI-generated description, if any.
    pub ai_description: Option<String>,
    /// Scheduled time, if any.
    pub scheduled_for: Option<DateTime<Utc>>,
    /// Expiry time, if any.
    pub expires_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a task from a parameter object.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::EmptyTaskName`] when the name is blank.
    pub fn create(new_task: NewTask, clock: &impl Clock) -> Result<Self, TaskDomainError> {
        let name = new_task.name.trim().to_owned();
        if name.is_empty() {
            return Err(TaskDomainError::EmptyTaskName);
        }
        let timestamp = clock.utc();
        Ok(Self {
            id: TaskId::new(),
            workspace_id: new_task.workspace_id,
            name,
            task_type: new_task.task_type,
            status: new_task.status,
            priority: new_task.priority,
            authorized_users: new_task.authorized_users,
            triggering_event_id: new_task.triggering_event_id,
            input: new_task.input,
            output: None,
            metadata: new_task.metadata,
            provider_name: new_task.provider_name,
            ai_description: new_task.ai_description,
            scheduled_for: new_task.scheduled_for,
            expires_at: new_task.expires_at,
            created_at: timestamp,
            updated_at: timestamp,
        })
    }

    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            workspace_id: data.workspace_id,
            name: data.name,
            task_type: data.task_type,
            status: data.status,
            priority: data.priority,
            authorized_users: data.authorized_users,
            triggering_event_id: data.triggering_event_id,
            input: data.input,
            output: data.output,
            metadata: data.metadata,
            provider_name: data.provider_name,
            ai_description: data.ai_description,
            scheduled_for: data.scheduled_for,
            expires_at: data.expires_at,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the task identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the owning workspace.
    #[must_use]
    pub const fn workspace_id(&self) -> &WorkspaceId {
        &self.workspace_id
    }

    /// Returns the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the task type.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the priority, if any.
    #[must_use]
    pub const fn priority(&self) -> Option<TaskPriority> {
        self.priority
    }

    /// Returns the user allow-list, if any.
    #[must_use]
    pub const fn authorized_users(&self) -> Option<&BTreeSet<String>> {
        self.authorized_users.as_ref()
    }

    /// Returns the triggering event, if any.
    #[must_use]
    pub const fn triggering_event_id(&self) -> Option<EventId> {
        self.triggering_event_id
    }

    /// Returns the task input.
    #[must_use]
    pub const fn input(&self) -> &Value {
        &self.input
    }

    /// Returns the task output, if any.
    #[must_use]
    pub const fn output(&self) -> Option<&Value> {
        self.output.as_ref()
    }

    /// Returns the task metadata.
    #[must_use]
    pub const fn metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Returns the related provider, if any.
    #[must_use]
    pub fn provider_name(&self) -> Option<&str> {
        self.provider_name.as_deref()
    }

    /// Returns the AI-generated description, if any.
    #[must_use]
    pub fn ai_description(&self) -> Option<&str> {
        self.ai_description.as_deref()
    }

    /// Returns the scheduled time, if any.
    #[must_use]
    pub const fn scheduled_for(&self) -> Option<DateTime<Utc>> {
        self.scheduled_for
    }

    /// Returns the expiry time, if any.
    #[must_use]
    pub const fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Moves the task to `target`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when the change is
    /// not permitted by [`TaskStatus::can_transition_to`].
    pub fn transition_to(
        &mut self,
        target: TaskStatus,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if !self.status.can_transition_to(target) {
            return Err(TaskDomainError::InvalidStatusTransition {
                task_id: self.id,
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.touch(clock);
        Ok(())
    }

    /// Records `output` and moves the task to `completed`.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::InvalidStatusTransition`] when the task is
    /// already terminal.
    pub fn complete(&mut self, output: Value, clock: &impl Clock) -> Result<(), TaskDomainError> {
        self.transition_to(TaskStatus::Completed, clock)?;
        self.output = Some(output);
        Ok(())
    }

    /// Records the triggering event.
    ///
    /// # Errors
    ///
    /// Returns [`TaskDomainError::TriggeringEventAlreadySet`] when an event
    /// is already recorded.
    pub fn set_triggering_event(
        &mut self,
        event_id: EventId,
        clock: &impl Clock,
    ) -> Result<(), TaskDomainError> {
        if self.triggering_event_id.is_some() {
            return Err(TaskDomainError::TriggeringEventAlreadySet(self.id));
        }
        self.triggering_event_id = Some(event_id);
        self.touch(clock);
        Ok(())
    }

    /// Inserts or replaces a metadata entry.
    pub fn annotate(&mut self, key: impl Into<String>, value: Value, clock: &impl Clock) {
        self.metadata.insert(key.into(), value);
        self.touch(clock);
    }

    /// Returns the compact view handed to classifiers as context.
    #[must_use]
    pub fn summary(&self) -> TaskSummary {
        TaskSummary {
            id: self.id,
            name: self.name.clone(),
            status: self.status,
            task_type: self.task_type,
            priority: self.priority,
            ai_description: self.ai_description.clone(),
            created_at: self.created_at,
        }
    }

    fn touch(&mut self, clock: &impl Clock) {
        self.updated_at = clock.utc();
    }
}

/// Compact task view used as classification context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskSummary {
    /// Task identifier.
    pub id: TaskId,
    /// Task name.
    pub name: String,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Task type.
    pub task_type: TaskType,
    /// Priority, if any.
    pub priority: Option<TaskPriority>,
    /// AI-generated description, if any.
    pub ai_description: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}
