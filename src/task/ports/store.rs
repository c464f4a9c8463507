//! Persistence ports for tasks, events, watchers, and activities.

use crate::task::domain::{
    Activity, Event, EventId, EventWatcher, NewActivity, Task, TaskId, WorkspaceId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Task persistence contract.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Stores a new task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateTask`] when the identifier exists.
    async fn store_task(&self, task: &Task) -> StoreResult<()>;

    /// Persists changes to an existing task.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] when the task does not exist.
    async fn update_task(&self, task: &Task) -> StoreResult<()>;

    /// Finds a task by identifier.
    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>>;

    /// Returns up to `limit` non-archived tasks of a workspace, newest first,
    /// optionally restricted to one provider.
    async fn find_recent_tasks(
        &self,
        workspace_id: &WorkspaceId,
        provider_name: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Task>>;
}

/// Event persistence contract.
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Stores a new event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateProviderEvent`] when any of the event's
    /// provider keys was already ingested.
    async fn store_event(&self, event: &Event) -> StoreResult<()>;

    /// Persists status and notes changes to an existing event.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::EventNotFound`] when the event does not exist.
    async fn update_event(&self, event: &Event) -> StoreResult<()>;

    /// Finds an event by identifier.
    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>>;
}

/// Event watcher persistence contract.
#[async_trait]
pub trait EventWatcherRepository: Send + Sync {
    /// Stores a new watcher.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] when the owning task does not
    /// exist.
    async fn store_watcher(&self, watcher: &EventWatcher) -> StoreResult<()>;

    /// Returns watchers filtered by workspace, provider, and event type.
    ///
    /// The structural match query is not evaluated here.
    async fn find_watcher_candidates(
        &self,
        workspace_id: &WorkspaceId,
        provider_name: &str,
        event_type: &str,
    ) -> StoreResult<Vec<EventWatcher>>;

    /// Returns every watcher owned by a task.
    async fn find_watchers_for_task(&self, task_id: TaskId) -> StoreResult<Vec<EventWatcher>>;

    /// Deletes every watcher owned by a task and returns how many were
    /// removed.
    async fn delete_watchers_for_task(&self, task_id: TaskId) -> StoreResult<usize>;
}

/// Activity log persistence contract.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    /// Appends an activity, assigning the next sequence number of the task
    /// atomically with the insert.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] when the task does not exist.
    async fn append_activity(&self, task_id: TaskId, activity: NewActivity)
    -> StoreResult<Activity>;

    /// Returns the activities of a task ordered by sequence number.
    async fn list_activities(&self, task_id: TaskId) -> StoreResult<Vec<Activity>>;
}

/// Every persistence port in one bound.
pub trait TaskStore:
    TaskRepository + EventRepository + EventWatcherRepository + ActivityRepository
{
}

impl<T> TaskStore for T where
    T: TaskRepository + EventRepository + EventWatcherRepository + ActivityRepository
{
}

/// Errors returned by store implementations.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// A task with the same identifier already exists.
    #[error("duplicate task identifier: {0}")]
    DuplicateTask(TaskId),

    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// An event with the same identifier already exists.
    #[error("duplicate event identifier: {0}")]
    DuplicateEvent(EventId),

    /// The provider event was already ingested.
    #[error("provider event already ingested as {existing}")]
    DuplicateProviderEvent {
        /// Identifier of the previously stored event.
        existing: EventId,
    },

    /// The event was not found.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl StoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
