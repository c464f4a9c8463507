//! Service layer for task creation, retrieval, and status changes.

use crate::task::{
    domain::{NewTask, Task, TaskDomainError, TaskId, TaskStatus},
    ports::{EventWatcherRepository, StoreError, TaskRepository},
};
use mockable::Clock;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Service-level errors for task lifecycle operations.
#[derive(Debug, Clone, Error)]
pub enum TaskLifecycleError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),
    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type for task lifecycle service operations.
pub type TaskLifecycleResult<T> = Result<T, TaskLifecycleError>;

/// Task lifecycle orchestration service.
#[derive(Clone)]
pub struct TaskLifecycleService<S, C>
where
    S: TaskRepository + EventWatcherRepository,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
}

impl<S, C> TaskLifecycleService<S, C>
where
    S: TaskRepository + EventWatcherRepository,
    C: Clock + Send + Sync,
{
    /// Creates a new task lifecycle service.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self { store, clock }
    }

    /// Creates and stores a task.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when validation fails or the store
    /// rejects the task.
    pub async fn create_task(&self, new_task: NewTask) -> TaskLifecycleResult<Task> {
        let task = Task::create(new_task, &*self.clock)?;
        self.store.store_task(&task).await?;
        info!(task_id = %task.id(), status = %task.status(), "task created");
        Ok(task)
    }

    /// Retrieves a task by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError::Store`] when the lookup fails.
    pub async fn find_task(&self, task_id: TaskId) -> TaskLifecycleResult<Option<Task>> {
        Ok(self.store.find_task(task_id).await?)
    }

    /// Moves a task to `target` and persists the change.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::TaskNotFound`] (wrapped) when the task does not
    /// exist and [`TaskDomainError::InvalidStatusTransition`] (wrapped) when
    /// the change is not permitted.
    pub async fn transition_task(
        &self,
        task_id: TaskId,
        target: TaskStatus,
    ) -> TaskLifecycleResult<Task> {
        let mut task = self.load(task_id).await?;
        let from = task.status();
        task.transition_to(target, &*self.clock)?;
        self.store.update_task(&task).await?;
        info!(%task_id, %from, to = %target, "task status changed");
        Ok(task)
    }

    /// Archives a task and removes its watchers.
    ///
    /// Tasks are never deleted; archiving is the end of their life.
    ///
    /// # Errors
    ///
    /// Returns [`TaskLifecycleError`] when the task is missing, already
    /// archived, or the store fails.
    pub async fn archive_task(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        let task = self.transition_task(task_id, TaskStatus::Archived).await?;
        let removed = self.store.delete_watchers_for_task(task_id).await?;
        info!(%task_id, watchers_removed = removed, "task archived");
        Ok(task)
    }

    async fn load(&self, task_id: TaskId) -> TaskLifecycleResult<Task> {
        self.store
            .find_task(task_id)
            .await?
            .ok_or(TaskLifecycleError::Store(StoreError::TaskNotFound(task_id)))
    }
}
