//! Thread-safe in-memory implementation of every store port.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::task::{
    domain::{
        Activity, Event, EventId, EventWatcher, NewActivity, ProviderEventKey, SequenceNumber,
        Task, TaskId, TaskStatus, WorkspaceId,
    },
    ports::{
        ActivityRepository, EventRepository, EventWatcherRepository, StoreError, StoreResult,
        TaskRepository,
    },
};

/// Thread-safe in-memory task store.
///
/// Writes are serialized by one lock, so activity sequence numbers are
/// assigned atomically with their insert.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTaskStore {
    state: Arc<RwLock<InMemoryStoreState>>,
}

#[derive(Debug, Default)]
struct InMemoryStoreState {
    tasks: HashMap<TaskId, Task>,
    events: HashMap<EventId, Event>,
    provider_keys: HashMap<ProviderEventKey, EventId>,
    watchers: Vec<EventWatcher>,
    activities: HashMap<TaskId, Vec<Activity>>,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, InMemoryStoreState>> {
        self.state
            .read()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, InMemoryStoreState>> {
        self.state
            .write()
            .map_err(|err| StoreError::persistence(std::io::Error::other(err.to_string())))
    }
}

#[async_trait]
impl TaskRepository for InMemoryTaskStore {
    async fn store_task(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.tasks.contains_key(&task.id()) {
            return Err(StoreError::DuplicateTask(task.id()));
        }
        state.tasks.insert(task.id(), task.clone());
        Ok(())
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let mut state = self.write()?;
        let slot = state
            .tasks
            .get_mut(&task.id())
            .ok_or(StoreError::TaskNotFound(task.id()))?;
        *slot = task.clone();
        Ok(())
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        let state = self.read()?;
        Ok(state.tasks.get(&id).cloned())
    }

    async fn find_recent_tasks(
        &self,
        workspace_id: &WorkspaceId,
        provider_name: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Task>> {
        let state = self.read()?;
        let mut matching: Vec<Task> = state
            .tasks
            .values()
            .filter(|task| task.workspace_id() == workspace_id)
            .filter(|task| task.status() != TaskStatus::Archived)
            .filter(|task| provider_name.is_none_or(|name| task.provider_name() == Some(name)))
            .cloned()
            .collect();
        matching.sort_by(|left, right| {
            right
                .created_at()
                .cmp(&left.created_at())
                .then_with(|| left.id().cmp(&right.id()))
        });
        matching.truncate(limit);
        Ok(matching)
    }
}

#[async_trait]
impl EventRepository for InMemoryTaskStore {
    async fn store_event(&self, event: &Event) -> StoreResult<()> {
        let mut state = self.write()?;
        if state.events.contains_key(&event.id()) {
            return Err(StoreError::DuplicateEvent(event.id()));
        }
        let keys = event.provider_keys();
        if let Some(existing) = keys.iter().find_map(|key| state.provider_keys.get(key)) {
            return Err(StoreError::DuplicateProviderEvent {
                existing: *existing,
            });
        }
        for key in keys {
            state.provider_keys.insert(key, event.id());
        }
        state.events.insert(event.id(), event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> StoreResult<()> {
        let mut state = self.write()?;
        let slot = state
            .events
            .get_mut(&event.id())
            .ok_or(StoreError::EventNotFound(event.id()))?;
        *slot = event.clone();
        Ok(())
    }

    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        let state = self.read()?;
        Ok(state.events.get(&id).cloned())
    }
}

#[async_trait]
impl EventWatcherRepository for InMemoryTaskStore {
    async fn store_watcher(&self, watcher: &EventWatcher) -> StoreResult<()> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(&watcher.task_id()) {
            return Err(StoreError::TaskNotFound(watcher.task_id()));
        }
        state.watchers.push(watcher.clone());
        Ok(())
    }

    async fn find_watcher_candidates(
        &self,
        workspace_id: &WorkspaceId,
        provider_name: &str,
        event_type: &str,
    ) -> StoreResult<Vec<EventWatcher>> {
        let state = self.read()?;
        Ok(state
            .watchers
            .iter()
            .filter(|watcher| {
                watcher.workspace_id() == workspace_id
                    && watcher.provider_name() == provider_name
                    && watcher.event_type() == event_type
            })
            .cloned()
            .collect())
    }

    async fn find_watchers_for_task(&self, task_id: TaskId) -> StoreResult<Vec<EventWatcher>> {
        let state = self.read()?;
        Ok(state
            .watchers
            .iter()
            .filter(|watcher| watcher.task_id() == task_id)
            .cloned()
            .collect())
    }

    async fn delete_watchers_for_task(&self, task_id: TaskId) -> StoreResult<usize> {
        let mut state = self.write()?;
        let before = state.watchers.len();
        state.watchers.retain(|watcher| watcher.task_id() != task_id);
        Ok(before.saturating_sub(state.watchers.len()))
    }
}

#[async_trait]
impl ActivityRepository for InMemoryTaskStore {
    async fn append_activity(
        &self,
        task_id: TaskId,
        activity: NewActivity,
    ) -> StoreResult<Activity> {
        let mut state = self.write()?;
        if !state.tasks.contains_key(&task_id) {
            return Err(StoreError::TaskNotFound(task_id));
        }
        let log = state.activities.entry(task_id).or_default();
        let sequence_number = log
            .last()
            .map_or(SequenceNumber::FIRST, |latest| latest.sequence_number().next());
        let stored = Activity::sequenced(activity, task_id, sequence_number);
        log.push(stored.clone());
        Ok(stored)
    }

    async fn list_activities(&self, task_id: TaskId) -> StoreResult<Vec<Activity>> {
        let state = self.read()?;
        Ok(state.activities.get(&task_id).cloned().unwrap_or_default())
    }
}
