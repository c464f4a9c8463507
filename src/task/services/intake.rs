//! Event intake: records inbound events and turns them into tasks.

use super::bounded;
use crate::task::{
    domain::{
        CanonicalEvent, ClassificationResult, Event, EventId, EventWatcher, MatchQuery,
        NewEventWatcher, NewTask, NewTaskPlan, Task, TaskDomainError, TaskId, TaskStatus,
        TaskSummary, TaskType, WorkspaceId,
    },
    ports::{ClassificationError, ClassificationRequest, StoreError, TaskClassifier, TaskStore},
};
use mockable::Clock;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Default number of recent tasks offered to the classifier.
pub const DEFAULT_RECENT_TASK_LIMIT: usize = 10;

const DEFAULT_CLASSIFICATION_TIMEOUT: Duration = Duration::from_secs(30);
const LAST_AI_NOTE_KEY: &str = "last_ai_note";

/// Canonical event delivered for a set of workspaces.
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingEvent {
    /// Normalised event.
    pub event: CanonicalEvent,
    /// Workspaces the event was delivered to.
    pub workspace_ids: Vec<WorkspaceId>,
}

impl IncomingEvent {
    /// Creates an incoming event.
    #[must_use]
    pub const fn new(event: CanonicalEvent, workspace_ids: Vec<WorkspaceId>) -> Self {
        Self {
            event,
            workspace_ids,
        }
    }
}

/// Outcome of processing one incoming event.
#[derive(Debug, Clone, PartialEq)]
pub struct IntakeReport {
    /// Stored event, or the previously stored one for duplicates.
    pub event_id: EventId,
    /// `true` when the event had already been ingested and was skipped.
    pub duplicate: bool,
    /// Tasks activated by the event, without repeats, in first-seen order.
    pub tasks: Vec<Task>,
}

/// Errors raised by event intake.
#[derive(Debug, Clone, Error)]
pub enum IntakeError {
    /// The event was delivered to no workspace.
    #[error("incoming event names no workspace")]
    NoWorkspaces,

    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] TaskDomainError),

    /// Store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Classification failed; the event was marked failed.
    #[error("classification of event {event_id} failed: {source}")]
    Classification {
        /// Event being classified.
        event_id: EventId,
        /// Underlying failure.
        source: ClassificationError,
    },
}

/// Orchestrates recording, watcher matching, and classification of inbound
/// events.
pub struct EventIntakeService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    clock: Arc<C>,
    classifier: Option<Arc<dyn TaskClassifier>>,
    recent_task_limit: usize,
    classification_timeout: Duration,
}

impl<S, C> EventIntakeService<S, C>
where
    S: TaskStore,
    C: Clock + Send + Sync,
{
    /// Creates a service that only matches watchers.
    #[must_use]
    pub const fn new(store: Arc<S>, clock: Arc<C>) -> Self {
        Self {
            store,
            clock,
            classifier: None,
            recent_task_limit: DEFAULT_RECENT_TASK_LIMIT,
            classification_timeout: DEFAULT_CLASSIFICATION_TIMEOUT,
        }
    }

    /// Enables classification.
    #[must_use]
    pub fn with_classifier(mut self, classifier: Arc<dyn TaskClassifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Sets how many recent tasks are offered as context.
    #[must_use]
    pub const fn with_recent_task_limit(mut self, limit: usize) -> Self {
        self.recent_task_limit = limit;
        self
    }

    /// Sets the limit for one classification call.
    #[must_use]
    pub const fn with_classification_timeout(mut self, limit: Duration) -> Self {
        self.classification_timeout = limit;
        self
    }

    /// Records `incoming` and returns the tasks it activates.
    ///
    /// Provider events that were already ingested are skipped. Once the event
    /// is stored, any failure marks it `failed` with the error as its notes.
    ///
    /// # Errors
    ///
    /// Returns [`IntakeError::NoWorkspaces`] for events without workspaces,
    /// [`IntakeError::Classification`] when the classifier fails or times
    /// out, and store or domain errors otherwise.
    pub async fn process_incoming_event(
        &self,
        incoming: IncomingEvent,
    ) -> Result<IntakeReport, IntakeError> {
        let IncomingEvent {
            event: canonical,
            workspace_ids,
        } = incoming;
        if workspace_ids.is_empty() {
            return Err(IntakeError::NoWorkspaces);
        }

        let mut event = Event::record(&canonical, workspace_ids, &*self.clock)?;
        match self.store.store_event(&event).await {
            Ok(()) => {}
            Err(StoreError::DuplicateProviderEvent { existing }) => {
                info!(
                    event_id = %existing,
                    provider = %canonical.provider,
                    "skipping duplicate event"
                );
                return Ok(IntakeReport {
                    event_id: existing,
                    duplicate: true,
                    tasks: Vec::new(),
                });
            }
            Err(err) => return Err(err.into()),
        }
        let event_id = event.id();
        info!(
            %event_id,
            provider = %canonical.provider,
            event_type = %canonical.event_type,
            "event recorded"
        );

        match self.activate_tasks(&event, &canonical).await {
            Ok((tasks, notes)) => {
                event.mark_classified(notes)?;
                self.store.update_event(&event).await?;
                info!(%event_id, tasks = tasks.len(), "event classified");
                Ok(IntakeReport {
                    event_id,
                    duplicate: false,
                    tasks,
                })
            }
            Err(err) => {
                warn!(%event_id, error = %err, "event processing failed");
                event.mark_failed(err.to_string())?;
                self.store.update_event(&event).await?;
                Err(err)
            }
        }
    }

    async fn activate_tasks(
        &self,
        event: &Event,
        canonical: &CanonicalEvent,
    ) -> Result<(Vec<Task>, String), IntakeError> {
        let context_task = match canonical.context_task_id() {
            Some(task_id) => self.store.find_task(task_id).await?,
            None => None,
        };

        // Nothing is written until every workspace has been classified.
        let mut tasks = Vec::new();
        let mut classified = Vec::new();
        for workspace_id in event.workspace_ids() {
            tasks.extend(self.watched_tasks(workspace_id, canonical).await?);
            match self.classifier.as_deref() {
                Some(classifier) => {
                    let classification = self
                        .classify(
                            classifier,
                            workspace_id,
                            event,
                            canonical,
                            context_task.as_ref(),
                        )
                        .await?;
                    classified.push((workspace_id, classification));
                }
                None => warn!(%workspace_id, "no classifier configured; skipping classification"),
            }
        }

        let mut notes = Vec::new();
        for (workspace_id, classification) in classified {
            if !classification.notes.is_empty() {
                notes.push(classification.notes.clone());
            }
            tasks.extend(
                self.apply_classification(workspace_id, event, canonical, classification)
                    .await?,
            );
        }

        let activated = dedup_by_id(tasks);
        let summary = if notes.is_empty() {
            format!("Activated {} task(s).", activated.len())
        } else {
            notes.join("\n")
        };
        Ok((activated, summary))
    }

    async fn classify(
        &self,
        classifier: &dyn TaskClassifier,
        workspace_id: &WorkspaceId,
        event: &Event,
        canonical: &CanonicalEvent,
        context_task: Option<&Task>,
    ) -> Result<ClassificationResult, IntakeError> {
        let recent_tasks = self
            .recent_tasks(workspace_id, canonical, context_task)
            .await?;
        let request = ClassificationRequest {
            event: canonical.clone(),
            recent_tasks,
            now: self.clock.utc(),
        };
        bounded(self.classification_timeout, classifier.classify(request))
            .await
            .map_err(|source| IntakeError::Classification {
                event_id: event.id(),
                source,
            })
    }

    async fn watched_tasks(
        &self,
        workspace_id: &WorkspaceId,
        canonical: &CanonicalEvent,
    ) -> Result<Vec<Task>, IntakeError> {
        let Some(payload) = canonical
            .original_payload
            .as_ref()
            .filter(|value| value.is_object())
        else {
            return Ok(Vec::new());
        };
        let candidates = self
            .store
            .find_watcher_candidates(workspace_id, &canonical.provider, &canonical.event_type)
            .await?;

        let mut tasks = Vec::new();
        for watcher in candidates.iter().filter(|watcher| watcher.matches_payload(payload)) {
            match self.store.find_task(watcher.task_id()).await? {
                Some(task) if task.status() != TaskStatus::Archived => tasks.push(task),
                Some(_) => {}
                None => warn!(
                    watcher_id = %watcher.id(),
                    task_id = %watcher.task_id(),
                    "watcher references a missing task"
                ),
            }
        }
        Ok(tasks)
    }

    async fn recent_tasks(
        &self,
        workspace_id: &WorkspaceId,
        canonical: &CanonicalEvent,
        context_task: Option<&Task>,
    ) -> Result<Vec<TaskSummary>, IntakeError> {
        if let Some(task) = context_task {
            return Ok(vec![task.summary()]);
        }
        let recent = self
            .store
            .find_recent_tasks(workspace_id, Some(&canonical.provider), self.recent_task_limit)
            .await?;
        Ok(recent.iter().map(Task::summary).collect())
    }

    async fn apply_classification(
        &self,
        workspace_id: &WorkspaceId,
        event: &Event,
        canonical: &CanonicalEvent,
        classification: ClassificationResult,
    ) -> Result<Vec<Task>, IntakeError> {
        let ClassificationResult {
            new_tasks,
            existing_task_ids,
            notes,
        } = classification;

        let mut tasks = Vec::with_capacity(new_tasks.len() + existing_task_ids.len());
        for plan in new_tasks {
            let task = self
                .create_planned_task(workspace_id, event, canonical, plan)
                .await?;
            tasks.push(task);
        }
        for task_id in existing_task_ids {
            if let Some(task) = self.annotate_existing(task_id, &notes).await? {
                tasks.push(task);
            }
        }
        Ok(tasks)
    }

    async fn create_planned_task(
        &self,
        workspace_id: &WorkspaceId,
        event: &Event,
        canonical: &CanonicalEvent,
        plan: NewTaskPlan,
    ) -> Result<Task, IntakeError> {
        let NewTaskPlan {
            name,
            description,
            priority,
            input,
            scheduled_for,
            watcher,
        } = plan;

        let task_type = match (&watcher, scheduled_for) {
            (Some(_), _) => TaskType::Watcher,
            (None, Some(_)) => TaskType::Scheduled,
            (None, None) => TaskType::Default,
        };
        let mut new_task = NewTask::new(workspace_id.clone(), name)
            .with_task_type(task_type)
            .with_priority(priority)
            .with_ai_description(description)
            .with_provider_name(canonical.provider.clone())
            .with_triggering_event(event.id());
        if let Some(value) = input {
            new_task = new_task.with_input(value);
        }
        if let Some(due) = scheduled_for {
            new_task = new_task
                .with_scheduled_for(due)
                .with_status(TaskStatus::Scheduled);
        }

        let task = Task::create(new_task, &*self.clock)?;
        self.store.store_task(&task).await?;
        info!(
            task_id = %task.id(),
            task_type = task.task_type().as_str(),
            "task created from event"
        );

        if let Some(plan) = watcher {
            let query = MatchQuery::new(Value::Object(plan.match_query))?;
            let new_watcher = NewEventWatcher::new(
                task.id(),
                workspace_id.clone(),
                plan.provider_name,
                plan.event_type,
                query,
            );
            let stored = EventWatcher::create(new_watcher, &*self.clock);
            self.store.store_watcher(&stored).await?;
            info!(task_id = %task.id(), watcher_id = %stored.id(), "watcher created");
        }
        Ok(task)
    }

    async fn annotate_existing(
        &self,
        task_id: TaskId,
        notes: &str,
    ) -> Result<Option<Task>, IntakeError> {
        let Some(mut task) = self.store.find_task(task_id).await? else {
            warn!(%task_id, "classifier referenced a missing task");
            return Ok(None);
        };
        task.annotate(LAST_AI_NOTE_KEY, Value::String(notes.to_owned()), &*self.clock);
        self.store.update_task(&task).await?;
        Ok(Some(task))
    }
}

fn dedup_by_id(tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::new();
    tasks
        .into_iter()
        .filter(|task| seen.insert(task.id()))
        .collect()
}
