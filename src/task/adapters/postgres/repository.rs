//! `PostgreSQL` store implementation for tasks, events, watchers, and
//! activities.

use super::{
    models::{ActivityRow, EventRow, ProviderKeyRow, TaskRow, WatcherRow},
    schema::{
        activities, event_provider_keys, event_watchers, events, task_activity_counters, tasks,
    },
};
use crate::task::{
    domain::{
        Activity, ActivityBody, ActivityId, ActivityLinks, Event, EventId, EventStatus,
        EventWatcher, EventWatcherId, MESSAGE_ACTIVITY, MatchQuery, MessageMetadata, NewActivity,
        PersistedActivityData, PersistedEventData, PersistedEventWatcherData, PersistedTaskData,
        SequenceNumber, Task, TaskId, TaskPriority, TaskStatus, TaskType, WorkspaceId,
    },
    ports::{
        ActivityRepository, EventRepository, EventWatcherRepository, StoreError, StoreResult,
        TaskRepository,
    },
};
use async_trait::async_trait;
use diesel::dsl::exists;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// `PostgreSQL` connection pool type used by the task store.
pub type TaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed task store.
#[derive(Debug, Clone)]
pub struct PostgresTaskStore {
    pool: TaskPgPool,
}

impl PostgresTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: TaskPgPool) -> Self {
        Self { pool }
    }

    /// Builds a connection pool for `database_url` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Persistence`] when the pool cannot be built.
    pub fn connect(database_url: &str, pool_size: u32) -> StoreResult<Self> {
        let manager = ConnectionManager::<PgConnection>::new(database_url);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(StoreError::persistence)?;
        Ok(Self::new(pool))
    }

    async fn run_blocking<F, T>(&self, f: F) -> StoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(StoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(StoreError::persistence)?
    }
}

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        Self::persistence(err)
    }
}

#[async_trait]
impl TaskRepository for PostgresTaskStore {
    async fn store_task(&self, task: &Task) -> StoreResult<()> {
        let task_id = task.id();
        let row = task_to_row(task)?;
        self.run_blocking(move |connection| {
            diesel::insert_into(tasks::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                        StoreError::DuplicateTask(task_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn update_task(&self, task: &Task) -> StoreResult<()> {
        let task_id = task.id();
        let row = task_to_row(task)?;
        self.run_blocking(move |connection| {
            let updated = diesel::update(tasks::table.filter(tasks::id.eq(task_id.into_inner())))
                .set(&row)
                .execute(connection)?;
            if updated == 0 {
                return Err(StoreError::TaskNotFound(task_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_task(&self, id: TaskId) -> StoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.into_inner()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn find_recent_tasks(
        &self,
        workspace_id: &WorkspaceId,
        provider_name: Option<&str>,
        limit: usize,
    ) -> StoreResult<Vec<Task>> {
        let workspace = workspace_id.as_str().to_owned();
        let provider = provider_name.map(str::to_owned);
        let row_limit = i64::try_from(limit).map_err(StoreError::persistence)?;
        self.run_blocking(move |connection| {
            let mut query = tasks::table
                .filter(tasks::workspace_id.eq(workspace))
                .filter(tasks::status.ne(TaskStatus::Archived.as_str()))
                .into_boxed();
            if let Some(name) = provider {
                query = query.filter(tasks::provider_name.eq(name));
            }
            let rows = query
                .order((tasks::created_at.desc(), tasks::id.desc()))
                .limit(row_limit)
                .select(TaskRow::as_select())
                .load::<TaskRow>(connection)?;
            rows.into_iter().map(row_to_task).collect()
        })
        .await
    }
}

#[async_trait]
impl EventRepository for PostgresTaskStore {
    async fn store_event(&self, event: &Event) -> StoreResult<()> {
        let event_id = event.id();
        let row = event_to_row(event)?;
        let key_rows: Vec<ProviderKeyRow> = event
            .provider_keys()
            .into_iter()
            .map(|key| ProviderKeyRow {
                workspace_id: key.workspace_id.into(),
                provider_name: key.provider_name,
                provider_event_id: key.provider_event_id,
                event_id: event_id.into_inner(),
            })
            .collect();

        self.run_blocking(move |connection| {
            connection.transaction::<_, StoreError, _>(|tx| {
                diesel::insert_into(events::table)
                    .values(&row)
                    .execute(tx)
                    .map_err(|err| match err {
                        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                            StoreError::DuplicateEvent(event_id)
                        }
                        _ => StoreError::persistence(err),
                    })?;

                if key_rows.is_empty() {
                    return Ok(());
                }
                // Conflicting keys are skipped so the existing owner can be
                // read back inside the same transaction.
                let inserted = diesel::insert_into(event_provider_keys::table)
                    .values(&key_rows)
                    .on_conflict_do_nothing()
                    .execute(tx)?;
                if inserted < key_rows.len() {
                    let existing = find_conflicting_event(tx, &key_rows, event_id)?;
                    return Err(StoreError::DuplicateProviderEvent { existing });
                }
                Ok(())
            })
        })
        .await
    }

    async fn update_event(&self, event: &Event) -> StoreResult<()> {
        let event_id = event.id();
        let status = event.status().as_str().to_owned();
        let notes = event.classification_notes().map(str::to_owned);
        self.run_blocking(move |connection| {
            let updated = diesel::update(events::table.filter(events::id.eq(event_id.into_inner())))
                .set((
                    events::status.eq(status),
                    events::classification_notes.eq(notes),
                ))
                .execute(connection)?;
            if updated == 0 {
                return Err(StoreError::EventNotFound(event_id));
            }
            Ok(())
        })
        .await
    }

    async fn find_event(&self, id: EventId) -> StoreResult<Option<Event>> {
        self.run_blocking(move |connection| {
            let row = events::table
                .filter(events::id.eq(id.into_inner()))
                .select(EventRow::as_select())
                .first::<EventRow>(connection)
                .optional()?;
            row.map(row_to_event).transpose()
        })
        .await
    }
}

#[async_trait]
impl EventWatcherRepository for PostgresTaskStore {
    async fn store_watcher(&self, watcher: &EventWatcher) -> StoreResult<()> {
        let task_id = watcher.task_id();
        let row = watcher_to_row(watcher);
        self.run_blocking(move |connection| {
            diesel::insert_into(event_watchers::table)
                .values(&row)
                .execute(connection)
                .map_err(|err| match err {
                    DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                        StoreError::TaskNotFound(task_id)
                    }
                    _ => StoreError::persistence(err),
                })?;
            Ok(())
        })
        .await
    }

    async fn find_watcher_candidates(
        &self,
        workspace_id: &WorkspaceId,
        provider_name: &str,
        event_type: &str,
    ) -> StoreResult<Vec<EventWatcher>> {
        let workspace = workspace_id.as_str().to_owned();
        let provider = provider_name.to_owned();
        let kind = event_type.to_owned();
        self.run_blocking(move |connection| {
            let rows = event_watchers::table
                .filter(event_watchers::workspace_id.eq(workspace))
                .filter(event_watchers::provider_name.eq(provider))
                .filter(event_watchers::event_type.eq(kind))
                .order((event_watchers::created_at.asc(), event_watchers::id.asc()))
                .select(WatcherRow::as_select())
                .load::<WatcherRow>(connection)?;
            rows.into_iter().map(row_to_watcher).collect()
        })
        .await
    }

    async fn find_watchers_for_task(&self, task_id: TaskId) -> StoreResult<Vec<EventWatcher>> {
        self.run_blocking(move |connection| {
            let rows = event_watchers::table
                .filter(event_watchers::task_id.eq(task_id.into_inner()))
                .order((event_watchers::created_at.asc(), event_watchers::id.asc()))
                .select(WatcherRow::as_select())
                .load::<WatcherRow>(connection)?;
            rows.into_iter().map(row_to_watcher).collect()
        })
        .await
    }

    async fn delete_watchers_for_task(&self, task_id: TaskId) -> StoreResult<usize> {
        self.run_blocking(move |connection| {
            let deleted = diesel::delete(
                event_watchers::table.filter(event_watchers::task_id.eq(task_id.into_inner())),
            )
            .execute(connection)?;
            Ok(deleted)
        })
        .await
    }
}

#[async_trait]
impl ActivityRepository for PostgresTaskStore {
    async fn append_activity(
        &self,
        task_id: TaskId,
        activity: NewActivity,
    ) -> StoreResult<Activity> {
        self.run_blocking(move |connection| {
            connection.transaction::<_, StoreError, _>(|tx| {
                let task_uuid = task_id.into_inner();
                let task_exists =
                    diesel::select(exists(tasks::table.filter(tasks::id.eq(task_uuid))))
                        .get_result::<bool>(tx)?;
                if !task_exists {
                    return Err(StoreError::TaskNotFound(task_id));
                }

                // The upsert locks the counter row until commit, so
                // concurrent appends for one task are serialised.
                let last_sequence = diesel::insert_into(task_activity_counters::table)
                    .values((
                        task_activity_counters::task_id.eq(task_uuid),
                        task_activity_counters::last_sequence.eq(1_i64),
                    ))
                    .on_conflict(task_activity_counters::task_id)
                    .do_update()
                    .set(
                        task_activity_counters::last_sequence
                            .eq(task_activity_counters::last_sequence + 1_i64),
                    )
                    .returning(task_activity_counters::last_sequence)
                    .get_result::<i64>(tx)?;

                let sequence_number = sequence_from_row(last_sequence)?;
                let stored = Activity::sequenced(activity, task_id, sequence_number);
                let row = activity_to_row(&stored)?;
                diesel::insert_into(activities::table)
                    .values(&row)
                    .execute(tx)?;
                Ok(stored)
            })
        })
        .await
    }

    async fn list_activities(&self, task_id: TaskId) -> StoreResult<Vec<Activity>> {
        self.run_blocking(move |connection| {
            let rows = activities::table
                .filter(activities::task_id.eq(task_id.into_inner()))
                .order(activities::sequence_number.asc())
                .select(ActivityRow::as_select())
                .load::<ActivityRow>(connection)?;
            rows.into_iter().map(row_to_activity).collect()
        })
        .await
    }
}

fn find_conflicting_event(
    connection: &mut PgConnection,
    key_rows: &[ProviderKeyRow],
    own_id: EventId,
) -> StoreResult<EventId> {
    for key in key_rows {
        let owner = event_provider_keys::table
            .filter(event_provider_keys::workspace_id.eq(&key.workspace_id))
            .filter(event_provider_keys::provider_name.eq(&key.provider_name))
            .filter(event_provider_keys::provider_event_id.eq(&key.provider_event_id))
            .select(event_provider_keys::event_id)
            .first::<uuid::Uuid>(connection)
            .optional()?;
        if let Some(existing) = owner.filter(|id| *id != own_id.into_inner()) {
            return Ok(EventId::from_uuid(existing));
        }
    }
    Err(StoreError::persistence(std::io::Error::other(
        "provider key conflict without an owning event",
    )))
}

fn task_to_row(task: &Task) -> StoreResult<TaskRow> {
    let authorized_users = task
        .authorized_users()
        .map(serde_json::to_value)
        .transpose()
        .map_err(StoreError::persistence)?;
    Ok(TaskRow {
        id: task.id().into_inner(),
        workspace_id: task.workspace_id().as_str().to_owned(),
        name: task.name().to_owned(),
        task_type: task.task_type().as_str().to_owned(),
        status: task.status().as_str().to_owned(),
        priority: task.priority().map(|priority| priority.as_str().to_owned()),
        authorized_users,
        triggering_event_id: task.triggering_event_id().map(EventId::into_inner),
        input: task.input().clone(),
        output: task.output().cloned(),
        metadata: Value::Object(task.metadata().clone()),
        provider_name: task.provider_name().map(str::to_owned),
        ai_description: task.ai_description().map(str::to_owned),
        scheduled_for: task.scheduled_for(),
        expires_at: task.expires_at(),
        created_at: task.created_at(),
        updated_at: task.updated_at(),
    })
}

fn row_to_task(row: TaskRow) -> StoreResult<Task> {
    let workspace_id = WorkspaceId::new(row.workspace_id).map_err(StoreError::persistence)?;
    let task_type =
        TaskType::try_from(row.task_type.as_str()).map_err(StoreError::persistence)?;
    let status = TaskStatus::try_from(row.status.as_str()).map_err(StoreError::persistence)?;
    let priority = row
        .priority
        .as_deref()
        .map(TaskPriority::try_from)
        .transpose()
        .map_err(StoreError::persistence)?;
    let authorized_users = row
        .authorized_users
        .map(serde_json::from_value::<BTreeSet<String>>)
        .transpose()
        .map_err(StoreError::persistence)?;

    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::from_uuid(row.id),
        workspace_id,
        name: row.name,
        task_type,
        status,
        priority,
        authorized_users,
        triggering_event_id: row.triggering_event_id.map(EventId::from_uuid),
        input: row.input,
        output: row.output,
        metadata: json_object(row.metadata)?,
        provider_name: row.provider_name,
        ai_description: row.ai_description,
        scheduled_for: row.scheduled_for,
        expires_at: row.expires_at,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn event_to_row(event: &Event) -> StoreResult<EventRow> {
    let workspace_ids =
        serde_json::to_value(event.workspace_ids()).map_err(StoreError::persistence)?;
    Ok(EventRow {
        id: event.id().into_inner(),
        workspace_ids,
        created_at: event.created_at(),
        provider_name: event.provider_name().map(str::to_owned),
        provider_event_id: event.provider_event_id().map(str::to_owned),
        event_type: event.event_type().to_owned(),
        status: event.status().as_str().to_owned(),
        content: event.content().map(str::to_owned),
        metadata: event.metadata().cloned(),
        classification_notes: event.classification_notes().map(str::to_owned),
    })
}

fn row_to_event(row: EventRow) -> StoreResult<Event> {
    let workspace_ids = serde_json::from_value::<Vec<WorkspaceId>>(row.workspace_ids)
        .map_err(StoreError::persistence)?;
    let status = EventStatus::try_from(row.status.as_str()).map_err(StoreError::persistence)?;
    Ok(Event::from_persisted(PersistedEventData {
        id: EventId::from_uuid(row.id),
        workspace_ids,
        created_at: row.created_at,
        provider_name: row.provider_name,
        provider_event_id: row.provider_event_id,
        event_type: row.event_type,
        status,
        content: row.content,
        metadata: row.metadata,
        classification_notes: row.classification_notes,
    }))
}

fn watcher_to_row(watcher: &EventWatcher) -> WatcherRow {
    WatcherRow {
        id: watcher.id().into_inner(),
        task_id: watcher.task_id().into_inner(),
        workspace_id: watcher.workspace_id().as_str().to_owned(),
        provider_name: watcher.provider_name().to_owned(),
        event_type: watcher.event_type().to_owned(),
        team_id: watcher.team_id().map(str::to_owned),
        organization_id: watcher.organization_id().map(str::to_owned),
        match_query: Value::from(watcher.match_query().clone()),
        created_at: watcher.created_at(),
    }
}

fn row_to_watcher(row: WatcherRow) -> StoreResult<EventWatcher> {
    let workspace_id = WorkspaceId::new(row.workspace_id).map_err(StoreError::persistence)?;
    let match_query = MatchQuery::new(row.match_query).map_err(StoreError::persistence)?;
    Ok(EventWatcher::from_persisted(PersistedEventWatcherData {
        id: EventWatcherId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        workspace_id,
        provider_name: row.provider_name,
        event_type: row.event_type,
        team_id: row.team_id,
        organization_id: row.organization_id,
        match_query,
        created_at: row.created_at,
    }))
}

fn activity_to_row(activity: &Activity) -> StoreResult<ActivityRow> {
    let (message_id, message_content) = match activity.body() {
        ActivityBody::Message {
            message_id,
            message_content,
            ..
        } => (Some(*message_id), Some(message_content.clone())),
        ActivityBody::Entry { .. } => (None, None),
    };
    let message_metadata = activity
        .body()
        .message_metadata()
        .map(serde_json::to_value)
        .transpose()
        .map_err(StoreError::persistence)?;
    let sequence_number = i64::try_from(activity.sequence_number().value())
        .map_err(StoreError::persistence)?;
    let links = activity.links();

    Ok(ActivityRow {
        id: activity.id().into_inner(),
        task_id: activity.task_id().into_inner(),
        sequence_number,
        parent_activity_id: links.parent_activity_id.map(ActivityId::into_inner),
        prev_activity_id: links.prev_activity_id.map(ActivityId::into_inner),
        next_activity_id: links.next_activity_id.map(ActivityId::into_inner),
        activity_type: activity.activity_type().to_owned(),
        occurred_at: activity.timestamp(),
        message_id,
        message_content,
        message_metadata,
        metadata: Value::Object(activity.metadata().clone()),
        ai_generated_data: activity.ai_generated_data().cloned().map(Value::Object),
    })
}

fn row_to_activity(row: ActivityRow) -> StoreResult<Activity> {
    let message_metadata = row
        .message_metadata
        .map(serde_json::from_value::<MessageMetadata>)
        .transpose()
        .map_err(StoreError::persistence)?;
    let body = match (
        row.activity_type.as_str(),
        row.message_id,
        row.message_content,
        message_metadata,
    ) {
        (MESSAGE_ACTIVITY, Some(message_id), Some(message_content), Some(metadata)) => {
            ActivityBody::Message {
                message_id,
                message_content,
                message_metadata: metadata,
            }
        }
        (MESSAGE_ACTIVITY, ..) => {
            return Err(StoreError::persistence(std::io::Error::other(format!(
                "message activity {} is missing message fields",
                row.id
            ))));
        }
        (_, _, _, metadata) => ActivityBody::Entry {
            activity_type: row.activity_type.clone(),
            message_metadata: metadata,
        },
    };
    let ai_generated_data = row.ai_generated_data.map(json_object).transpose()?;

    Ok(Activity::from_persisted(PersistedActivityData {
        id: ActivityId::from_uuid(row.id),
        task_id: TaskId::from_uuid(row.task_id),
        sequence_number: sequence_from_row(row.sequence_number)?,
        links: ActivityLinks {
            parent_activity_id: row.parent_activity_id.map(ActivityId::from_uuid),
            prev_activity_id: row.prev_activity_id.map(ActivityId::from_uuid),
            next_activity_id: row.next_activity_id.map(ActivityId::from_uuid),
        },
        timestamp: row.occurred_at,
        body,
        metadata: json_object(row.metadata)?,
        ai_generated_data,
    }))
}

fn sequence_from_row(value: i64) -> StoreResult<SequenceNumber> {
    let raw = u64::try_from(value).map_err(StoreError::persistence)?;
    SequenceNumber::new(raw).map_err(StoreError::persistence)
}

fn json_object(value: Value) -> StoreResult<Map<String, Value>> {
    match value {
        Value::Object(fields) => Ok(fields),
        Value::Null => Ok(Map::new()),
        other => Err(StoreError::persistence(std::io::Error::other(format!(
            "expected a JSON object, found {other}"
        )))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::domain::NewTask;
    use mockable::{Clock, DefaultClock};
    use rstest::{fixture, rstest};
    use serde_json::json;
    use uuid::Uuid;

    #[fixture]
    fn task() -> Task {
        Task::create(
            NewTask::new(WorkspaceId::new("acme").expect("valid workspace"), "Renew domain")
                .with_priority(TaskPriority::High)
                .with_authorized_users(["dana".to_owned()])
                .with_input(json!({ "domain": "example.com" })),
            &DefaultClock,
        )
        .expect("valid task")
    }

    fn entry_row(activity_type: &str, sequence_number: i64) -> ActivityRow {
        ActivityRow {
            id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            sequence_number,
            parent_activity_id: None,
            prev_activity_id: None,
            next_activity_id: None,
            activity_type: activity_type.to_owned(),
            occurred_at: DefaultClock.utc(),
            message_id: None,
            message_content: None,
            message_metadata: None,
            metadata: json!({ "note": "Task execution started." }),
            ai_generated_data: None,
        }
    }

    #[rstest]
    fn task_rows_use_storage_spellings(task: Task) {
        let row = task_to_row(&task).expect("row conversion");

        assert_eq!(row.status, "pending");
        assert_eq!(row.task_type, "default");
        assert_eq!(row.priority.as_deref(), Some("high"));
        assert_eq!(row.authorized_users, Some(json!(["dana"])));
        assert_eq!(row_to_task(row).expect("task conversion"), task);
    }

    #[rstest]
    fn unknown_stored_status_is_rejected(task: Task) {
        let mut row = task_to_row(&task).expect("row conversion");
        row.status = "paused".to_owned();

        let result = row_to_task(row);

        assert!(matches!(result, Err(StoreError::Persistence(_))));
    }

    #[rstest]
    fn entry_rows_become_entry_bodies() {
        let activity = row_to_activity(entry_row("system_update", 3)).expect("activity");

        assert_eq!(activity.activity_type(), "system_update");
        assert_eq!(activity.sequence_number().value(), 3);
        assert_eq!(
            activity.metadata().get("note"),
            Some(&json!("Task execution started."))
        );
    }

    #[rstest]
    #[case::message_without_fields(MESSAGE_ACTIVITY, 1)]
    #[case::zero_sequence("system_update", 0)]
    #[case::negative_sequence("system_update", -4)]
    fn inconsistent_activity_rows_are_rejected(#[case] activity_type: &str, #[case] sequence: i64) {
        let result = row_to_activity(entry_row(activity_type, sequence));

        assert!(matches!(result, Err(StoreError::Persistence(_))));
    }

    #[rstest]
    fn non_object_json_is_rejected() {
        assert!(json_object(json!(null)).is_ok_and(|fields| fields.is_empty()));
        assert!(json_object(json!([1, 2])).is_err());
    }
}
