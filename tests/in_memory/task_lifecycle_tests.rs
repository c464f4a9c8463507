//! In-memory integration tests for task lifecycle operations.

use std::sync::Arc;

use super::helpers::{clock, store, workspace};
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use serde_json::{Map, json};
use switchboard::task::{
    adapters::memory::InMemoryTaskStore,
    domain::{
        EventWatcher, MatchQuery, NewEventWatcher, NewTask, Task, TaskDomainError, TaskPriority,
        TaskStatus, TaskType,
    },
    ports::{EventWatcherRepository, StoreError, TaskRepository},
    services::{TaskLifecycleError, TaskLifecycleService},
};

type TestService = TaskLifecycleService<InMemoryTaskStore, DefaultClock>;

struct Harness {
    store: Arc<InMemoryTaskStore>,
    service: TestService,
}

#[fixture]
fn harness(store: Arc<InMemoryTaskStore>, clock: Arc<DefaultClock>) -> Harness {
    Harness {
        service: TaskLifecycleService::new(Arc::clone(&store), clock),
        store,
    }
}

/// Asserts the recent task list holds exactly the expected IDs in order.
///
/// # Errors
///
/// Returns an error if the IDs differ.
fn assert_task_ids(found: &[Task], expected: &[&Task]) -> Result<(), eyre::Report> {
    let found_ids: Vec<_> = found.iter().map(Task::id).collect();
    let expected_ids: Vec<_> = expected.iter().map(|task| task.id()).collect();
    eyre::ensure!(
        found_ids == expected_ids,
        "expected {expected_ids:?}, found {found_ids:?}"
    );
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn created_task_can_be_found(harness: Harness) {
    let created = harness
        .service
        .create_task(
            NewTask::new(workspace("acme"), "Draft Q4 sales report")
                .with_priority(TaskPriority::High)
                .with_input(json!({ "quarter": "Q4" })),
        )
        .await
        .expect("task creation should succeed");

    let found = harness
        .service
        .find_task(created.id())
        .await
        .expect("lookup should succeed");

    assert_eq!(found, Some(created));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn task_runs_through_to_completion(harness: Harness) {
    let created = harness
        .service
        .create_task(NewTask::new(workspace("acme"), "Renew domain"))
        .await
        .expect("task creation should succeed");

    for target in [TaskStatus::Progress, TaskStatus::InputAwait, TaskStatus::Completed] {
        harness
            .service
            .transition_task(created.id(), target)
            .await
            .expect("transition should succeed");
    }
    let result = harness
        .service
        .transition_task(created.id(), TaskStatus::Progress)
        .await;

    assert!(matches!(
        result,
        Err(TaskLifecycleError::Domain(
            TaskDomainError::InvalidStatusTransition {
                from: TaskStatus::Completed,
                to: TaskStatus::Progress,
                ..
            }
        ))
    ));
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn archiving_hides_task_and_drops_watchers(harness: Harness) -> Result<(), eyre::Report> {
    let kept = harness
        .service
        .create_task(NewTask::new(workspace("acme"), "Kept").with_provider_name("slack"))
        .await?;
    let watched = harness
        .service
        .create_task(
            NewTask::new(workspace("acme"), "Watched")
                .with_task_type(TaskType::Watcher)
                .with_provider_name("slack"),
        )
        .await?;
    let mut channel = Map::new();
    channel.insert("channel".to_owned(), json!("C1"));
    let watcher = EventWatcher::create(
        NewEventWatcher::new(
            watched.id(),
            workspace("acme"),
            "slack",
            "message",
            MatchQuery::new(json!({ "event": channel }))?,
        ),
        &DefaultClock,
    );
    harness.store.store_watcher(&watcher).await?;

    let archived = harness.service.archive_task(watched.id()).await?;

    eyre::ensure!(archived.status() == TaskStatus::Archived, "task not archived");
    let watchers = harness.store.find_watchers_for_task(watched.id()).await?;
    eyre::ensure!(watchers.is_empty(), "watchers should be removed");
    let recent = harness
        .store
        .find_recent_tasks(&workspace("acme"), Some("slack"), 10)
        .await?;
    assert_task_ids(&recent, &[&kept])
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn missing_task_cannot_transition(harness: Harness) {
    let stray = Task::create(NewTask::new(workspace("acme"), "Stray"), &DefaultClock)
        .expect("valid task");

    let result = harness
        .service
        .transition_task(stray.id(), TaskStatus::Progress)
        .await;

    assert!(matches!(
        result,
        Err(TaskLifecycleError::Store(StoreError::TaskNotFound(id))) if id == stray.id()
    ));
}
