//! Given steps for task status BDD scenarios.

use super::world::{TaskStatusWorld, run_async};
use eyre::WrapErr;
use mockable::DefaultClock;
use rstest_bdd_macros::given;
use serde_json::json;
use switchboard::task::{
    domain::{EventWatcher, MatchQuery, NewEventWatcher, NewTask, TaskStatus, WorkspaceId},
    ports::EventWatcherRepository,
};

#[given(r#"a pending task named "{name}""#)]
fn pending_task(world: &mut TaskStatusWorld, name: String) -> Result<(), eyre::Report> {
    let workspace = WorkspaceId::new("acme").wrap_err("build workspace id")?;
    let created = run_async(world.service.create_task(NewTask::new(workspace, name)))
        .wrap_err("create task for status scenario")?;
    world.task = Some(created);
    Ok(())
}

#[given(r#"the task has moved to "{status}""#)]
fn task_has_moved(world: &mut TaskStatusWorld, status: String) -> Result<(), eyre::Report> {
    let target = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid status in scenario setup: {err}"))?;
    let task_id = world.task()?.id();
    let moved = run_async(world.service.transition_task(task_id, target))
        .wrap_err("move task in scenario setup")?;
    world.task = Some(moved);
    Ok(())
}

#[given(r#"the task watches "{provider}" "{event_type}" events"#)]
fn task_watches(
    world: &mut TaskStatusWorld,
    provider: String,
    event_type: String,
) -> Result<(), eyre::Report> {
    let task = world.task()?;
    let query = MatchQuery::new(json!({ "event": { "channel": "C1" } }))
        .wrap_err("build match query")?;
    let watcher = EventWatcher::create(
        NewEventWatcher::new(
            task.id(),
            task.workspace_id().clone(),
            provider,
            event_type,
            query,
        ),
        &DefaultClock,
    );
    run_async(world.store.store_watcher(&watcher)).wrap_err("store watcher")?;
    Ok(())
}
