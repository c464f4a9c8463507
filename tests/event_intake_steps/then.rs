//! Then steps for event intake BDD scenarios.

use super::world::{IntakeWorld, run_async};
use rstest_bdd_macros::then;
use switchboard::task::{
    domain::{EventId, EventStatus, TaskType},
    ports::EventRepository,
    services::IntakeError,
};

#[then("{count:usize} task is activated")]
fn one_task_activated(world: &IntakeWorld, count: usize) -> Result<(), eyre::Report> {
    tasks_activated(world, count)
}

#[then("{count:usize} tasks are activated")]
fn tasks_activated(world: &IntakeWorld, count: usize) -> Result<(), eyre::Report> {
    let activated = world.report()?.tasks.len();
    eyre::ensure!(activated == count, "expected {count} task(s), got {activated}");
    Ok(())
}

#[then(r#"the activated task is a "{task_type}" task"#)]
fn activated_task_type(world: &IntakeWorld, task_type: String) -> Result<(), eyre::Report> {
    let expected = TaskType::try_from(task_type.as_str())
        .map_err(|err| eyre::eyre!("invalid task type in scenario: {err}"))?;
    let task = world
        .report()?
        .tasks
        .first()
        .ok_or_else(|| eyre::eyre!("no task was activated"))?;
    eyre::ensure!(
        task.task_type() == expected,
        "expected a {expected:?} task, got {:?}",
        task.task_type()
    );
    Ok(())
}

#[then("the watcher task is activated")]
fn watcher_task_activated(world: &IntakeWorld) -> Result<(), eyre::Report> {
    let watcher_task = world
        .watcher_task
        .ok_or_else(|| eyre::eyre!("no watcher task was created in setup"))?;
    let activated: Vec<_> = world.report()?.tasks.iter().map(|task| task.id()).collect();
    eyre::ensure!(
        activated == [watcher_task],
        "expected only {watcher_task}, got {activated:?}"
    );
    Ok(())
}

#[then("the delivery is reported as a duplicate")]
fn delivery_is_duplicate(world: &IntakeWorld) -> Result<(), eyre::Report> {
    let report = world.report()?;
    eyre::ensure!(report.duplicate, "expected a duplicate report");
    eyre::ensure!(report.tasks.is_empty(), "duplicates activate nothing");
    Ok(())
}

#[then("intake fails with a classification error")]
fn intake_fails_with_classification_error(world: &IntakeWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_result
        .as_ref()
        .ok_or_else(|| eyre::eyre!("no event processed in scenario"))?;
    if !matches!(result, Err(IntakeError::Classification { .. })) {
        return Err(eyre::eyre!("expected a classification error, got {result:?}"));
    }
    Ok(())
}

#[then(r#"the event is "{status}""#)]
fn event_status_is(world: &IntakeWorld, status: String) -> Result<(), eyre::Report> {
    let expected = EventStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid event status in scenario: {err}"))?;
    let event_id = last_event_id(world)?;
    let event = run_async(world.store.find_event(event_id))?
        .ok_or_else(|| eyre::eyre!("event {event_id} missing from store"))?;
    eyre::ensure!(
        event.status() == expected,
        "expected event status {expected}, found {}",
        event.status()
    );
    Ok(())
}

fn last_event_id(world: &IntakeWorld) -> Result<EventId, eyre::Report> {
    match world.last_result.as_ref() {
        Some(Ok(report)) => Ok(report.event_id),
        Some(Err(IntakeError::Classification { event_id, .. })) => Ok(*event_id),
        Some(Err(err)) => Err(eyre::eyre!("intake failed before recording: {err}")),
        None => Err(eyre::eyre!("no event processed in scenario")),
    }
}
