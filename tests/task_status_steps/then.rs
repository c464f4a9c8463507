//! Then steps for task status BDD scenarios.

use super::world::{MoveOutcome, TaskStatusWorld, run_async};
use rstest_bdd_macros::then;
use switchboard::task::{
    domain::{TaskDomainError, TaskStatus},
    ports::{EventWatcherRepository, TaskRepository},
    services::TaskLifecycleError,
};

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &TaskStatusWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task_id = world.task()?.id();
    let stored = run_async(world.store.find_task(task_id))?
        .ok_or_else(|| eyre::eyre!("task {task_id} missing from store"))?;

    if stored.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            stored.status()
        ));
    }
    Ok(())
}

#[then("the move is rejected as an invalid status transition")]
fn move_rejected_as_invalid_transition(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    let outcome = world
        .last_move
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing move outcome"))?;

    if !matches!(
        outcome,
        MoveOutcome::Applied(Err(TaskLifecycleError::Domain(
            TaskDomainError::InvalidStatusTransition { .. }
        )))
    ) {
        return Err(eyre::eyre!(
            "expected InvalidStatusTransition error, got {outcome:?}"
        ));
    }
    Ok(())
}

#[then("the move is rejected as an unknown status")]
fn move_rejected_as_unknown_status(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    let outcome = world
        .last_move
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing move outcome"))?;

    if !matches!(outcome, MoveOutcome::Unparsed(_)) {
        return Err(eyre::eyre!("expected an unknown status error, got {outcome:?}"));
    }
    Ok(())
}

#[then("the task has no watchers")]
fn task_has_no_watchers(world: &TaskStatusWorld) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let watchers = run_async(world.store.find_watchers_for_task(task_id))?;

    if !watchers.is_empty() {
        return Err(eyre::eyre!("expected no watchers, found {}", watchers.len()));
    }
    Ok(())
}
