//! When steps for task status BDD scenarios.

use super::world::{MoveOutcome, TaskStatusWorld, run_async};
use rstest_bdd_macros::when;
use switchboard::task::domain::TaskStatus;

#[when(r#"the task moves to "{status}""#)]
fn task_moves(world: &mut TaskStatusWorld, status: String) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    match TaskStatus::try_from(status.as_str()) {
        Ok(target) => {
            let result = run_async(world.service.transition_task(task_id, target));
            world.record(result);
        }
        Err(err) => world.last_move = Some(MoveOutcome::Unparsed(err)),
    }
    Ok(())
}

#[when("the task is archived")]
fn task_is_archived(world: &mut TaskStatusWorld) -> Result<(), eyre::Report> {
    let task_id = world.task()?.id();
    let result = run_async(world.service.archive_task(task_id));
    world.record(result);
    Ok(())
}
