//! Given steps for event intake BDD scenarios.

use super::world::{IntakeWorld, run_async, slack_delivery};
use eyre::WrapErr;
use rstest_bdd_macros::given;
use serde_json::{Map, json};
use switchboard::task::{
    domain::{ClassificationResult, NewTaskPlan, TaskPriority, WatcherPlan},
    ports::{ClassificationError, ModelError},
};

#[given(r#"a classifier that plans a watcher task "{name}" on channel "{channel}""#)]
fn classifier_plans_watcher(world: &mut IntakeWorld, name: String, channel: String) {
    let mut match_query = Map::new();
    match_query.insert("event".to_owned(), json!({ "channel": channel }));
    world.classifier.push(Ok(ClassificationResult {
        new_tasks: vec![NewTaskPlan {
            description: format!("{name}, requested in {channel}."),
            name,
            priority: TaskPriority::Medium,
            input: None,
            scheduled_for: None,
            watcher: Some(WatcherPlan {
                provider_name: "slack".to_owned(),
                event_type: "message".to_owned(),
                match_query,
            }),
        }],
        existing_task_ids: Vec::new(),
        notes: "Created a watcher task.".to_owned(),
    }));
}

#[given("a classifier that finds nothing")]
fn classifier_finds_nothing(world: &mut IntakeWorld) {
    world
        .classifier
        .push(Ok(ClassificationResult::empty("Nothing to do.")));
}

#[given(r#"a classifier that fails with "{message}""#)]
fn classifier_fails(world: &mut IntakeWorld, message: String) {
    world.classifier.push(Err(ClassificationError::Model(
        ModelError::MalformedResponse(message),
    )));
}

#[given(r#"slack message "{event_id}" saying "{text}" has arrived on channel "{channel}""#)]
fn message_has_arrived(
    world: &mut IntakeWorld,
    event_id: String,
    text: String,
    channel: String,
) -> Result<(), eyre::Report> {
    let incoming = slack_delivery(&event_id, &text, &channel)?;
    let report = run_async(world.service.process_incoming_event(incoming))
        .wrap_err("process setup event")?;
    if world.watcher_task.is_none() {
        world.watcher_task = report.tasks.first().map(|task| task.id());
    }
    world.last_result = Some(Ok(report));
    Ok(())
}
