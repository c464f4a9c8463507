//! When steps for event intake BDD scenarios.

use super::world::{IntakeWorld, run_async, slack_delivery};
use rstest_bdd_macros::when;

#[when(r#"slack message "{event_id}" saying "{text}" arrives on channel "{channel}""#)]
fn message_arrives(
    world: &mut IntakeWorld,
    event_id: String,
    text: String,
    channel: String,
) -> Result<(), eyre::Report> {
    let incoming = slack_delivery(&event_id, &text, &channel)?;
    let result = run_async(world.service.process_incoming_event(incoming));
    world.last_result = Some(result);
    Ok(())
}
