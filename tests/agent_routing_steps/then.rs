//! Then steps for agent routing BDD scenarios.

use super::world::RoutingWorld;
use rstest_bdd_macros::then;
use serde_json::json;
use switchboard::router::domain::RouterError;

#[then(r#"the request is handled by "{pattern}""#)]
fn handled_by(world: &RoutingWorld, pattern: String) -> Result<(), eyre::Report> {
    let response = world.response()?;
    match &response.outcome {
        Ok(output) if *output == json!({ "handled_by": pattern }) => Ok(()),
        other => Err(eyre::eyre!("expected {pattern} to answer, got {other:?}")),
    }
}

#[then(r#"the trace reads "{expected}""#)]
fn trace_reads(world: &RoutingWorld, expected: String) -> Result<(), eyre::Report> {
    let actual = world.trace.entries().join(", ");
    eyre::ensure!(actual == expected, "expected trace {expected}, got {actual}");
    Ok(())
}

#[then("the request fails because the call depth was exceeded")]
fn call_depth_exceeded(world: &RoutingWorld) -> Result<(), eyre::Report> {
    let response = world.response()?;
    if !matches!(response.outcome, Err(RouterError::MaxCallDepthExceeded(_))) {
        return Err(eyre::eyre!(
            "expected MaxCallDepthExceeded, got {:?}",
            response.outcome
        ));
    }
    Ok(())
}

#[then(r#"the request fails because nothing handles "{path}""#)]
fn nothing_handles(world: &RoutingWorld, path: String) -> Result<(), eyre::Report> {
    let response = world.response()?;
    match &response.outcome {
        Err(RouterError::NotFound(missing)) if *missing == path => Ok(()),
        other => Err(eyre::eyre!("expected NotFound({path}), got {other:?}")),
    }
}
