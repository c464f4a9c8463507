//! When steps for agent routing BDD scenarios.

use super::world::{RoutingWorld, run_async};
use rstest_bdd_macros::when;
use switchboard::router::context::AgentRequest;

#[when(r#"a request is sent to "{path}""#)]
fn request_sent(world: &mut RoutingWorld, path: String) {
    let response = run_async(
        world
            .router
            .handle(&path, AgentRequest::from_user_text("hello")),
    );
    world.response = Some(response);
}
