//! Given steps for agent routing BDD scenarios.

use super::world::{Around, Labelled, RoutingWorld, SelfCalling};
use rstest_bdd_macros::given;
use switchboard::router::services::{AgentRouter, RouterOptions};

#[given(r#"agents registered at "{first}", "{second}" and "{third}""#)]
fn agents_registered(world: &mut RoutingWorld, first: String, second: String, third: String) {
    for path in [first, second, third] {
        world.router.agent(&path, Labelled(path.clone()));
    }
}

#[given(r#"an agent registered at "{path}""#)]
fn agent_registered(world: &mut RoutingWorld, path: String) {
    world.router.agent(&path, Labelled(path.clone()));
}

#[given(r#"a self-calling agent registered at "{path}""#)]
fn self_calling_agent(world: &mut RoutingWorld, path: String) {
    world.router.agent(&path, SelfCalling);
}

#[given(r#"middleware "{label}" on "{pattern}""#)]
fn middleware_on(world: &mut RoutingWorld, label: String, pattern: String) {
    let layer = Around {
        label,
        trace: world.trace.clone(),
    };
    world.router.use_middleware(&pattern, layer);
}

#[given("a router allowing a call depth of {depth:usize}")]
fn router_with_depth(world: &mut RoutingWorld, depth: usize) {
    world.router = AgentRouter::with_options(RouterOptions {
        max_call_depth: depth,
    });
}
