//! Router orchestration services.

mod router;

pub(crate) use router::Invocation;
pub use router::{AgentRouter, DEFAULT_MAX_CALL_DEPTH, Next, RouterOptions};
