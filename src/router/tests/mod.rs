//! Unit tests for the router module.
//!
//! Pure path and schema logic is tested on its own; dispatch tests drive a
//! real [`crate::router::services::AgentRouter`] with small test handlers.

mod support;
