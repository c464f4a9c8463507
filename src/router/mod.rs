//! Path-based agent routing.
//!
//! Requests are dispatched by path through ordered middleware layers to a
//! terminal agent or tool handler. Handlers can call each other by relative
//! or absolute path, expose agents as schema-validated tools, and stream
//! output through a shared response writer.
//!
//! - Domain types in [`domain`]
//! - Handler contracts in [`ports`]
//! - The router itself in [`services`]

pub mod context;
pub mod domain;
pub mod ports;
pub mod response;
pub mod services;

#[cfg(test)]
mod tests;
