//! Event-driven task orchestration.
//!
//! Inbound provider events are recorded once per provider identifier,
//! matched against standing event watchers, and classified into new or
//! existing tasks. Tasks are then driven to a terminal status by selecting
//! (and optionally executing) tools, with every step appended to a
//! per-task activity log whose sequence numbers are assigned atomically by
//! the store.
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
