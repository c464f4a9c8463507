//! Switchboard: agent routing and event-driven task orchestration.
//!
//! The crate has two halves. The router dispatches requests by path to a
//! tree of agents, lets agents call one another and expose themselves as
//! schema-validated tools, and streams their output. The task pipeline
//! records inbound provider events, matches them against standing
//! watchers, asks a classifier which tasks they create or touch, and drives
//! each task through tool selection while keeping an ordered activity log.
//!
//! # Architecture
//!
//! Both halves follow hexagonal architecture principles:
//!
//! - **Domain**: Pure types with no infrastructure dependencies
//! - **Ports**: Async trait interfaces for storage, models, and handlers
//! - **Adapters**: In-memory, `PostgreSQL`, and language model
//!   implementations of the ports
//! - **Services**: Orchestration over the ports
//!
//! # Modules
//!
//! - [`router`]: Path matching, middleware, agents, tools, and responses
//! - [`task`]: Tasks, events, watchers, activities, and their services
//! - [`config`]: TOML configuration
//! - [`telemetry`]: Logging initialisation

pub mod config;
pub mod router;
pub mod task;
pub mod telemetry;
