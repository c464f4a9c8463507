//! Step definitions for event intake scenarios.

mod given;
mod then;
mod when;
pub mod world;
