//! Adapter implementations for task orchestration ports.

pub mod llm;
pub mod memory;
pub mod postgres;
pub mod router_executor;

pub use router_executor::RouterToolExecutor;
