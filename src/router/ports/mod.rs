//! Handler contracts implemented by agents, middleware, and tools.

mod handler;

pub use handler::{Agent, Middleware, ToolHandler};
