//! In-memory adapters for task orchestration tests and local runs.

mod store;

pub use store::InMemoryTaskStore;
