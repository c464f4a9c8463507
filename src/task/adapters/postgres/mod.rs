//! `PostgreSQL` adapters for task orchestration persistence.

mod models;
mod repository;
mod schema;

pub use repository::{PostgresTaskStore, TaskPgPool};
