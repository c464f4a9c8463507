//! Unit tests for the task module.
//!
//! Tests are organised by concern: domain rules, the in-memory store, the
//! lifecycle, intake and processor services, and the model-backed adapters.

mod support;
