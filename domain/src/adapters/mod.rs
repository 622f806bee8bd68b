//! Adapters that live inside the domain crate because they need no IO.
//!
//! The mock user source and the in-memory store are used by tests and local
//! demos. Real adapters (SQLite, HTTP) live in separate crates.

pub mod internal_api;
pub mod memory_store;
