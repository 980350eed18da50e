//! Client storage: a small SQLite-backed key/value table.
//!
//! `repo` holds the SQL-only functions (pool setup, get/set/remove).
//! Callers import from `bistro::db`; the repository API is re-exported here.

pub mod repo;

pub use repo::*;
