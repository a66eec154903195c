//! Repository layer over SQLite.
//!
//! # Responsibility
//! - Keep SQL details behind the storage traits the history layer uses.
//!
//! # Invariants
//! - Repositories only run against connections returned by `db::open_db*`.

pub mod snapshot_repo;
