//! Persistence Adapters
//!
//! SQLite-backed implementation of the [`BarRepository`](crate::application::ports::BarRepository) port.

mod sqlite;

pub use sqlite::SqliteBarRepository;
