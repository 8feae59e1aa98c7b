//! Port Interfaces
//!
//! ## Driven Ports (Outbound)
//!
//! - `BarRepository`: durable, idempotent storage of resampled bars

mod bar_repository;

pub use bar_repository::{BarRepository, InMemoryBarRepository, PersistenceError};
