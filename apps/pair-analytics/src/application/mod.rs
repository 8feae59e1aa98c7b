//! Application Layer - Use cases and port definitions.
//!
//! Services here orchestrate the domain stores and talk to the outside
//! world only through the ports.

/// Port interfaces for durable storage.
pub mod ports;

/// Resample loop and analytics query service.
pub mod services;
