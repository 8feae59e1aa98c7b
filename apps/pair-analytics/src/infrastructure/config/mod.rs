//! Configuration Module
//!
//! Environment-driven configuration for the pipeline process.

mod settings;

pub use settings::{AppConfig, ConfigError, FeedSettings, PipelineSettings, ServerSettings};
