//! Configuration management for devloop.
//!
//! Supports configuration from:
//! - Command-line arguments (highest priority)
//! - Environment variables (`DEVLOOP_*`)
//! - Built-in defaults (lowest priority)

mod settings;

pub use settings::Config;
