//! HTTP serving and process-level observability.
//!
//! This module provides:
//! - Static file serving of build artifacts using axum
//! - Tracing subscriber setup

mod app;
mod observability;

pub use app::{App, ServerConfig};
pub use observability::{init_tracing, TracingConfig};
