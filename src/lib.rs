//! devloop library
//!
//! Watches source trees, rebuilds a WebAssembly artifact when changes settle,
//! and serves the result for browser-based iteration.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod build;
pub mod config;
pub mod error;
pub mod server;
pub mod watcher;

pub use config::Config;
pub use error::{Error, Result};
