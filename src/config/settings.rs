//! Configuration settings and validation.

use crate::build::{BuildCommand, BuildSpec};
use crate::server::{ServerConfig, TracingConfig};
use crate::watcher::{FilterConfig, WatchLoopConfig};
use crate::{Error, Result};
use std::path::PathBuf;

/// Main configuration for the devloop daemon.
#[derive(Debug, Clone)]
pub struct Config {
    /// Host address to bind to.
    pub host: String,

    /// Port to listen on.
    pub port: u16,

    /// Directory served over HTTP.
    pub serve_dir: PathBuf,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON logs.
    pub log_json: bool,

    /// Run a build before watching starts.
    pub initial_build: bool,

    /// Watch source directories for changes.
    pub watch: bool,

    /// Directories to watch.
    pub watch_dirs: Vec<PathBuf>,

    /// Watch directories recursively.
    pub recursive: bool,

    /// Debounce timing and policy.
    pub watch_loop: WatchLoopConfig,

    /// Event filter settings.
    pub filter: FilterConfig,

    /// What to build.
    pub build: BuildSpec,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            serve_dir: PathBuf::from("."),
            log_level: "info".to_string(),
            log_json: false,
            initial_build: true,
            watch: true,
            watch_dirs: vec![PathBuf::from("../"), PathBuf::from("../../shared/")],
            recursive: false,
            watch_loop: WatchLoopConfig::default(),
            filter: FilterConfig::default(),
            build: BuildSpec::default(),
        }
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            return Err(Error::config("port cannot be 0"));
        }

        if self.host.is_empty() {
            return Err(Error::config("host cannot be empty"));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.watch_loop.tick.is_zero() {
            return Err(Error::config("tick interval cannot be 0"));
        }

        if self.build.compiler.as_os_str().is_empty() {
            return Err(Error::config("compiler path cannot be empty"));
        }

        if self.watch && self.watch_dirs.is_empty() {
            return Err(Error::config(
                "at least one watch directory is required unless watching is disabled",
            ));
        }

        if self.filter.backup_suffixes.iter().any(String::is_empty) {
            return Err(Error::config("backup suffix cannot be empty"));
        }

        Ok(())
    }

    /// Resolve the build command.
    #[must_use]
    pub fn build_command(&self) -> BuildCommand {
        BuildCommand::from_spec(&self.build)
    }

    /// Settings for the HTTP server.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            serve_dir: self.serve_dir.clone(),
            ..ServerConfig::default()
        }
    }

    /// Settings for the tracing subscriber.
    #[must_use]
    pub fn tracing_config(&self) -> TracingConfig {
        TracingConfig {
            level: self.log_level.clone(),
            json: self.log_json,
        }
    }
}
