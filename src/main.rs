//! devloop - watch, rebuild and serve
//!
//! Entry point for the devloop daemon.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use devloop::build::{BuildSpec, BuildSupervisor, CommandRunner, OptLevel};
use devloop::server::{init_tracing, App};
use devloop::watcher::{
    spawn_watch, DebouncePolicy, FilterConfig, WatchLoopConfig, DEFAULT_BACKUP_SUFFIX,
    DEFAULT_GENERATED_DIR,
};
use devloop::{Config, Result};
use tokio_util::sync::CancellationToken;

/// devloop - rebuild on change, serve the result
#[derive(Parser, Debug)]
#[command(name = "devloop")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Compiler executable used for builds
    #[arg(env = "DEVLOOP_COMPILER", default_value = "odin")]
    compiler: PathBuf,

    /// Skip the initial build
    #[arg(long, env = "DEVLOOP_NO_BUILD")]
    no_build: bool,

    /// Do not watch for changes
    #[arg(long, env = "DEVLOOP_NO_WATCH")]
    no_watch: bool,

    /// Directories to watch for changes
    #[arg(
        short,
        long,
        env = "DEVLOOP_WATCH_DIRS",
        value_delimiter = ',',
        default_values = ["../", "../../shared/"]
    )]
    watch: Vec<PathBuf>,

    /// Watch directories recursively
    #[arg(long, env = "DEVLOOP_RECURSIVE")]
    recursive: bool,

    /// Package directory passed to the compiler
    #[arg(long, env = "DEVLOOP_SOURCE", default_value = "../")]
    source: PathBuf,

    /// Output artifact path
    #[arg(long, env = "DEVLOOP_OUT", default_value = "_main.wasm")]
    out: PathBuf,

    /// Compilation target
    #[arg(long, env = "DEVLOOP_TARGET", default_value = "js_wasm32")]
    target: String,

    /// Optimization level
    #[arg(long, env = "DEVLOOP_OPT", value_enum, default_value_t = OptLevel::Minimal)]
    opt: OptLevel,

    /// Extra argument appended to the build command (repeatable)
    #[arg(long = "build-arg", env = "DEVLOOP_BUILD_ARGS", value_delimiter = ',', allow_hyphen_values = true)]
    build_args: Vec<String>,

    /// Host address to bind to
    #[arg(long, env = "DEVLOOP_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "DEVLOOP_PORT", default_value = "3000")]
    port: u16,

    /// Directory served over HTTP
    #[arg(long, env = "DEVLOOP_SERVE_DIR", default_value = ".")]
    serve_dir: PathBuf,

    /// Debounce threshold in milliseconds
    #[arg(long, env = "DEVLOOP_DEBOUNCE_MS", default_value = "200")]
    debounce_ms: u64,

    /// Debounce check interval in milliseconds
    #[arg(long, env = "DEVLOOP_TICK_MS", default_value = "100")]
    tick_ms: u64,

    /// What the debounce window is measured from
    #[arg(long, env = "DEVLOOP_POLICY", value_enum, default_value_t = DebouncePolicy::SinceLastBuild)]
    policy: DebouncePolicy,

    /// File suffixes that never trigger a rebuild
    #[arg(long, env = "DEVLOOP_BACKUP_SUFFIXES", value_delimiter = ',', default_values = [DEFAULT_BACKUP_SUFFIX])]
    backup_suffix: Vec<String>,

    /// Generated-output directory names that never trigger a rebuild
    #[arg(long, env = "DEVLOOP_GENERATED_DIRS", value_delimiter = ',', default_values = [DEFAULT_GENERATED_DIR])]
    generated_dir: Vec<String>,

    /// Extra gitignore-style patterns that never trigger a rebuild
    #[arg(long, env = "DEVLOOP_IGNORE", value_delimiter = ',')]
    ignore: Vec<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "DEVLOOP_LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Enable JSON logging output
    #[arg(long, env = "DEVLOOP_LOG_JSON")]
    log_json: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            host: self.host,
            port: self.port,
            serve_dir: self.serve_dir,
            log_level: self.log_level,
            log_json: self.log_json,
            initial_build: !self.no_build,
            watch: !self.no_watch,
            watch_dirs: self.watch,
            recursive: self.recursive,
            watch_loop: WatchLoopConfig {
                tick: Duration::from_millis(self.tick_ms),
                debounce: Duration::from_millis(self.debounce_ms),
                policy: self.policy,
            },
            filter: FilterConfig {
                backup_suffixes: self.backup_suffix,
                generated_dirs: self.generated_dir,
                ignore_patterns: self.ignore,
            },
            build: BuildSpec {
                compiler: self.compiler,
                source: self.source,
                output: self.out,
                target: self.target,
                opt: self.opt,
                extra_args: self.build_args,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Cli::parse().into_config();

    init_tracing(&config.tracing_config());

    tracing::info!("devloop v{} starting...", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?config, "Configuration loaded");

    config.validate()?;

    let supervisor = Arc::new(BuildSupervisor::new(CommandRunner::new(
        config.build_command(),
    )));

    if config.initial_build {
        supervisor.build().await;
    }

    let shutdown = CancellationToken::new();
    let mut watch_handles = Vec::new();

    if config.watch {
        for dir in &config.watch_dirs {
            let root = match std::fs::canonicalize(dir) {
                Ok(root) => root,
                Err(e) => {
                    tracing::error!(path = %dir.display(), error = %e, "Cannot resolve watch directory");
                    continue;
                }
            };

            match spawn_watch(
                &root,
                config.recursive,
                &config.filter,
                Arc::clone(&supervisor),
                config.watch_loop,
                shutdown.clone(),
            ) {
                Ok(handle) => watch_handles.push(handle),
                Err(e) => tracing::error!(path = %root.display(), error = %e, "Failed to start watcher"),
            }
        }
    }

    let app = App::new(config.server_config());
    let served = app.run(shutdown.clone()).await;
    shutdown.cancel();

    for result in futures::future::join_all(watch_handles).await {
        if let Err(e) = result {
            tracing::error!(error = %e, "Watch loop panicked");
        }
    }

    served
}
