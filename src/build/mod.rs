//! Build command construction and supervision.
//!
//! This module provides:
//! - Compiler invocation built from a [`BuildSpec`]
//! - A [`BuildRunner`] seam with a child-process implementation
//! - A [`BuildSupervisor`] that serializes builds across watch roots

mod command;
mod supervisor;

pub use command::{BuildCommand, BuildSpec, OptLevel};
pub use supervisor::{BuildResult, BuildRunner, BuildSupervisor, CommandRunner};
