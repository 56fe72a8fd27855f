//! Build command construction.

use std::fmt;
use std::path::PathBuf;

/// Compiler optimization level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OptLevel {
    /// Fast compile, small debug-friendly output.
    #[default]
    Minimal,
    /// Optimize for speed with runtime checks disabled.
    Speed,
    /// Most aggressive optimization with runtime checks disabled.
    Aggressive,
}

impl OptLevel {
    /// Name passed to the compiler's `-o:` flag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Speed => "speed",
            Self::Aggressive => "aggressive",
        }
    }

    const fn disables_checks(self) -> bool {
        !matches!(self, Self::Minimal)
    }
}

/// What to build and where to put it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    /// Compiler executable.
    pub compiler: PathBuf,
    /// Package directory handed to the compiler.
    pub source: PathBuf,
    /// Output artifact path.
    pub output: PathBuf,
    /// Target platform.
    pub target: String,
    /// Optimization level.
    pub opt: OptLevel,
    /// Extra arguments appended verbatim.
    pub extra_args: Vec<String>,
}

impl Default for BuildSpec {
    fn default() -> Self {
        Self {
            compiler: PathBuf::from("odin"),
            source: PathBuf::from("../"),
            output: PathBuf::from("_main.wasm"),
            target: "js_wasm32".to_string(),
            opt: OptLevel::Minimal,
            extra_args: Vec::new(),
        }
    }
}

/// A fully resolved external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommand {
    program: PathBuf,
    args: Vec<String>,
}

impl BuildCommand {
    /// Create a command from a program and its arguments.
    pub fn new(
        program: impl Into<PathBuf>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve the compiler invocation for `spec`.
    #[must_use]
    pub fn from_spec(spec: &BuildSpec) -> Self {
        let mut args = vec![
            "build".to_string(),
            spec.source.display().to_string(),
            format!("-out:{}", spec.output.display()),
            format!("-target:{}", spec.target),
            format!("-o:{}", spec.opt.as_str()),
        ];
        if spec.opt.disables_checks() {
            args.push("-disable-assert".to_string());
            args.push("-no-bounds-check".to_string());
        }
        args.extend(spec.extra_args.iter().cloned());

        Self {
            program: spec.compiler.clone(),
            args,
        }
    }

    /// Executable to run.
    #[must_use]
    pub fn program(&self) -> &PathBuf {
        &self.program
    }

    /// Arguments passed to the executable.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for BuildCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
