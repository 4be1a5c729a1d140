//! Interpreter configuration and builder.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use blockrun::config::InterpreterConfig;
//!
//! let config = InterpreterConfig::builder()
//!     .program("/bin/bash")
//!     .arg("--noprofile")
//!     .env("LC_ALL", "C")
//!     .stderr_grace(Duration::from_millis(250))
//!     .build()?;
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

/// How long stderr may lag behind stdout's completion marker.
pub const DEFAULT_STDERR_GRACE: Duration = Duration::from_millis(500);

/// Configuration for a managed interpreter process.
///
/// Use [`InterpreterConfig::builder()`] to create a new configuration.
#[derive(Debug, Clone)]
pub struct InterpreterConfig {
    pub(crate) program: String,
    pub(crate) args: Vec<String>,

    // Process environment
    pub(crate) working_directory: Option<PathBuf>,
    pub(crate) env_vars: HashMap<String, String>,
    pub(crate) inherit_env: bool,

    // Output framing
    pub(crate) stderr_grace: Duration,
}

impl InterpreterConfig {
    /// Create a new builder for InterpreterConfig.
    pub fn builder() -> InterpreterConfigBuilder {
        InterpreterConfigBuilder::default()
    }

    /// Configuration for `program` with every other option at its default.
    pub fn for_program(program: impl Into<String>) -> Result<Self> {
        Self::builder().program(program).build()
    }

    /// Path or name of the interpreter executable.
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Arguments passed to the interpreter.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory if set.
    pub fn working_directory(&self) -> Option<&PathBuf> {
        self.working_directory.as_ref()
    }

    /// Grace period granted to stderr after stdout completes.
    pub fn stderr_grace(&self) -> Duration {
        self.stderr_grace
    }
}

/// Builder for [`InterpreterConfig`].
///
/// The interpreter path is validated when [`build()`](InterpreterConfigBuilder::build)
/// is called. Whether it is actually executable is only known at start.
#[derive(Debug, Clone)]
pub struct InterpreterConfigBuilder {
    program: String,
    args: Vec<String>,
    working_directory: Option<PathBuf>,
    env_vars: HashMap<String, String>,
    inherit_env: bool,
    stderr_grace: Duration,
}

impl Default for InterpreterConfigBuilder {
    fn default() -> Self {
        Self {
            program: String::new(),
            args: Vec::new(),
            working_directory: None,
            env_vars: HashMap::new(),
            inherit_env: true,
            stderr_grace: DEFAULT_STDERR_GRACE,
        }
    }
}

impl InterpreterConfigBuilder {
    /// Set the interpreter executable, e.g. `/bin/bash`.
    pub fn program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory of the interpreter.
    pub fn working_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    /// Set an environment variable for the interpreter.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Whether the interpreter inherits the parent environment (default: true).
    pub fn inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// How long to keep reading stderr once stdout has completed.
    pub fn stderr_grace(mut self, grace: Duration) -> Self {
        self.stderr_grace = grace;
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if no interpreter path was given.
    pub fn build(self) -> Result<InterpreterConfig> {
        if self.program.trim().is_empty() {
            return Err(Error::invalid_argument("interpreter path cannot be empty"));
        }

        Ok(InterpreterConfig {
            program: self.program,
            args: self.args,
            working_directory: self.working_directory,
            env_vars: self.env_vars,
            inherit_env: self.inherit_env,
            stderr_grace: self.stderr_grace,
        })
    }
}
