//! Configuration for managed interpreter processes.
//!
//! This module provides [`InterpreterConfig`] and [`InterpreterConfigBuilder`].
//!
//! # Example
//!
//! ```ignore
//! use blockrun::config::InterpreterConfig;
//!
//! // Just a path
//! let config = InterpreterConfig::for_program("/bin/bash")?;
//!
//! // Fully specified
//! let config = InterpreterConfig::builder()
//!     .program("/bin/bash")
//!     .args(["--noprofile", "--norc"])
//!     .working_directory("/srv/docs")
//!     .inherit_env(false)
//!     .env("PATH", "/usr/bin:/bin")
//!     .build()?;
//! ```

pub mod builder;

pub use builder::{InterpreterConfig, InterpreterConfigBuilder, DEFAULT_STDERR_GRACE};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accessible() {
        let _ = InterpreterConfig::builder();
        assert!(DEFAULT_STDERR_GRACE.as_millis() > 0);
    }
}
