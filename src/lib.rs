//! # blockrun
//!
//! Process I/O core for running code blocks extracted from documents.
//!
//! This library provides:
//! - A line scanner that turns a byte stream into a channel of lines, with an
//!   inactivity timeout and detection of misbehaving sources
//! - A managed interpreter: a long-lived shell that runs one command at a time
//!   and returns its stdout and stderr
//! - The JSON response object handed to the web layer
//!
//! ## Quick Start
//!
//! ```ignore
//! use blockrun::{ManagedInterpreter, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let shell = ManagedInterpreter::new("/bin/bash")?;
//!     shell.start()?;
//!     let output = shell.execute("echo hello").await?;
//!     println!("{}", output.stdout);
//!     shell.stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Scanning Lines
//!
//! ```ignore
//! use std::time::Duration;
//! use blockrun::scanner::{scan, ReaderSource};
//!
//! let mut lines = scan(Duration::from_secs(1), "build log", ReaderSource::new(reader));
//! while let Some(line) = lines.recv().await {
//!     println!("{line}");
//! }
//! ```
//!
//! ## Web Responses
//!
//! ```ignore
//! use blockrun::ExecResponse;
//!
//! let body = ExecResponse::from_result(shell.execute(block).await).to_json()?;
//! ```

pub mod config;
mod error;
pub mod output;
pub mod process;
pub mod scanner;

pub use error::{Error, Result};

pub use config::{InterpreterConfig, InterpreterConfigBuilder};
pub use output::{ExecOutput, ExecResponse};
pub use process::{InterpreterState, ManagedInterpreter};
pub use scanner::{scan, ByteSource, LineStream, ReadOutcome, ReaderSource};
