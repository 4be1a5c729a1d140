//! Command results and their JSON wire form.
//!
//! [`ExecOutput`] is what a successful [`execute`](crate::ManagedInterpreter::execute)
//! returns. [`ExecResponse`] is the object handed to the web layer, one per
//! request: `{"stdout": "...", "stderr": "...", "error": "..."}` with `error`
//! omitted on success.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Output of a single command run in a managed interpreter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecOutput {
    /// Standard output, trimmed of leading and trailing whitespace.
    pub stdout: String,
    /// Standard error, exactly as written by the command.
    pub stderr: String,
}

impl ExecOutput {
    /// Create an output from its two streams.
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Whether the command wrote nothing to either stream.
    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }
}

/// JSON response for one executed code block.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecResponse {
    pub stdout: String,
    pub stderr: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecResponse {
    /// Build a response from the result of an execute call.
    ///
    /// A truncated command still reports the output it produced.
    pub fn from_result(result: Result<ExecOutput>) -> Self {
        match result {
            Ok(output) => output.into(),
            Err(err) => {
                let output = match &err {
                    Error::Truncated { output, .. } => output.clone(),
                    _ => ExecOutput::default(),
                };
                Self {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    error: Some(err.to_string()),
                }
            }
        }
    }

    /// Whether the command completed without error.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Serialize to the JSON wire form.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl From<ExecOutput> for ExecResponse {
    fn from(output: ExecOutput) -> Self {
        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            error: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_omits_error_field() {
        let resp = ExecResponse::from_result(Ok(ExecOutput::new("hello", "")));
        let json: serde_json::Value = serde_json::from_str(&resp.to_json().unwrap()).unwrap();
        assert_eq!(json["stdout"], "hello");
        assert_eq!(json["stderr"], "");
        assert!(json.get("error").is_none());
        assert!(resp.is_success());
    }

    #[test]
    fn failure_carries_error_text() {
        let resp = ExecResponse::from_result(Err(Error::NotStarted));
        let json: serde_json::Value = serde_json::from_str(&resp.to_json().unwrap()).unwrap();
        assert_eq!(json["stdout"], "");
        assert_eq!(json["error"], "interpreter process not started");
        assert!(!resp.is_success());
    }

    #[test]
    fn truncated_keeps_partial_output() {
        let err = Error::Truncated {
            output: ExecOutput::new("partial", "oops\n"),
            source: std::io::ErrorKind::UnexpectedEof.into(),
        };
        let resp = ExecResponse::from_result(Err(err));
        assert_eq!(resp.stdout, "partial");
        assert_eq!(resp.stderr, "oops\n");
        assert!(resp.error.unwrap().contains("truncated"));
    }

    #[test]
    fn parse_response_without_error() {
        let json = r#"{"stdout": "a", "stderr": "b"}"#;
        let resp: ExecResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp, ExecResponse::from(ExecOutput::new("a", "b")));
    }

    #[test]
    fn empty_output() {
        assert!(ExecOutput::default().is_empty());
        assert!(!ExecOutput::new("", "x").is_empty());
    }
}
