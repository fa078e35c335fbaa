//! Publishing step results to the surrounding pipeline.
//!
//! Exactly two keys are ever published: the overall result token and,
//! when non-empty, the full text of the last test report. Export failures
//! are logged and never change the outcome of the step.

use std::fmt;
use std::io::Write;
use std::process::{Command, Stdio};

use thiserror::Error;
use tracing::warn;

/// Key of the overall result token.
pub const RESULT_KEY: &str = "BITRISE_XAMARIN_TEST_RESULT";

/// Key of the full test report text.
pub const FULL_RESULTS_TEXT_KEY: &str = "BITRISE_XAMARIN_TEST_FULL_RESULTS_TEXT";

const DEFAULT_ENVMAN: &str = "envman";

/// Overall result of the step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestResultToken {
    Succeeded,
    Failed,
}

impl TestResultToken {
    pub fn as_str(&self) -> &'static str {
        match self {
            TestResultToken::Succeeded => "succeeded",
            TestResultToken::Failed => "failed",
        }
    }
}

impl fmt::Display for TestResultToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by an export channel.
#[derive(Error, Debug)]
pub enum ExportError {
    /// The channel rejected the value.
    #[error("export of {key} failed with exit code: {code:?}")]
    Rejected { key: String, code: Option<i32> },

    /// The channel could not be reached.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A key/value channel to the surrounding pipeline.
pub trait OutputExporter {
    fn export(&self, key: &str, value: &str) -> Result<(), ExportError>;
}

/// Exports through `envman add --key <KEY>`, value on stdin.
pub struct Envman {
    program: String,
}

impl Envman {
    pub fn new() -> Self {
        Self {
            program: DEFAULT_ENVMAN.to_string(),
        }
    }

    /// Overrides the `envman` executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for Envman {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputExporter for Envman {
    fn export(&self, key: &str, value: &str) -> Result<(), ExportError> {
        let mut child = Command::new(&self.program)
            .args(["add", "--key", key])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()?;

        // stdin is closed before waiting so envman sees EOF.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(value.as_bytes()),
            None => Ok(()),
        };

        let status = child.wait()?;
        if !status.success() {
            return Err(ExportError::Rejected {
                key: key.to_string(),
                code: status.code(),
            });
        }
        written?;
        Ok(())
    }
}

/// Exports a value, logging instead of failing.
pub fn publish(exporter: &dyn OutputExporter, key: &str, value: &str) {
    if let Err(e) = exporter.export(key, value) {
        warn!(key, error = %e, "Failed to export environment");
    }
}

/// Publishes the overall result token.
pub fn publish_result(exporter: &dyn OutputExporter, token: TestResultToken) {
    publish(exporter, RESULT_KEY, token.as_str());
}

/// Publishes the report text; empty text is not published.
pub fn publish_full_results(exporter: &dyn OutputExporter, text: &str) {
    if !text.is_empty() {
        publish(exporter, FULL_RESULTS_TEXT_KEY, text);
    }
}
