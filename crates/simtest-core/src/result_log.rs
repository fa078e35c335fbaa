//! Reading the test report and pulling the failure message out of it.
//!
//! The report is treated as opaque line-oriented text. Only a `<message>`
//! line immediately following a `<failure>` line is recognized; everything
//! else in the document is ignored.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Line that opens a failure element.
pub const FAILURE_MARKER: &str = "<failure>";

/// Prefix of the line carrying the failure message.
pub const MESSAGE_MARKER: &str = "<message>";

/// Errors raised while reading a report.
#[derive(Error, Debug)]
pub enum ResultLogError {
    #[error("test result not exist at: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read file ({path}): {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Reads the report written by the last test run.
pub fn read_result_log(path: &Path) -> Result<String, ResultLogError> {
    if !path.exists() {
        return Err(ResultLogError::NotFound(path.to_path_buf()));
    }

    std::fs::read_to_string(path).map_err(|source| ResultLogError::Read {
        path: path.to_path_buf(),
        source,
    })
}

/// Returns the last `<message>` line that directly follows a `<failure>`
/// line, trimmed, or an empty string when there is none.
pub fn extract_failure_message(text: &str) -> String {
    let mut after_failure = false;
    let mut message = "";

    for line in text.lines() {
        let line = line.trim();
        if after_failure && line.starts_with(MESSAGE_MARKER) {
            message = line;
        }
        after_failure = line == FAILURE_MARKER;
    }

    message.to_string()
}
