//! Test runner abstraction and the NUnit 3 console implementation.
//!
//! A [`TestInvocation`] describes one run of a test assembly: the assembly,
//! the optional test filter, where the XML report goes, and the environment
//! handed to the child process. Runners execute it synchronously.

use std::path::{Path, PathBuf};
use std::process::Command;

use thiserror::Error;

use crate::process::printable_command;

/// File name of the NUnit XML report inside the output directory.
pub const RESULT_LOG_FILE_NAME: &str = "TestResult.xml";

/// Environment variable UI tests read to find the `.app` under test.
pub const APP_BUNDLE_PATH_ENV: &str = "APP_BUNDLE_PATH";

/// Environment variable UI tests read to find the target simulator.
pub const SIMULATOR_UDID_ENV: &str = "IOS_SIMULATOR_UDID";

/// File name of the NUnit 3 console runner.
pub const NUNIT_CONSOLE_EXE: &str = "nunit3-console.exe";

const DEFAULT_MONO: &str = "mono";

/// Errors raised by a test runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The runner executable could not be located.
    #[error("NUnit console not found: {0}")]
    ConsoleNotFound(String),

    /// The test run finished with a non-zero exit code.
    #[error("Test run failed with exit code: {code:?}")]
    Failed { code: Option<i32> },

    /// An I/O error occurred while spawning the runner.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// One test-runner execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestInvocation {
    /// The test assembly to load.
    pub assembly_path: PathBuf,
    /// Test name filter; empty runs every test.
    pub test_to_run: String,
    /// Where the runner writes its XML report.
    pub result_path: PathBuf,
    /// Variables added to the child process environment.
    pub env: Vec<(String, String)>,
}

impl TestInvocation {
    pub fn new(
        assembly_path: impl Into<PathBuf>,
        test_to_run: impl Into<String>,
        result_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            assembly_path: assembly_path.into(),
            test_to_run: test_to_run.into(),
            result_path: result_path.into(),
            env: Vec::new(),
        }
    }

    /// Adds a variable to the child environment.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Looks up a child environment variable.
    pub fn env_value(&self, key: &str) -> Option<&str> {
        self.env
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Executes test assemblies.
pub trait TestRunner {
    /// Checks that the runner can be started at all.
    fn check_available(&self) -> Result<(), RunnerError>;

    /// Command line shown in logs for an invocation.
    fn printable_command(&self, invocation: &TestInvocation) -> String;

    /// Runs the invocation to completion.
    fn run(&self, invocation: &TestInvocation) -> Result<(), RunnerError>;
}

/// Runs tests through `mono nunit3-console.exe`.
pub struct NunitConsole {
    console_path: Option<PathBuf>,
    mono: String,
}

impl NunitConsole {
    /// `console_path` may point at `nunit3-console.exe` or at the directory
    /// containing it.
    pub fn new(console_path: Option<PathBuf>) -> Self {
        Self {
            console_path,
            mono: DEFAULT_MONO.to_string(),
        }
    }

    /// Overrides the `mono` executable.
    pub fn with_mono(mut self, mono: impl Into<String>) -> Self {
        self.mono = mono.into();
        self
    }

    /// Resolves the console executable path.
    pub fn console_exe(&self) -> Result<PathBuf, RunnerError> {
        let path = self.console_path.as_deref().ok_or_else(|| {
            RunnerError::ConsoleNotFound("no nunit3-console path configured".to_string())
        })?;

        let exe = if path.is_dir() {
            path.join(NUNIT_CONSOLE_EXE)
        } else {
            path.to_path_buf()
        };

        if !exe.is_file() {
            return Err(RunnerError::ConsoleNotFound(exe.display().to_string()));
        }
        Ok(exe)
    }

    fn args(&self, console: &Path, invocation: &TestInvocation) -> Vec<String> {
        let mut args = vec![
            console.to_string_lossy().to_string(),
            invocation.assembly_path.to_string_lossy().to_string(),
        ];
        if !invocation.test_to_run.is_empty() {
            args.push(format!("--test={}", invocation.test_to_run));
        }
        args.push(format!(
            "--result={}",
            invocation.result_path.to_string_lossy()
        ));
        args
    }
}

impl TestRunner for NunitConsole {
    fn check_available(&self) -> Result<(), RunnerError> {
        self.console_exe().map(|_| ())
    }

    fn printable_command(&self, invocation: &TestInvocation) -> String {
        let console = self
            .console_exe()
            .unwrap_or_else(|_| PathBuf::from(NUNIT_CONSOLE_EXE));
        printable_command(&self.mono, &self.args(&console, invocation))
    }

    fn run(&self, invocation: &TestInvocation) -> Result<(), RunnerError> {
        let console = self.console_exe()?;

        let status = Command::new(&self.mono)
            .args(self.args(&console, invocation))
            .envs(invocation.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .status()?;

        if !status.success() {
            return Err(RunnerError::Failed {
                code: status.code(),
            });
        }
        Ok(())
    }
}
