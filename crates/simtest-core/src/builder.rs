//! Solution builder abstraction.
//!
//! This module defines the [`SolutionBuilder`] trait, the seam between the
//! UI test step and whatever turns a solution into build artifacts, plus the
//! output maps the step matches test assemblies against.
//!
//! [`crate::msbuild::MsBuild`] is the production implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Target SDK of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sdk {
    Ios,
    Android,
    MacOs,
    TvOs,
    Unknown,
}

impl fmt::Display for Sdk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Sdk::Ios => "iOS",
            Sdk::Android => "Android",
            Sdk::MacOs => "macOS",
            Sdk::TvOs => "tvOS",
            Sdk::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

/// Test framework a project is written against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestFramework {
    XamarinUiTest,
    NUnit,
    None,
}

/// Kind of artifact a project produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// An installable iOS application bundle (`.app`).
    App,
    /// A class library or test assembly (`.dll`).
    Dll,
    /// A non-bundle executable (`.exe`).
    Exe,
}

/// A single artifact produced by a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildOutput {
    pub output_type: OutputType,
    pub path: PathBuf,
}

impl BuildOutput {
    pub fn new(output_type: OutputType, path: impl Into<PathBuf>) -> Self {
        Self {
            output_type,
            path: path.into(),
        }
    }
}

/// Every artifact of one project.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectOutput {
    pub outputs: Vec<BuildOutput>,
}

impl ProjectOutput {
    /// The application bundle output; the last one listed when several exist.
    pub fn app_bundle(&self) -> Option<&BuildOutput> {
        self.outputs
            .iter()
            .rev()
            .find(|output| output.output_type == OutputType::App)
    }
}

/// A UI test project's assembly and the projects it exercises.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestProjectOutput {
    pub output: BuildOutput,
    pub referred_project_names: Vec<String>,
}

/// Project name to its artifacts.
pub type ProjectOutputMap = BTreeMap<String, ProjectOutput>;

/// Test project name to its assembly and referenced projects.
pub type TestProjectOutputMap = BTreeMap<String, TestProjectOutput>;

/// Reported once per build command the builder issues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildCommandEvent {
    pub solution_name: String,
    pub project_name: String,
    pub sdk: Sdk,
    pub test_framework: TestFramework,
    /// The printable command line.
    pub command: String,
    /// The identical command was already issued earlier in this run and was
    /// not executed again.
    pub already_performed: bool,
}

/// Errors that stop a build or output collection.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The solution file does not exist.
    #[error("Solution not found at path: {0}")]
    SolutionNotFound(PathBuf),

    /// A project file could not be read.
    #[error("Failed to read project ({path}): {reason}")]
    InvalidProject { path: PathBuf, reason: String },

    /// The build tool is not installed.
    #[error("Build tool not found: {0}")]
    ToolNotFound(String),

    /// A build command exited unsuccessfully.
    #[error("Build command failed (exit code {code:?}): {command}")]
    CommandFailed { command: String, code: Option<i32> },

    /// An I/O error occurred.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result of a build: non-fatal warnings plus the terminal outcome.
#[derive(Debug)]
pub struct BuildOutcome {
    pub warnings: Vec<String>,
    pub result: Result<(), BuildError>,
}

/// Builds a solution and reports what it produced.
pub trait SolutionBuilder {
    /// Builds every UI test project and the projects they reference that
    /// target one of `sdks` (all SDKs when empty).
    ///
    /// `on_command` is invoked once per build command, including commands
    /// skipped because they were already performed.
    fn build(
        &self,
        configuration: &str,
        platform: &str,
        sdks: &[Sdk],
        on_command: &mut dyn FnMut(&BuildCommandEvent),
    ) -> BuildOutcome;

    /// Lists the artifacts on disk of the UI test projects and of the
    /// projects in `sdks` (every project when empty). Does not build.
    fn collect_outputs(
        &self,
        configuration: &str,
        platform: &str,
        sdks: &[Sdk],
    ) -> Result<ProjectOutputMap, BuildError>;

    /// Lists the UI test projects with their assemblies and references,
    /// plus warnings about anomalies found on the way. Does not build.
    fn collect_test_outputs(
        &self,
        configuration: &str,
        platform: &str,
    ) -> Result<(TestProjectOutputMap, Vec<String>), BuildError>;
}
