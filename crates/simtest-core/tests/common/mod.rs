//! Shared test helpers for simtest-core integration tests.
//!
//! Fake collaborators record what the step asks of them through shared
//! handles, so a test keeps a clone of the handle after boxing the fake
//! into a [`UiTestStep`].

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use simtest_core::builder::{
    BuildCommandEvent, BuildError, BuildOutcome, BuildOutput, OutputType, ProjectOutput,
    ProjectOutputMap, Sdk, SolutionBuilder, TestFramework, TestProjectOutput,
    TestProjectOutputMap,
};
use simtest_core::config::StepConfig;
use simtest_core::export::{ExportError, OutputExporter};
use simtest_core::nunit::{RunnerError, TestInvocation, TestRunner};
use simtest_core::simctl::{OsVersionBuckets, SimctlError, SimulatorDirectory, SimulatorInfo};

// ---------------------------------------------------------------------------
// Simulators
// ---------------------------------------------------------------------------

pub fn sim(name: &str, udid: &str) -> SimulatorInfo {
    SimulatorInfo {
        name: name.to_string(),
        udid: udid.to_string(),
        state: "Shutdown".to_string(),
    }
}

/// `iOS 12.0` has iPhone 8 `Y`, `iOS 12.1` has iPhone 8 `X`.
pub fn two_version_buckets() -> OsVersionBuckets {
    OsVersionBuckets::from([
        ("iOS 12.0".to_string(), vec![sim("iPhone 8", "Y")]),
        ("iOS 12.1".to_string(), vec![sim("iPhone 8", "X")]),
    ])
}

pub struct FakeSimulators {
    pub buckets: Result<OsVersionBuckets, String>,
}

impl FakeSimulators {
    pub fn new(buckets: OsVersionBuckets) -> Self {
        Self {
            buckets: Ok(buckets),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            buckets: Err(message.to_string()),
        }
    }
}

impl SimulatorDirectory for FakeSimulators {
    fn os_version_buckets(&self) -> Result<OsVersionBuckets, SimctlError> {
        self.buckets
            .clone()
            .map_err(SimctlError::CommandFailed)
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

pub fn app_output(path: &str) -> ProjectOutput {
    ProjectOutput {
        outputs: vec![BuildOutput::new(OutputType::App, path)],
    }
}

pub fn dll_output(path: &str) -> ProjectOutput {
    ProjectOutput {
        outputs: vec![BuildOutput::new(OutputType::Dll, path)],
    }
}

pub fn test_output(assembly: &str, refs: &[&str]) -> TestProjectOutput {
    TestProjectOutput {
        output: BuildOutput::new(OutputType::Dll, assembly),
        referred_project_names: refs.iter().map(|r| r.to_string()).collect(),
    }
}

/// Builder that reports fixed outputs and records build commands.
#[derive(Default)]
pub struct FakeBuilder {
    pub outputs: ProjectOutputMap,
    pub test_outputs: TestProjectOutputMap,
    pub fail_build: bool,
    pub commands: Rc<RefCell<Vec<BuildCommandEvent>>>,
}

impl FakeBuilder {
    pub fn new(outputs: ProjectOutputMap, test_outputs: TestProjectOutputMap) -> Self {
        Self {
            outputs,
            test_outputs,
            ..Default::default()
        }
    }
}

impl SolutionBuilder for FakeBuilder {
    fn build(
        &self,
        configuration: &str,
        platform: &str,
        _sdks: &[Sdk],
        on_command: &mut dyn FnMut(&BuildCommandEvent),
    ) -> BuildOutcome {
        for name in self.test_outputs.keys() {
            let event = BuildCommandEvent {
                solution_name: "Shop".to_string(),
                project_name: name.clone(),
                sdk: Sdk::Unknown,
                test_framework: TestFramework::XamarinUiTest,
                command: format!(
                    "msbuild {}.csproj /p:Configuration={} /p:Platform={}",
                    name, configuration, platform
                ),
                already_performed: false,
            };
            on_command(&event);
            self.commands.borrow_mut().push(event);
        }

        let result = if self.fail_build {
            Err(BuildError::CommandFailed {
                command: "msbuild".to_string(),
                code: Some(1),
            })
        } else {
            Ok(())
        };
        BuildOutcome {
            warnings: Vec::new(),
            result,
        }
    }

    fn collect_outputs(
        &self,
        _: &str,
        _: &str,
        _: &[Sdk],
    ) -> Result<ProjectOutputMap, BuildError> {
        Ok(self.outputs.clone())
    }

    fn collect_test_outputs(
        &self,
        _: &str,
        _: &str,
    ) -> Result<(TestProjectOutputMap, Vec<String>), BuildError> {
        Ok((self.test_outputs.clone(), Vec::new()))
    }
}

// ---------------------------------------------------------------------------
// Runner
// ---------------------------------------------------------------------------

/// Scripted outcome of one test run.
#[derive(Debug, Clone)]
pub struct ScriptedRun {
    pub passes: bool,
    /// Written to the invocation's result path when present.
    pub report: Option<String>,
}

impl ScriptedRun {
    pub fn pass(report: &str) -> Self {
        Self {
            passes: true,
            report: Some(report.to_string()),
        }
    }

    pub fn fail(report: &str) -> Self {
        Self {
            passes: false,
            report: Some(report.to_string()),
        }
    }

    pub fn pass_without_report() -> Self {
        Self {
            passes: true,
            report: None,
        }
    }
}

/// Runner that plays back [`ScriptedRun`]s in order and records every
/// invocation. Runs past the end of the script pass without a report.
#[derive(Default)]
pub struct FakeRunner {
    pub script: RefCell<VecDeque<ScriptedRun>>,
    pub unavailable: bool,
    pub invocations: Rc<RefCell<Vec<TestInvocation>>>,
}

impl FakeRunner {
    pub fn scripted(runs: Vec<ScriptedRun>) -> Self {
        Self {
            script: RefCell::new(runs.into()),
            ..Default::default()
        }
    }
}

impl TestRunner for FakeRunner {
    fn check_available(&self) -> Result<(), RunnerError> {
        if self.unavailable {
            return Err(RunnerError::ConsoleNotFound("fake".to_string()));
        }
        Ok(())
    }

    fn printable_command(&self, invocation: &TestInvocation) -> String {
        format!("nunit3-console {}", invocation.assembly_path.display())
    }

    fn run(&self, invocation: &TestInvocation) -> Result<(), RunnerError> {
        self.invocations.borrow_mut().push(invocation.clone());

        let run = self
            .script
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(ScriptedRun::pass_without_report);
        if let Some(report) = &run.report {
            std::fs::write(&invocation.result_path, report)?;
        }

        if run.passes {
            Ok(())
        } else {
            Err(RunnerError::Failed { code: Some(1) })
        }
    }
}

// ---------------------------------------------------------------------------
// Exporter
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingExporter {
    pub exports: Rc<RefCell<Vec<(String, String)>>>,
    pub fail: bool,
}

impl OutputExporter for RecordingExporter {
    fn export(&self, key: &str, value: &str) -> Result<(), ExportError> {
        self.exports
            .borrow_mut()
            .push((key.to_string(), value.to_string()));
        if self.fail {
            return Err(ExportError::Rejected {
                key: key.to_string(),
                code: Some(1),
            });
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Configuration and fixtures
// ---------------------------------------------------------------------------

/// A valid configuration whose solution file and deploy directory live in
/// `dir`.
pub fn step_config(dir: &Path) -> StepConfig {
    let solution = dir.join("Shop.sln");
    if !solution.exists() {
        std::fs::write(&solution, "").unwrap();
    }
    StepConfig {
        solution,
        configuration: "Debug".to_string(),
        platform: "iPhoneSimulator".to_string(),
        simulator_device: "iPhone 8".to_string(),
        deploy_dir: dir.to_path_buf(),
        ..Default::default()
    }
}

pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

/// Copies the `shop` fixture solution into a fresh temp directory.
///
/// The solution has an iOS app, an Android app, a shared library, and two
/// UI test projects. `Shop.UITests` refers to both apps, `Shop.SmokeTests`
/// to the iOS app only.
pub fn shop_solution() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    copy_dir(&fixture_path("shop"), dir.path());
    dir
}

/// Creates the artifacts an iOS-only build of the `shop` fixture leaves.
pub fn write_ios_build_artifacts(root: &Path) {
    std::fs::create_dir_all(root.join("Shop.iOS/bin/iPhoneSimulator/Debug/Shop.iOS.app")).unwrap();
    touch(&root.join("Shop.UITests/bin/Debug/Shop.UITests.dll"));
    touch(&root.join("Shop.SmokeTests/bin/Debug/Shop.SmokeTests.dll"));
}

pub fn touch(path: &Path) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, b"").unwrap();
}

fn copy_dir(from: &Path, to: &Path) {
    std::fs::create_dir_all(to).unwrap();
    for entry in std::fs::read_dir(from).unwrap() {
        let entry = entry.unwrap();
        let target = to.join(entry.file_name());
        if entry.file_type().unwrap().is_dir() {
            copy_dir(&entry.path(), &target);
        } else {
            std::fs::copy(entry.path(), &target).unwrap();
        }
    }
}
