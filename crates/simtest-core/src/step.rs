//! The UI test step: select a simulator, build, match, run and publish.
//!
//! [`UiTestStep`] owns one instance of each collaborator behind a trait
//! object so the whole pipeline can be driven with fakes. Every exit path
//! publishes exactly one result token.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::builder::{BuildCommandEvent, BuildError, Sdk, SolutionBuilder, TestFramework};
use crate::config::{ConfigError, StepConfig};
use crate::export::{publish_full_results, publish_result, OutputExporter, TestResultToken};
use crate::matcher::{match_test_projects, MatchError, TestRun};
use crate::nunit::{RunnerError, TestInvocation, TestRunner, APP_BUNDLE_PATH_ENV, SIMULATOR_UDID_ENV};
use crate::result_log::{extract_failure_message, read_result_log};
use crate::selector::{select, SelectError};
use crate::simctl::{SimulatorDirectory, SimulatorInfo};

/// Application SDKs the step builds and tests against.
const TARGET_SDKS: &[Sdk] = &[Sdk::Ios];

/// Fatal step errors.
#[derive(Error, Debug)]
pub enum StepError {
    #[error("Issue with input: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to get simulator info: {0}")]
    Simulator(#[from] SelectError),

    #[error("Test runner unavailable: {0}")]
    RunnerUnavailable(#[source] RunnerError),

    #[error("Build failed: {0}")]
    Build(#[source] BuildError),

    #[error("Failed to collect outputs: {0}")]
    CollectOutputs(#[source] BuildError),

    #[error(transparent)]
    Match(#[from] MatchError),

    #[error("Test failed for {test_project} against {project}: {source}")]
    TestFailed {
        test_project: String,
        project: String,
        #[source]
        source: RunnerError,
    },
}

/// What a successful step did.
#[derive(Debug)]
pub struct StepReport {
    pub simulator: SimulatorInfo,
    pub runs: Vec<TestRun>,
    /// Report text left by the last run; empty when there was none.
    pub result_log: String,
}

/// The UI test step and its collaborators.
pub struct UiTestStep {
    config: StepConfig,
    simulators: Box<dyn SimulatorDirectory>,
    builder: Box<dyn SolutionBuilder>,
    runner: Box<dyn TestRunner>,
    exporter: Box<dyn OutputExporter>,
}

impl UiTestStep {
    pub fn new(
        config: StepConfig,
        simulators: Box<dyn SimulatorDirectory>,
        builder: Box<dyn SolutionBuilder>,
        runner: Box<dyn TestRunner>,
        exporter: Box<dyn OutputExporter>,
    ) -> Self {
        Self {
            config,
            simulators,
            builder,
            runner,
            exporter,
        }
    }

    /// Runs the step and publishes its result.
    ///
    /// On success the `succeeded` token is published, followed by the
    /// report text of the last run when there is one. On failure only the
    /// `failed` token is published here; a failing test run has already
    /// published its report text.
    pub fn run(&self) -> Result<StepReport, StepError> {
        match self.execute() {
            Ok(report) => {
                publish_result(self.exporter.as_ref(), TestResultToken::Succeeded);
                publish_full_results(self.exporter.as_ref(), &report.result_log);
                Ok(report)
            }
            Err(e) => {
                error!("{}", e);
                publish_result(self.exporter.as_ref(), TestResultToken::Failed);
                Err(e)
            }
        }
    }

    fn execute(&self) -> Result<StepReport, StepError> {
        let config = &self.config;
        config.log_summary();
        config.validate()?;

        info!("Collecting simulator info...");
        let simulator = select(
            self.simulators.as_ref(),
            &config.simulator_os_version,
            &config.simulator_device,
        )?;
        info!(
            name = %simulator.name,
            udid = %simulator.udid,
            state = %simulator.state,
            "Simulator selected"
        );

        self.runner
            .check_available()
            .map_err(StepError::RunnerUnavailable)?;

        info!("Building all iOS Xamarin UITest and referred projects...");
        let outcome = self.builder.build(
            &config.configuration,
            &config.platform,
            TARGET_SDKS,
            &mut log_build_command,
        );
        for warning in &outcome.warnings {
            warn!("{}", warning);
        }
        outcome.result.map_err(StepError::Build)?;

        let outputs = self
            .builder
            .collect_outputs(&config.configuration, &config.platform, TARGET_SDKS)
            .map_err(StepError::CollectOutputs)?;
        let (test_outputs, warnings) = self
            .builder
            .collect_test_outputs(&config.configuration, &config.platform)
            .map_err(StepError::CollectOutputs)?;
        for warning in &warnings {
            warn!("{}", warning);
        }

        let plan = match_test_projects(&test_outputs, &outputs)?;
        for warning in &plan.warnings {
            warn!("{}", warning);
        }
        debug!(runs = plan.runs.len(), "Test runs matched");

        let result_path = config.result_log_path();
        let mut result_log = String::new();
        for test_run in &plan.runs {
            result_log = self.run_tests(test_run, &simulator, result_path.clone())?;
        }

        Ok(StepReport {
            simulator,
            runs: plan.runs,
            result_log,
        })
    }

    /// Runs one test assembly against one bundle and returns the report
    /// text it left behind.
    fn run_tests(
        &self,
        test_run: &TestRun,
        simulator: &SimulatorInfo,
        result_path: PathBuf,
    ) -> Result<String, StepError> {
        info!(
            "Testing ({}) against ({})",
            test_run.test_project, test_run.project
        );
        info!("test dll: {}", test_run.assembly_path.display());
        info!("app: {}", test_run.app_path.display());

        let invocation = TestInvocation::new(
            &test_run.assembly_path,
            &self.config.test_to_run,
            result_path,
        )
        .with_env(SIMULATOR_UDID_ENV, &simulator.udid)
        .with_env(
            APP_BUNDLE_PATH_ENV,
            test_run.app_path.to_string_lossy().to_string(),
        );

        info!("$ {}", self.runner.printable_command(&invocation));
        let outcome = self.runner.run(&invocation);

        let result_log = read_result_log(&invocation.result_path).unwrap_or_else(|e| {
            warn!("Failed to read test result: {}", e);
            String::new()
        });

        if let Err(source) = outcome {
            let message = extract_failure_message(&result_log);
            if message.is_empty() {
                warn!("No failure message found in test result");
            } else {
                error!("{}", message);
            }
            publish_full_results(self.exporter.as_ref(), &result_log);
            return Err(StepError::TestFailed {
                test_project: test_run.test_project.clone(),
                project: test_run.project.clone(),
                source,
            });
        }

        Ok(result_log)
    }
}

fn log_build_command(event: &BuildCommandEvent) {
    if event.test_framework == TestFramework::XamarinUiTest {
        info!("Building test project: {}", event.project_name);
    } else {
        info!("Building project: {}", event.project_name);
    }
    info!("$ {}", event.command);

    if event.already_performed {
        warn!("build command already performed, skipping...");
    }
}
