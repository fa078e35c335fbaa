//! CI step that builds a Xamarin solution and runs its UI tests on an iOS
//! Simulator.
//!
//! Every input can come from a flag or from the environment variable the
//! surrounding pipeline sets.
//!
//! # Usage
//!
//! ```bash
//! # Run every UI test on the newest iPhone 8 simulator
//! simtest --solution Shop.sln --configuration Debug --platform iPhoneSimulator \
//!     --device "iPhone 8" --nunit-console /opt/nunit
//!
//! # Pin the OS version and filter the tests
//! simtest --solution Shop.sln --configuration Debug --platform iPhoneSimulator \
//!     --device "iPhone 8" --os-version "iOS 12.1" --test Shop.UITests.LoginTests
//!
//! # Keep a copy of the log
//! simtest --log-dir ./logs ...
//! ```

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use simtest_core::config::StepConfig;
use simtest_core::export::Envman;
use simtest_core::msbuild::MsBuild;
use simtest_core::nunit::NunitConsole;
use simtest_core::selector::LATEST_OS_VERSION;
use simtest_core::simctl::Simctl;
use simtest_core::step::UiTestStep;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_FILE_NAME: &str = "simtest.log";

/// Build a Xamarin solution and run its UI tests on an iOS Simulator.
#[derive(Parser, Debug)]
#[command(name = "simtest")]
#[command(version)]
struct Cli {
    /// Path to the solution file
    #[arg(long, env = "xamarin_project")]
    solution: Option<PathBuf>,

    /// Solution build configuration
    #[arg(long, env = "xamarin_configuration")]
    configuration: Option<String>,

    /// Solution build platform
    #[arg(long, env = "xamarin_platform")]
    platform: Option<String>,

    /// Only run the named tests
    #[arg(long = "test", env = "test_to_run")]
    test_to_run: Option<String>,

    /// Simulator device name (e.g. "iPhone 8")
    #[arg(long, env = "simulator_device")]
    device: Option<String>,

    /// Simulator OS version (e.g. "iOS 12.1") or "latest"
    #[arg(long, env = "simulator_os_version", default_value = LATEST_OS_VERSION)]
    os_version: String,

    /// Directory the test report is written to
    #[arg(long, env = "BITRISE_DEPLOY_DIR")]
    deploy_dir: Option<PathBuf>,

    /// nunit3-console.exe or the directory containing it
    #[arg(long, env = "NUNIT_3_PATH")]
    nunit_console: Option<PathBuf>,

    /// Mono executable used to start the NUnit console
    #[arg(long, env = "SIMTEST_MONO", default_value = "mono")]
    mono: String,

    /// MSBuild executable
    #[arg(long, env = "SIMTEST_MSBUILD", default_value = "msbuild")]
    msbuild: String,

    /// envman executable used to export results
    #[arg(long, env = "SIMTEST_ENVMAN", default_value = "envman")]
    envman: String,

    /// Also write the log to <DIR>/simtest.log
    #[arg(long, env = "SIMTEST_LOG_DIR")]
    log_dir: Option<PathBuf>,
}

impl Cli {
    fn step_config(&self) -> StepConfig {
        StepConfig {
            solution: self.solution.clone().unwrap_or_default(),
            configuration: self.configuration.clone().unwrap_or_default(),
            platform: self.platform.clone().unwrap_or_default(),
            test_to_run: self.test_to_run.clone().unwrap_or_default(),
            simulator_device: self.device.clone().unwrap_or_default(),
            simulator_os_version: self.os_version.clone(),
            deploy_dir: self.deploy_dir.clone().unwrap_or_default(),
        }
    }
}

fn init_logging(log_dir: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr_layer = fmt::layer().with_writer(std::io::stderr);

    let file_layer = log_dir.and_then(|dir| match std::fs::create_dir_all(dir) {
        Ok(()) => {
            let appender = tracing_appender::rolling::never(dir, LOG_FILE_NAME);
            Some(fmt::layer().with_writer(appender).with_ansi(false))
        }
        Err(e) => {
            eprintln!("Failed to create log directory {}: {}", dir.display(), e);
            None
        }
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_dir.as_deref());

    let config = cli.step_config();
    let step = UiTestStep::new(
        config.clone(),
        Box::new(Simctl),
        Box::new(MsBuild::new(&config.solution).with_program(&cli.msbuild)),
        Box::new(NunitConsole::new(cli.nunit_console.clone()).with_mono(&cli.mono)),
        Box::new(Envman::new().with_program(&cli.envman)),
    );

    match step.run() {
        Ok(report) => {
            info!(
                simulator = %report.simulator.name,
                udid = %report.simulator.udid,
                runs = report.runs.len(),
                "Xamarin UITests succeeded"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
