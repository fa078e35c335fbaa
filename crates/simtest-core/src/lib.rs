//! # simtest-core
//!
//! Builds a Xamarin solution for the iOS Simulator and runs its Xamarin
//! UITest assemblies against every application bundle they reference.
//!
//! ## Modules
//!
//! - [`simctl`] - Simulator discovery through `xcrun simctl`
//! - [`selector`] - Resolving the configured device and OS version to one simulator
//! - [`solution`] - Reading `.sln` and `.csproj` files
//! - [`builder`] - Build outputs and the [`builder::SolutionBuilder`] seam
//! - [`msbuild`] - MSBuild-backed solution builder
//! - [`matcher`] - Pairing test assemblies with application bundles
//! - [`nunit`] - Test runner seam and the NUnit 3 console runner
//! - [`result_log`] - Reading the NUnit report and its failure message
//! - [`export`] - Publishing results through `envman`
//! - [`config`] - Step inputs
//! - [`step`] - The end-to-end step
//!
//! ## External Dependencies
//!
//! The production collaborators shell out to:
//!
//! - **Xcode** (`xcrun simctl`)
//! - **Mono** with **MSBuild** and the **NUnit 3 console**
//! - **envman** for exporting results
//!
//! ## Example
//!
//! ```no_run
//! use simtest_core::config::StepConfig;
//! use simtest_core::export::Envman;
//! use simtest_core::msbuild::MsBuild;
//! use simtest_core::nunit::NunitConsole;
//! use simtest_core::simctl::Simctl;
//! use simtest_core::step::UiTestStep;
//!
//! let config = StepConfig {
//!     solution: "Shop.sln".into(),
//!     configuration: "Debug".to_string(),
//!     platform: "iPhoneSimulator".to_string(),
//!     simulator_device: "iPhone 8".to_string(),
//!     deploy_dir: "/tmp/deploy".into(),
//!     ..Default::default()
//! };
//!
//! let step = UiTestStep::new(
//!     config.clone(),
//!     Box::new(Simctl),
//!     Box::new(MsBuild::new(&config.solution)),
//!     Box::new(NunitConsole::new(Some("/opt/nunit".into()))),
//!     Box::new(Envman::new()),
//! );
//! let report = step.run().expect("UI tests failed");
//! println!("ran {} test runs on {}", report.runs.len(), report.simulator.udid);
//! ```

pub mod builder;
pub mod config;
pub mod export;
pub mod matcher;
pub mod msbuild;
pub mod nunit;
pub mod process;
pub mod result_log;
pub mod selector;
pub mod simctl;
pub mod solution;
pub mod step;
