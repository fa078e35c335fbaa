//! Step configuration.
//!
//! [`StepConfig`] is built once from the command line and environment and
//! never mutated afterwards. Every component reads it by reference.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use crate::nunit::RESULT_LOG_FILE_NAME;
use crate::selector::LATEST_OS_VERSION;

/// Invalid step input.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no XamarinSolution parameter specified")]
    MissingSolution,

    #[error("XamarinSolution not exist at: {0}")]
    SolutionNotFound(PathBuf),

    #[error("no XamarinConfiguration parameter specified")]
    MissingConfiguration,

    #[error("no XamarinPlatform parameter specified")]
    MissingPlatform,

    #[error("no SimulatorDevice parameter specified")]
    MissingDevice,
}

/// Inputs of the UI test step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepConfig {
    /// Path to the `.sln` file.
    pub solution: PathBuf,
    /// Solution build configuration (e.g. `Debug`).
    pub configuration: String,
    /// Solution build platform (e.g. `iPhoneSimulator`).
    pub platform: String,
    /// Test name filter; empty runs every test.
    pub test_to_run: String,
    /// Exact simulator device name (e.g. `iPhone 8`).
    pub simulator_device: String,
    /// OS version bucket label, or `latest`.
    pub simulator_os_version: String,
    /// Directory the test report is written to.
    pub deploy_dir: PathBuf,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            solution: PathBuf::new(),
            configuration: String::new(),
            platform: String::new(),
            test_to_run: String::new(),
            simulator_device: String::new(),
            simulator_os_version: LATEST_OS_VERSION.to_string(),
            deploy_dir: PathBuf::new(),
        }
    }
}

impl StepConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.solution.as_os_str().is_empty() {
            return Err(ConfigError::MissingSolution);
        }
        if !self.solution.exists() {
            return Err(ConfigError::SolutionNotFound(self.solution.clone()));
        }
        if self.configuration.is_empty() {
            return Err(ConfigError::MissingConfiguration);
        }
        if self.platform.is_empty() {
            return Err(ConfigError::MissingPlatform);
        }
        if self.simulator_device.is_empty() {
            return Err(ConfigError::MissingDevice);
        }
        Ok(())
    }

    /// Path of the report every test run overwrites.
    pub fn result_log_path(&self) -> PathBuf {
        self.deploy_dir.join(RESULT_LOG_FILE_NAME)
    }

    pub fn log_summary(&self) {
        info!("Build configs:");
        info!("- solution: {}", self.solution.display());
        info!("- configuration: {}", self.configuration);
        info!("- platform: {}", self.platform);

        info!("Xamarin UITest configs:");
        info!("- test_to_run: {}", self.test_to_run);
        info!("- simulator_device: {}", self.simulator_device);
        info!("- simulator_os_version: {}", self.simulator_os_version);

        info!("Other configs:");
        info!("- deploy_dir: {}", self.deploy_dir.display());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config(solution: PathBuf) -> StepConfig {
        StepConfig {
            solution,
            configuration: "Debug".to_string(),
            platform: "iPhoneSimulator".to_string(),
            simulator_device: "iPhone 8".to_string(),
            deploy_dir: PathBuf::from("/deploy"),
            ..Default::default()
        }
    }

    #[test]
    fn default_os_version_is_latest() {
        assert_eq!(StepConfig::default().simulator_os_version, "latest");
    }

    #[test]
    fn validate_accepts_complete_config() {
        let dir = tempfile::tempdir().unwrap();
        let solution = dir.path().join("Shop.sln");
        std::fs::write(&solution, "").unwrap();

        assert_eq!(valid_config(solution).validate(), Ok(()));
    }

    #[test]
    fn validate_requires_solution() {
        let config = valid_config(PathBuf::new());
        assert_eq!(config.validate(), Err(ConfigError::MissingSolution));
    }

    #[test]
    fn validate_requires_existing_solution() {
        let config = valid_config(PathBuf::from("/nonexistent/Shop.sln"));
        assert_eq!(
            config.validate(),
            Err(ConfigError::SolutionNotFound(PathBuf::from(
                "/nonexistent/Shop.sln"
            )))
        );
    }

    #[test]
    fn validate_requires_device() {
        let dir = tempfile::tempdir().unwrap();
        let solution = dir.path().join("Shop.sln");
        std::fs::write(&solution, "").unwrap();

        let config = StepConfig {
            simulator_device: String::new(),
            ..valid_config(solution)
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingDevice));
    }

    #[test]
    fn validate_requires_configuration_and_platform() {
        let dir = tempfile::tempdir().unwrap();
        let solution = dir.path().join("Shop.sln");
        std::fs::write(&solution, "").unwrap();

        let no_configuration = StepConfig {
            configuration: String::new(),
            ..valid_config(solution.clone())
        };
        assert_eq!(
            no_configuration.validate(),
            Err(ConfigError::MissingConfiguration)
        );

        let no_platform = StepConfig {
            platform: String::new(),
            ..valid_config(solution)
        };
        assert_eq!(no_platform.validate(), Err(ConfigError::MissingPlatform));
    }

    #[test]
    fn result_log_path_is_inside_deploy_dir() {
        let config = valid_config(PathBuf::from("/work/Shop.sln"));
        assert_eq!(
            config.result_log_path(),
            PathBuf::from("/deploy/TestResult.xml")
        );
    }

    #[test]
    fn error_display() {
        assert_eq!(
            ConfigError::MissingDevice.to_string(),
            "no SimulatorDevice parameter specified"
        );
    }
}
