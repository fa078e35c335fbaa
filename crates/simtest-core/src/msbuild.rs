//! [`SolutionBuilder`] backed by `msbuild`.
//!
//! Builds Xamarin.UITest projects together with the application projects
//! they reference, one `msbuild` invocation per project, and locates the
//! artifacts those builds leave in each project's output directory.
//!
//! # Example
//!
//! ```no_run
//! use simtest_core::builder::{Sdk, SolutionBuilder};
//! use simtest_core::msbuild::MsBuild;
//!
//! let builder = MsBuild::new("Shop.sln");
//! let outcome = builder.build("Debug", "iPhoneSimulator", &[Sdk::Ios], &mut |event| {
//!     println!("$ {}", event.command);
//! });
//! for warning in &outcome.warnings {
//!     eprintln!("{warning}");
//! }
//! outcome.result.unwrap();
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

use crate::builder::{
    BuildCommandEvent, BuildError, BuildOutcome, BuildOutput, OutputType, ProjectOutput,
    ProjectOutputMap, Sdk, SolutionBuilder, TestProjectOutput, TestProjectOutputMap,
};
use crate::process::printable_command;
use crate::solution::{Project, ProjectKind, Solution, SolutionProject};

/// Platform iOS application projects are built for, so the bundle can be
/// installed on a simulator.
pub const SIMULATOR_PLATFORM: &str = "iPhoneSimulator";

const DEFAULT_PROGRAM: &str = "msbuild";

/// Builds a solution's UI test projects with `msbuild`.
pub struct MsBuild {
    solution_path: PathBuf,
    program: String,
}

impl MsBuild {
    pub fn new(solution_path: impl Into<PathBuf>) -> Self {
        Self {
            solution_path: solution_path.into(),
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Overrides the `msbuild` executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn load(&self) -> Result<LoadedSolution, BuildError> {
        let solution = Solution::open(&self.solution_path)?;
        let entries = solution
            .projects
            .iter()
            .map(|entry| Project::open(entry).map(|project| (entry.clone(), project)))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(LoadedSolution { solution, entries })
    }

    fn build_all(
        &self,
        configuration: &str,
        platform: &str,
        sdks: &[Sdk],
        on_command: &mut dyn FnMut(&BuildCommandEvent),
        warnings: &mut Vec<String>,
    ) -> Result<(), BuildError> {
        let loaded = self.load()?;
        let mut issued = HashSet::new();

        for (entry, test_project) in loaded.ui_test_projects() {
            let referred = loaded.referred_projects(test_project, warnings);
            if referred.is_empty() {
                warnings.push(format!(
                    "Test project ({}) does not refer to any project, skipping...",
                    entry.name
                ));
                continue;
            }

            let targets = referred
                .into_iter()
                .filter(|(_, project)| sdk_selected(sdks, project.sdk))
                .chain(std::iter::once((entry, test_project)));

            for (entry, project) in targets {
                let (project_configuration, project_platform) =
                    loaded.project_target(entry, project, configuration, platform);
                let args = build_args(&project.path, &project_configuration, &project_platform);
                let command = printable_command(&self.program, &args);
                let already_performed = !issued.insert(command.clone());

                on_command(&BuildCommandEvent {
                    solution_name: loaded.solution.name.clone(),
                    project_name: entry.name.clone(),
                    sdk: project.sdk,
                    test_framework: project.test_framework,
                    command: command.clone(),
                    already_performed,
                });

                if already_performed {
                    continue;
                }
                self.run(&args, command)?;
            }
        }

        Ok(())
    }

    fn run(&self, args: &[String], command: String) -> Result<(), BuildError> {
        debug!(%command, "Running build command");

        let status = Command::new(&self.program)
            .args(args)
            .status()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => BuildError::ToolNotFound(self.program.clone()),
                _ => BuildError::Io(e),
            })?;

        if !status.success() {
            return Err(BuildError::CommandFailed {
                command,
                code: status.code(),
            });
        }
        Ok(())
    }
}

impl SolutionBuilder for MsBuild {
    fn build(
        &self,
        configuration: &str,
        platform: &str,
        sdks: &[Sdk],
        on_command: &mut dyn FnMut(&BuildCommandEvent),
    ) -> BuildOutcome {
        let mut warnings = Vec::new();
        let result = self.build_all(configuration, platform, sdks, on_command, &mut warnings);
        BuildOutcome { warnings, result }
    }

    fn collect_outputs(
        &self,
        configuration: &str,
        platform: &str,
        sdks: &[Sdk],
    ) -> Result<ProjectOutputMap, BuildError> {
        let loaded = self.load()?;
        let mut outputs = ProjectOutputMap::new();

        let tracked = loaded
            .entries
            .iter()
            .filter(|(_, project)| project.is_ui_test() || sdk_selected(sdks, project.sdk));
        for (entry, project) in tracked {
            let (project_configuration, project_platform) =
                loaded.project_target(entry, project, configuration, platform);
            let dir = project.output_dir(&project_configuration, &project_platform);

            let output = match (project.kind, project.sdk) {
                (ProjectKind::Executable, Sdk::Ios) => {
                    find_app_bundle(&dir, &project.assembly_name)
                        .map(|path| BuildOutput::new(OutputType::App, path))
                }
                (ProjectKind::Executable, _) => {
                    existing(dir.join(format!("{}.exe", project.assembly_name)))
                        .map(|path| BuildOutput::new(OutputType::Exe, path))
                }
                (ProjectKind::Library, _) => {
                    existing(dir.join(format!("{}.dll", project.assembly_name)))
                        .map(|path| BuildOutput::new(OutputType::Dll, path))
                }
            };

            if let Some(output) = output {
                outputs.insert(
                    entry.name.clone(),
                    ProjectOutput {
                        outputs: vec![output],
                    },
                );
            }
        }

        Ok(outputs)
    }

    fn collect_test_outputs(
        &self,
        configuration: &str,
        platform: &str,
    ) -> Result<(TestProjectOutputMap, Vec<String>), BuildError> {
        let loaded = self.load()?;
        let mut outputs = TestProjectOutputMap::new();
        let mut warnings = Vec::new();

        for (entry, project) in loaded.ui_test_projects() {
            let (project_configuration, project_platform) =
                loaded.project_target(entry, project, configuration, platform);
            let assembly = project
                .output_dir(&project_configuration, &project_platform)
                .join(format!("{}.dll", project.assembly_name));

            if !assembly.exists() {
                warnings.push(format!(
                    "No test assembly found for project ({}) at: {}",
                    entry.name,
                    assembly.display()
                ));
                continue;
            }

            let referred_project_names: Vec<String> = loaded
                .referred_projects(project, &mut warnings)
                .into_iter()
                .map(|(referred, _)| referred.name.clone())
                .collect();
            if referred_project_names.is_empty() {
                warnings.push(format!(
                    "Test project ({}) does not refer to any project",
                    entry.name
                ));
            }

            outputs.insert(
                entry.name.clone(),
                TestProjectOutput {
                    output: BuildOutput::new(OutputType::Dll, assembly),
                    referred_project_names,
                },
            );
        }

        Ok((outputs, warnings))
    }
}

struct LoadedSolution {
    solution: Solution,
    entries: Vec<(SolutionProject, Project)>,
}

impl LoadedSolution {
    fn ui_test_projects(&self) -> impl Iterator<Item = (&SolutionProject, &Project)> {
        self.entries
            .iter()
            .filter(|(_, project)| project.is_ui_test())
            .map(|(entry, project)| (entry, project))
    }

    /// Solution entries referenced by `project`, in reference order.
    fn referred_projects(
        &self,
        project: &Project,
        warnings: &mut Vec<String>,
    ) -> Vec<(&SolutionProject, &Project)> {
        let mut referred = Vec::new();
        for reference in &project.references {
            match self.entries.iter().find(|(entry, _)| &entry.path == reference) {
                Some((entry, referred_project)) => referred.push((entry, referred_project)),
                None => warnings.push(format!(
                    "Project ({}) refers to a project outside the solution: {}",
                    project.name,
                    reference.display()
                )),
            }
        }
        referred
    }

    /// Project configuration and platform for a solution configuration.
    fn project_target(
        &self,
        entry: &SolutionProject,
        project: &Project,
        configuration: &str,
        platform: &str,
    ) -> (String, String) {
        let (configuration, platform) =
            self.solution
                .project_configuration(&entry.guid, configuration, platform);

        if project.sdk == Sdk::Ios && project.kind == ProjectKind::Executable {
            (configuration, SIMULATOR_PLATFORM.to_string())
        } else {
            (configuration, platform.replace("Any CPU", "AnyCPU"))
        }
    }
}

fn build_args(project_path: &Path, configuration: &str, platform: &str) -> Vec<String> {
    vec![
        project_path.to_string_lossy().to_string(),
        "/t:Build".to_string(),
        format!("/p:Configuration={}", configuration),
        format!("/p:Platform={}", platform),
    ]
}

/// An empty filter selects every SDK.
fn sdk_selected(sdks: &[Sdk], sdk: Sdk) -> bool {
    sdks.is_empty() || sdks.contains(&sdk)
}

fn existing(path: PathBuf) -> Option<PathBuf> {
    path.exists().then_some(path)
}

/// `<assembly>.app` in `dir`, or else the most recently modified bundle there.
fn find_app_bundle(dir: &Path, assembly_name: &str) -> Option<PathBuf> {
    if let Some(path) = existing(dir.join(format!("{}.app", assembly_name))) {
        return Some(path);
    }

    std::fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_dir() && path.extension().is_some_and(|ext| ext == "app"))
        .max_by_key(|path| path.metadata().and_then(|m| m.modified()).ok())
}
