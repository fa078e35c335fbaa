//! Pairing test assemblies with the application bundles they exercise.
//!
//! Every test project is matched before anything runs, so a referenced
//! project without an application bundle stops the step before the first
//! test invocation no matter which test project it belongs to.

use std::path::PathBuf;

use thiserror::Error;

use crate::builder::{ProjectOutputMap, TestProjectOutputMap};

/// Errors raised while matching.
#[derive(Error, Debug)]
pub enum MatchError {
    /// A referenced project produced no installable bundle.
    #[error("No app generated for project: {project} (referenced by {test_project})")]
    NoAppBundle {
        test_project: String,
        project: String,
    },
}

/// A test assembly paired with one application bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestRun {
    pub test_project: String,
    pub project: String,
    pub assembly_path: PathBuf,
    pub app_path: PathBuf,
}

/// Matched runs plus warnings about skipped test projects.
#[derive(Debug, Default)]
pub struct TestPlan {
    pub runs: Vec<TestRun>,
    pub warnings: Vec<String>,
}

/// Builds one [`TestRun`] per (test project, referenced project) pair.
///
/// References missing from `project_outputs` were not part of this build
/// and are skipped silently. Test projects without references are skipped
/// with a warning.
pub fn match_test_projects(
    test_outputs: &TestProjectOutputMap,
    project_outputs: &ProjectOutputMap,
) -> Result<TestPlan, MatchError> {
    let mut plan = TestPlan::default();

    for (test_project, test_output) in test_outputs {
        if test_output.referred_project_names.is_empty() {
            plan.warnings.push(format!(
                "Test project ({}) does not refer to any project, skipping...",
                test_project
            ));
            continue;
        }

        for project in &test_output.referred_project_names {
            let Some(project_output) = project_outputs.get(project) else {
                continue;
            };

            let app = project_output
                .app_bundle()
                .ok_or_else(|| MatchError::NoAppBundle {
                    test_project: test_project.clone(),
                    project: project.clone(),
                })?;

            plan.runs.push(TestRun {
                test_project: test_project.clone(),
                project: project.clone(),
                assembly_path: test_output.output.path.clone(),
                app_path: app.path.clone(),
            });
        }
    }

    Ok(plan)
}
