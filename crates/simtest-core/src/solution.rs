//! Minimal Visual Studio solution and C# project readers.
//!
//! Only what the UI test step needs is extracted: project entries and their
//! configuration mapping from the `.sln` file; assembly name, output kind,
//! SDK, test framework, project references and output paths from each
//! `.csproj`. Both formats are scanned line by line.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use crate::builder::{BuildError, Sdk, TestFramework};

const SOLUTION_FOLDER_TYPE_GUID: &str = "2150E333-8FDC-42A3-9474-1A3956D46DE8";
const PROJECT_CONFIGURATIONS_SECTION: &str = "GlobalSection(ProjectConfigurationPlatforms)";

const IOS_PROJECT_TYPE_GUIDS: &[&str] = &[
    "FEACFBD2-3405-455C-9665-78FE426C6842",
    "6BC8ED88-2882-458C-8E55-DFD12B67127B",
];
const ANDROID_PROJECT_TYPE_GUIDS: &[&str] = &["EFBA0AD7-5A72-4C68-AF49-83D382785DCF"];
const MAC_PROJECT_TYPE_GUIDS: &[&str] = &[
    "A3F8F2AB-B479-4A4A-A458-A89E7DC349F1",
    "42C0BBD9-55CE-4FC1-8D90-A7348ABAFB23",
];
const TVOS_PROJECT_TYPE_GUIDS: &[&str] = &["06FA79CB-D6CD-4721-BB4B-1BD202089C55"];

/// A project entry of a solution file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionProject {
    pub name: String,
    pub guid: String,
    pub path: PathBuf,
}

/// A parsed `.sln` file.
#[derive(Debug, Clone)]
pub struct Solution {
    pub path: PathBuf,
    pub name: String,
    pub projects: Vec<SolutionProject>,
    /// `(project guid, solution "config|platform")` to project "config|platform".
    configurations: HashMap<(String, String), String>,
}

impl Solution {
    /// Reads and parses the solution at `path`.
    pub fn open(path: &Path) -> Result<Self, BuildError> {
        if !path.exists() {
            return Err(BuildError::SolutionNotFound(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Ok(Self::parse(path, &content))
    }

    /// Parses solution text. Project paths are resolved against the
    /// directory of `path`.
    pub fn parse(path: &Path, content: &str) -> Self {
        let solution_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        let mut projects = Vec::new();
        let mut configurations = HashMap::new();
        let mut in_project_configurations = false;

        for line in content.lines() {
            let line = line.trim().trim_start_matches('\u{feff}');

            if line.starts_with("Project(") {
                if let Some(project) = parse_project_line(line, solution_dir) {
                    projects.push(project);
                }
            } else if line.starts_with(PROJECT_CONFIGURATIONS_SECTION) {
                in_project_configurations = true;
            } else if line.starts_with("EndGlobalSection") {
                in_project_configurations = false;
            } else if in_project_configurations {
                if let Some((key, value)) = parse_configuration_line(line) {
                    configurations.insert(key, value);
                }
            }
        }

        Self {
            path: path.to_path_buf(),
            name,
            projects,
            configurations,
        }
    }

    /// Maps a solution configuration and platform onto the project's own.
    ///
    /// Falls back to the solution values when the solution has no mapping.
    pub fn project_configuration(
        &self,
        project_guid: &str,
        configuration: &str,
        platform: &str,
    ) -> (String, String) {
        let key = (
            project_guid.to_uppercase(),
            format!("{}|{}", configuration, platform),
        );

        self.configurations
            .get(&key)
            .and_then(|value| value.split_once('|'))
            .map(|(c, p)| (c.to_string(), p.to_string()))
            .unwrap_or_else(|| (configuration.to_string(), platform.to_string()))
    }
}

/// `Project("{TYPE}") = "Name", "Dir\Name.csproj", "{GUID}"`
fn parse_project_line(line: &str, solution_dir: &Path) -> Option<SolutionProject> {
    let (head, tail) = line.split_once('=')?;
    let type_guid = head
        .trim()
        .trim_start_matches("Project(")
        .trim_end_matches(')')
        .trim_matches(|c| c == '"' || c == '{' || c == '}');

    let fields: Vec<&str> = tail
        .split(',')
        .map(|f| f.trim().trim_matches('"'))
        .collect();
    let [name, relative_path, guid] = fields.as_slice() else {
        return None;
    };

    if type_guid.eq_ignore_ascii_case(SOLUTION_FOLDER_TYPE_GUID) {
        return None;
    }
    let lower = relative_path.to_lowercase();
    if !(lower.ends_with(".csproj") || lower.ends_with(".fsproj")) {
        return None;
    }

    Some(SolutionProject {
        name: name.to_string(),
        guid: guid.trim_matches(|c| c == '{' || c == '}').to_uppercase(),
        path: normalize_path(&solution_dir.join(windows_path(relative_path))),
    })
}

/// `{GUID}.Debug|iPhoneSimulator.ActiveCfg = Debug|iPhoneSimulator`
fn parse_configuration_line(line: &str) -> Option<((String, String), String)> {
    let (lhs, rhs) = line.split_once('=')?;
    let lhs = lhs.trim().strip_suffix(".ActiveCfg")?;
    let (guid, solution_config) = lhs.split_once("}.")?;
    let guid = guid.trim_start_matches('{').to_uppercase();

    Some(((guid, solution_config.to_string()), rhs.trim().to_string()))
}

/// Whether a project builds an executable or a library.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectKind {
    Executable,
    Library,
}

/// A parsed `.csproj` file.
#[derive(Debug, Clone)]
pub struct Project {
    pub name: String,
    pub path: PathBuf,
    pub assembly_name: String,
    pub kind: ProjectKind,
    pub sdk: Sdk,
    pub test_framework: TestFramework,
    /// Normalized paths of referenced project files.
    pub references: Vec<PathBuf>,
    /// `"config|platform"` to output directory relative to the project.
    output_paths: HashMap<String, PathBuf>,
}

impl Project {
    /// Reads and parses the project file of a solution entry.
    pub fn open(entry: &SolutionProject) -> Result<Self, BuildError> {
        let content =
            std::fs::read_to_string(&entry.path).map_err(|e| BuildError::InvalidProject {
                path: entry.path.clone(),
                reason: e.to_string(),
            })?;
        Ok(Self::parse(&entry.name, &entry.path, &content))
    }

    /// Parses project XML text.
    pub fn parse(name: &str, path: &Path, content: &str) -> Self {
        let project_dir = path.parent().unwrap_or_else(|| Path::new(""));

        let mut assembly_name = None;
        let mut kind = ProjectKind::Library;
        let mut sdk = Sdk::Unknown;
        let mut test_framework = TestFramework::None;
        let mut references = Vec::new();
        let mut output_paths = HashMap::new();
        let mut condition: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();

            if line.starts_with("<PropertyGroup") {
                condition = attribute(line, "Condition").and_then(configuration_condition);
            } else if line.starts_with("</PropertyGroup>") {
                condition = None;
            } else if let Some(value) = element_text(line, "AssemblyName") {
                assembly_name = Some(value.to_string());
            } else if let Some(value) = element_text(line, "OutputType") {
                if value.eq_ignore_ascii_case("exe") || value.eq_ignore_ascii_case("winexe") {
                    kind = ProjectKind::Executable;
                }
            } else if let Some(value) = element_text(line, "ProjectTypeGuids") {
                sdk = sdk_from_type_guids(value);
            } else if let Some(value) = element_text(line, "TargetFramework") {
                if sdk == Sdk::Unknown {
                    sdk = sdk_from_target_framework(value);
                }
            } else if let Some(value) = element_text(line, "OutputPath") {
                if let Some(condition) = &condition {
                    output_paths.insert(condition.clone(), windows_path(value));
                }
            } else if line.starts_with("<ProjectReference") {
                if let Some(include) = attribute(line, "Include") {
                    references.push(normalize_path(&project_dir.join(windows_path(include))));
                }
            } else if line.starts_with("<Reference") || line.starts_with("<PackageReference") {
                if let Some(include) = attribute(line, "Include") {
                    let package = include.split(',').next().unwrap_or_default().trim();
                    if package.eq_ignore_ascii_case("Xamarin.UITest") {
                        test_framework = TestFramework::XamarinUiTest;
                    } else if package.eq_ignore_ascii_case("nunit.framework")
                        || package.eq_ignore_ascii_case("NUnit")
                    {
                        if test_framework == TestFramework::None {
                            test_framework = TestFramework::NUnit;
                        }
                    }
                }
            } else if line.starts_with("<Import") && sdk == Sdk::Unknown {
                if let Some(project) = attribute(line, "Project") {
                    if project.contains("Xamarin.iOS") {
                        sdk = Sdk::Ios;
                    } else if project.contains("Xamarin.Android") {
                        sdk = Sdk::Android;
                    }
                }
            }
        }

        let assembly_name = assembly_name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| name.to_string())
        });

        Self {
            name: name.to_string(),
            path: path.to_path_buf(),
            assembly_name,
            kind,
            sdk,
            test_framework,
            references,
            output_paths,
        }
    }

    pub fn is_ui_test(&self) -> bool {
        self.test_framework == TestFramework::XamarinUiTest
    }

    pub fn project_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// Output directory for a project configuration and platform.
    ///
    /// Uses the project's conditional `OutputPath` when declared, otherwise
    /// `bin/<platform>/<configuration>` for iOS and `bin/<configuration>`
    /// for everything else.
    pub fn output_dir(&self, configuration: &str, platform: &str) -> PathBuf {
        let key = format!("{}|{}", configuration, platform);
        let relative = self.output_paths.get(&key).cloned().unwrap_or_else(|| {
            if self.sdk == Sdk::Ios {
                Path::new("bin").join(platform).join(configuration)
            } else {
                Path::new("bin").join(configuration)
            }
        });
        normalize_path(&self.project_dir().join(relative))
    }
}

/// Text of `<tag>value</tag>` when the whole element sits on one line.
fn element_text<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let rest = line.strip_prefix('<')?.strip_prefix(tag)?.strip_prefix('>')?;
    let end = rest.find("</")?;
    Some(rest[..end].trim())
}

/// Value of `name="value"` in a start tag.
fn attribute<'a>(line: &'a str, name: &str) -> Option<&'a str> {
    let pattern = format!("{}=\"", name);
    let start = line.find(&pattern)? + pattern.len();
    let end = line[start..].find('"')?;
    Some(&line[start..start + end])
}

/// `" '$(Configuration)|$(Platform)' == 'Debug|iPhoneSimulator' "` to
/// `Debug|iPhoneSimulator`.
fn configuration_condition(condition: &str) -> Option<String> {
    let (_, value) = condition.split_once("==")?;
    let value = value.trim().trim_matches('\'').trim();
    value.contains('|').then(|| value.to_string())
}

fn sdk_from_type_guids(guids: &str) -> Sdk {
    let guids: Vec<String> = guids
        .split(';')
        .map(|g| g.trim().trim_matches(|c| c == '{' || c == '}').to_uppercase())
        .collect();

    if contains_any(&guids, IOS_PROJECT_TYPE_GUIDS) {
        Sdk::Ios
    } else if contains_any(&guids, ANDROID_PROJECT_TYPE_GUIDS) {
        Sdk::Android
    } else if contains_any(&guids, TVOS_PROJECT_TYPE_GUIDS) {
        Sdk::TvOs
    } else if contains_any(&guids, MAC_PROJECT_TYPE_GUIDS) {
        Sdk::MacOs
    } else {
        Sdk::Unknown
    }
}

fn contains_any(guids: &[String], known: &[&str]) -> bool {
    guids.iter().any(|g| known.iter().any(|k| g.as_str() == *k))
}

fn sdk_from_target_framework(framework: &str) -> Sdk {
    let framework = framework.to_lowercase();
    if framework.ends_with("-ios") {
        Sdk::Ios
    } else if framework.ends_with("-android") {
        Sdk::Android
    } else if framework.ends_with("-tvos") {
        Sdk::TvOs
    } else if framework.ends_with("-macos") || framework.ends_with("-maccatalyst") {
        Sdk::MacOs
    } else {
        Sdk::Unknown
    }
}

/// Converts a backslash-separated path from a solution or project file.
fn windows_path(path: &str) -> PathBuf {
    PathBuf::from(path.replace('\\', "/"))
}

/// Lexically removes `.` and `..` components.
pub(crate) fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(normalized.components().next_back(), Some(Component::Normal(_))) {
                    normalized.pop();
                } else {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}
