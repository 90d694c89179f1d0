// src/models.rs

use indexmap::IndexMap;
use std::fmt;
use std::path::PathBuf;

// --- RUN MODES AND OUTCOMES ---

/// The run-wide policy controlling whether installation tasks are executed.
///
/// Fixed for the whole invocation. `list` is not a mode: it never reaches the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunMode {
    /// Nothing is executed; tests and installs are only reported.
    DryRun,
    /// Tests are executed, installations are only planned.
    TestOnly,
    /// Tests are executed and unsatisfied dependencies are installed.
    Ensure,
}

impl RunMode {
    /// Whether installation tasks are recorded as "would install" instead of being executed.
    pub fn plans_installs(self) -> bool {
        !matches!(self, Self::Ensure)
    }

    /// The name of the mode as typed on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DryRun => "dryrun",
            Self::TestOnly => "test",
            Self::Ensure => "ensure",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a task is being executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRole {
    Test,
    Install,
}

impl TaskRole {
    /// Label used in log lines ("Testing of 'x': Success").
    pub fn label(self) -> &'static str {
        match self {
            Self::Test => "Testing",
            Self::Install => "Installation",
        }
    }
}

/// The tri-state result reported by a task runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failure,
    /// The runner deliberately did not execute the task (dry run).
    Skipped,
}

impl TaskOutcome {
    pub fn from_success(success: bool) -> Self {
        if success { Self::Success } else { Self::Failure }
    }

    pub fn is_success(self) -> bool {
        matches!(self, Self::Success)
    }
}

// --- TASK MODEL ---

/// One executable unit of verification or remediation.
///
/// Built once during population from a validated document and never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub name: String,
    pub kind: TaskKind,
    /// Configuration keys that must be resolvable before the task runs.
    pub configuration: Vec<String>,
}

/// The type-specific payload of a task. The YAML `type` field selects the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskKind {
    /// `type: shell` - a bash script.
    Shell(String),
    /// `type: ansible` - the task list of a local, single-play playbook.
    Ansible(Vec<serde_yaml::Value>),
    /// `type: predefined` - a call to a task of the predefined registry.
    Predefined(PredefinedCall),
    /// `type: toolbox` - a toolbox command, executed through the `run_toolbox` predefined task.
    Toolbox(ToolboxCall),
}

impl TaskKind {
    /// The YAML `type` tag of this variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Shell(_) => "shell",
            Self::Ansible(_) => "ansible",
            Self::Predefined(_) => "predefined",
            Self::Toolbox(_) => "toolbox",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PredefinedCall {
    pub name: String,
    /// Configuration values that take precedence over every other source for the called task.
    pub args: IndexMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolboxCall {
    pub group: String,
    pub command: String,
    pub args: Vec<String>,
}

// --- DEPENDENCY MODEL ---

#[derive(Debug, Clone, PartialEq, Default)]
pub struct DependencySpec {
    /// Names of other dependencies, resolved in declaration order before this one is tested.
    pub requirements: Vec<String>,
    /// Configuration keys the dependency itself needs.
    pub configuration: Vec<String>,
    /// Tried in order; the first success satisfies the dependency.
    pub test: Vec<Task>,
    /// Run in order when no test succeeded; every one of them must succeed.
    pub install: Vec<Task>,
}

/// A named capability that can be verified and, if missing, installed.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dependency {
    /// Final name, including the library prefix when loaded from a library file.
    pub name: String,
    /// Configuration values bound directly on the dependency.
    pub config_values: IndexMap<String, String>,
    pub spec: DependencySpec,
}

impl Dependency {
    /// A dependency with neither tests nor installs has nothing to check.
    pub fn is_trivially_satisfied(&self) -> bool {
        self.spec.test.is_empty() && self.spec.install.is_empty()
    }

    /// Key under which a task of this dependency is recorded in the run summary.
    pub fn task_key(&self, task: &Task) -> String {
        format!("{}.{}", self.name, task.name)
    }
}

// --- RUN PARAMETERS ---

/// The closed set of whole-run parameters, as gathered by the command-line front-end.
#[derive(Debug, Clone, Default)]
pub struct RunParameters {
    pub dependency_file: PathBuf,
    pub target: Option<String>,
    pub ansible_config: Option<PathBuf>,
    pub library: bool,
    /// Raw `key=value,key=value` override list.
    pub config: Option<String>,
    /// Raw `--config-file` value: empty, `no`, or a path.
    pub config_file: Option<String>,
    /// Directory holding `predefined.d/` and `library.d/`.
    pub home: Option<PathBuf>,
}
