// src/system/runner.rs

//! The [`TaskRunner`] that executes tasks on the local machine.
//!
//! `shell` and `ansible` tasks spawn processes; `predefined` and `toolbox` tasks are
//! rewritten into a call to a task of the predefined registry and run through it.

use crate::{
    constants::{ANSIBLE_CONFIG_ENV, PLAYBOOK_PREFIX, TOOLBOX_PREDEFINED_TASK},
    core::{
        configuration::{ConfigLayers, ConfigValues},
        population::DependencyCatalog,
        task_runner::{RunnerError, TaskRunner},
    },
    models::{Dependency, PredefinedCall, RunMode, Task, TaskKind, TaskOutcome, TaskRole, ToolboxCall},
    system::executor,
};
use lazy_static::lazy_static;
use log::{debug, info};
use regex::{Captures, Regex};
use serde::Serialize;
use std::{
    collections::HashMap,
    io::Write,
    path::{Path, PathBuf},
};

lazy_static! {
    /// `${key}` or `$key` references to configuration values.
    static ref CONFIG_REF: Regex =
        Regex::new(r"\$\{([A-Za-z0-9_.-]+)\}|\$([A-Za-z0-9_]+)").unwrap();
}

/// A one-play Ansible playbook running `tasks` against the local machine.
#[derive(Serialize)]
struct Play<'a> {
    name: String,
    connection: &'static str,
    gather_facts: bool,
    hosts: &'static str,
    tasks: &'a [serde_yaml::Value],
}

#[derive(Debug)]
pub struct SystemTaskRunner<'a> {
    catalog: &'a DependencyCatalog,
    config: &'a ConfigLayers,
    mode: RunMode,
    ansible_config: Option<PathBuf>,
    workdir: PathBuf,
}

impl<'a> SystemTaskRunner<'a> {
    pub fn new(
        catalog: &'a DependencyCatalog,
        config: &'a ConfigLayers,
        mode: RunMode,
        ansible_config: Option<PathBuf>,
        workdir: PathBuf,
    ) -> Self {
        Self {
            catalog,
            config,
            mode,
            ansible_config,
            workdir,
        }
    }

    /// The configuration exported to a task: the dependency's keys followed by the task's own.
    fn task_configuration(
        config: &ConfigLayers,
        dependency: &Dependency,
        task: &Task,
    ) -> Result<ConfigValues, RunnerError> {
        let keys = dependency.spec.configuration.iter().chain(&task.configuration);
        Ok(config.resolve_keys(&dependency.config_values, keys)?)
    }

    /// Runs `task` with `config`, the run's layers scoped by the enclosing predefined calls.
    fn run(
        &self,
        config: &ConfigLayers,
        dependency: &Dependency,
        task: &Task,
        role: TaskRole,
        chain: &mut Vec<String>,
    ) -> Result<TaskOutcome, RunnerError> {
        match &task.kind {
            TaskKind::Shell(script) => self.run_shell(config, dependency, task, script),
            TaskKind::Ansible(tasks) => self.run_ansible(config, dependency, task, tasks),
            TaskKind::Predefined(call) => self.run_predefined(config, dependency, task, call, role, chain),
            TaskKind::Toolbox(call) => self.run_toolbox(config, dependency, task, call, role, chain),
        }
    }

    fn run_shell(
        &self,
        config: &ConfigLayers,
        dependency: &Dependency,
        task: &Task,
        script: &str,
    ) -> Result<TaskOutcome, RunnerError> {
        debug!("[shell] Running '{}' ...", task.name);
        let env: HashMap<String, String> = Self::task_configuration(config, dependency, task)?
            .into_iter()
            .collect();
        for (key, value) in &env {
            debug!("[shell] env {}={}", key, value);
        }
        let script = script.trim();
        for line in script.lines() {
            debug!("[shell] {}", line);
        }

        if self.mode == RunMode::DryRun {
            info!("Dry mode, skipping execution.");
            return Ok(TaskOutcome::Skipped);
        }

        let args = vec!["-cxeuo".to_string(), "pipefail".to_string(), script.to_string()];
        let success = executor::execute_command(&task.name, "bash", &args, &self.workdir, &env)?;
        Ok(TaskOutcome::from_success(success))
    }

    fn run_ansible(
        &self,
        config: &ConfigLayers,
        dependency: &Dependency,
        task: &Task,
        tasks: &[serde_yaml::Value],
    ) -> Result<TaskOutcome, RunnerError> {
        let play = [Play {
            name: format!("Run {}", task.name),
            connection: "local",
            gather_facts: false,
            hosts: "localhost",
            tasks,
        }];
        let playbook = serde_yaml::to_string(&play)?;

        let mut args = Vec::new();
        for (key, value) in Self::task_configuration(config, dependency, task)? {
            debug!("[ansible] extra var: {}={}", key, value);
            args.push("--extra-vars".to_string());
            args.push(format!("{}={}", key, value));
        }

        let mut env = HashMap::new();
        if let Some(ansible_config) = &self.ansible_config {
            env.insert(ANSIBLE_CONFIG_ENV.to_string(), ansible_config.display().to_string());
        }

        if self.mode == RunMode::DryRun {
            debug!(
                "[ansible] command: ansible-playbook <playbook> {}",
                shlex::try_join(args.iter().map(String::as_str)).unwrap_or_default()
            );
            info!("Dry mode, skipping execution.");
            return Ok(TaskOutcome::Skipped);
        }

        // Removed when dropped, whatever the outcome.
        let mut file = write_playbook(&self.workdir, &playbook)?;
        file.flush()?;
        args.insert(0, file.path().display().to_string());
        debug!(
            "[ansible] command: ansible-playbook {}",
            shlex::try_join(args.iter().map(String::as_str)).unwrap_or_default()
        );

        let success = executor::execute_command(&task.name, "ansible-playbook", &args, &self.workdir, &env)?;
        Ok(TaskOutcome::from_success(success))
    }

    fn run_predefined(
        &self,
        config: &ConfigLayers,
        dependency: &Dependency,
        task: &Task,
        call: &PredefinedCall,
        role: TaskRole,
        chain: &mut Vec<String>,
    ) -> Result<TaskOutcome, RunnerError> {
        let predefined = self
            .catalog
            .predefined_task(&call.name)
            .ok_or_else(|| RunnerError::UnknownPredefinedTask {
                name: call.name.clone(),
                available: self.catalog.predefined_names().map(str::to_string).collect(),
            })?;
        if chain.contains(&call.name) {
            return Err(RunnerError::PredefinedLoop {
                chain: format!("{} -> {}", chain.join(" -> "), call.name),
            });
        }

        let mut renamed = predefined.clone();
        renamed.name = format!("{} | predefined({})", task.name, call.name);
        debug!("[predefined] Running '{}' ...", renamed.name);

        let scoped = config.with_call_args(&call.args);

        chain.push(call.name.clone());
        let outcome = self.run(&scoped, dependency, &renamed, role, chain);
        chain.pop();
        outcome
    }

    fn run_toolbox(
        &self,
        config: &ConfigLayers,
        dependency: &Dependency,
        task: &Task,
        call: &ToolboxCall,
        role: TaskRole,
        chain: &mut Vec<String>,
    ) -> Result<TaskOutcome, RunnerError> {
        let values = Self::task_configuration(config, dependency, task)?;

        let mut args = indexmap::IndexMap::new();
        args.insert("group".to_string(), substitute(&call.group, &values));
        args.insert("command".to_string(), substitute(&call.command, &values));
        args.insert("args".to_string(), substitute(&call.args.join(" "), &values));

        let toolbox_task = Task {
            name: format!("{} | toolbox()", task.name),
            kind: TaskKind::Predefined(PredefinedCall {
                name: TOOLBOX_PREDEFINED_TASK.to_string(),
                args,
            }),
            configuration: task.configuration.clone(),
        };
        debug!("[toolbox] Running '{}' ...", toolbox_task.name);
        self.run(config, dependency, &toolbox_task, role, chain)
    }
}

impl TaskRunner for SystemTaskRunner<'_> {
    fn execute(
        &mut self,
        dependency: &Dependency,
        task: &Task,
        role: TaskRole,
    ) -> Result<TaskOutcome, RunnerError> {
        self.run(self.config, dependency, task, role, &mut Vec::new())
    }
}

/// Replaces `$key` and `${key}` with the configuration value of `key`.
/// References to unknown keys are left untouched.
fn substitute(text: &str, values: &ConfigValues) -> String {
    CONFIG_REF
        .replace_all(text, |caps: &Captures| {
            let key = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            match values.get(key) {
                Some(value) => value.clone(),
                None => caps.get(0).map_or("", |m| m.as_str()).to_string(),
            }
        })
        .into_owned()
}

fn write_playbook(dir: &Path, content: &str) -> std::io::Result<tempfile::NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(PLAYBOOK_PREFIX)
        .suffix(".yaml")
        .tempfile_in(dir)?;
    file.write_all(content.as_bytes())?;
    Ok(file)
}
