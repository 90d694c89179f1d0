// src/core/summary.rs

use crate::{
    models::{RunMode, TaskOutcome},
    state::{InstallRecord, ResolutionState, TestRecord},
};
use colored::Colorize;
use log::info;

/// The overall verdict of a completed run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitSignal {
    AllPassed,
    /// At least one test task's latest outcome is a failure.
    SomeTestsFailed,
}

impl ExitSignal {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::AllPassed => 0,
            Self::SomeTestsFailed => 1,
        }
    }
}

/// Derives the verdict from the recorded test outcomes.
///
/// A test that failed before an installation and passed on re-test counts as passed.
pub fn exit_signal(state: &ResolutionState) -> ExitSignal {
    if state
        .tested()
        .values()
        .any(|record| record.outcome == TaskOutcome::Failure)
    {
        ExitSignal::SomeTestsFailed
    } else {
        ExitSignal::AllPassed
    }
}

fn test_line(key: &str, record: &TestRecord) -> String {
    match record.outcome {
        TaskOutcome::Success if record.failed_before => {
            format!("- {} {} (failed, fixed by install)", "☑".green(), key)
        }
        TaskOutcome::Success => format!("- {} {}", "☑".green(), key),
        TaskOutcome::Failure => format!("- {} {}", "❎".red(), key),
        TaskOutcome::Skipped => format!("- {} {}", "·".dimmed(), key),
    }
}

fn install_line(key: &str, record: InstallRecord, mode: RunMode) -> String {
    match record {
        InstallRecord::Installed => format!("- {}", key),
        // Planned by `dryrun`/`test`, or skipped by the runner in `ensure`.
        InstallRecord::WouldInstall if mode == RunMode::Ensure => format!("- {} (skipped)", key),
        InstallRecord::WouldInstall => format!("- {}", key),
    }
}

/// Renders the end-of-run report, one entry per line.
pub fn render(state: &ResolutionState) -> Vec<String> {
    let mode = state.mode();
    let mut lines = Vec::new();

    let (tested, installed) = match mode {
        RunMode::DryRun => ("Would have tested", "Would have installed"),
        RunMode::TestOnly => ("Tested", "Would have installed"),
        RunMode::Ensure => ("Tested", "Installed"),
    };

    if state.tested().is_empty() {
        lines.push(format!("{}: nothing.", tested).bold().to_string());
    } else {
        lines.push(format!("{}:", tested).bold().to_string());
        for (key, record) in state.tested() {
            lines.push(test_line(key, record));
        }
    }

    if state.installed().is_empty() {
        lines.push(format!("{}: nothing.", installed).bold().to_string());
    } else {
        lines.push(format!("{}:", installed).bold().to_string());
        for (key, record) in state.installed() {
            lines.push(install_line(key, *record, mode));
        }
    }

    lines
}

/// Logs the end-of-run report and returns the run verdict.
pub fn report(state: &ResolutionState) -> ExitSignal {
    info!("");
    info!("{}", "Summary:".bold());
    for line in render(state) {
        info!("{}", line);
    }
    exit_signal(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(mode: RunMode) -> ResolutionState {
        colored::control::set_override(false);
        ResolutionState::new(mode)
    }

    #[test]
    fn test_fixed_by_install_is_a_pass() {
        let mut state = state(RunMode::Ensure);
        state.record_test("has_nfd.has_nfd_labels".to_string(), TaskOutcome::Failure);
        state.record_install("has_nfd.install".to_string(), InstallRecord::Installed);
        state.record_test("has_nfd.has_nfd_labels".to_string(), TaskOutcome::Success);

        assert_eq!(exit_signal(&state), ExitSignal::AllPassed);
        assert_eq!(
            render(&state),
            vec![
                "Tested:",
                "- ☑ has_nfd.has_nfd_labels (failed, fixed by install)",
                "Installed:",
                "- has_nfd.install",
            ]
        );
    }

    #[test]
    fn test_any_latest_failure_fails_the_run() {
        let mut state = state(RunMode::TestOnly);
        state.record_test("has_gpu.lspci".to_string(), TaskOutcome::Failure);
        state.record_test("has_gpu.nvidia_smi".to_string(), TaskOutcome::Success);
        state.record_install("has_gpu.install".to_string(), InstallRecord::WouldInstall);

        assert_eq!(exit_signal(&state), ExitSignal::SomeTestsFailed);
        assert_eq!(ExitSignal::SomeTestsFailed.exit_code(), 1);
        assert_eq!(
            render(&state),
            vec![
                "Tested:",
                "- ❎ has_gpu.lspci",
                "- ☑ has_gpu.nvidia_smi",
                "Would have installed:",
                "- has_gpu.install",
            ]
        );
    }

    #[test]
    fn test_dry_run_headings() {
        let mut state = state(RunMode::DryRun);
        state.record_test("has_nfd.has_nfd_labels".to_string(), TaskOutcome::Skipped);

        assert_eq!(exit_signal(&state), ExitSignal::AllPassed);
        assert_eq!(
            render(&state),
            vec![
                "Would have tested:",
                "- · has_nfd.has_nfd_labels",
                "Would have installed: nothing.",
            ]
        );
    }

    #[test]
    fn test_empty_run() {
        let state = state(RunMode::Ensure);
        assert_eq!(render(&state), vec!["Tested: nothing.", "Installed: nothing."]);
        assert_eq!(ExitSignal::AllPassed.exit_code(), 0);
    }
}
