// src/state.rs

use crate::models::{RunMode, TaskOutcome};
use indexmap::IndexMap;
use std::collections::HashSet;

/// What the summary knows about one test task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestRecord {
    /// The most recent outcome. A re-test after installation overwrites it.
    pub outcome: TaskOutcome,
    /// Whether the task failed at some point before its latest outcome.
    pub failed_before: bool,
}

/// What the summary knows about one install task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallRecord {
    /// The task was executed and succeeded.
    Installed,
    /// The run mode only planned the installation.
    WouldInstall,
}

/// The mutable state of a single resolution run.
///
/// Created fresh for every invocation and threaded explicitly through the resolver,
/// so tests can build one per case. Nothing is persisted across runs.
#[derive(Debug)]
pub struct ResolutionState {
    mode: RunMode,
    resolved: HashSet<String>,
    /// Dependencies currently being resolved, outermost first.
    in_progress: Vec<String>,
    tested: IndexMap<String, TestRecord>,
    installed: IndexMap<String, InstallRecord>,
}

impl ResolutionState {
    pub fn new(mode: RunMode) -> Self {
        Self {
            mode,
            resolved: HashSet::new(),
            in_progress: Vec::new(),
            tested: IndexMap::new(),
            installed: IndexMap::new(),
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn is_resolved(&self, name: &str) -> bool {
        self.resolved.contains(name)
    }

    pub fn mark_resolved(&mut self, name: &str) {
        self.resolved.insert(name.to_string());
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    /// Pushes `name` on the in-progress stack.
    ///
    /// Returns the cycle path (`a -> b -> a`) when `name` is already being resolved.
    pub fn enter(&mut self, name: &str) -> Result<(), String> {
        if let Some(start) = self.in_progress.iter().position(|n| n == name) {
            let mut cycle: Vec<&str> = self
                .in_progress
                .iter()
                .skip(start)
                .map(String::as_str)
                .collect();
            cycle.push(name);
            return Err(cycle.join(" -> "));
        }
        self.in_progress.push(name.to_string());
        Ok(())
    }

    pub fn leave(&mut self, name: &str) {
        if let Some(pos) = self.in_progress.iter().rposition(|n| n == name) {
            self.in_progress.remove(pos);
        }
    }

    /// Records a test outcome. An existing entry keeps its position in the listing.
    pub fn record_test(&mut self, key: String, outcome: TaskOutcome) {
        let failed_before = self
            .tested
            .get(&key)
            .is_some_and(|r| r.failed_before || r.outcome == TaskOutcome::Failure);
        self.tested.insert(
            key,
            TestRecord {
                outcome,
                failed_before,
            },
        );
    }

    pub fn record_install(&mut self, key: String, record: InstallRecord) {
        self.installed.insert(key, record);
    }

    pub fn tested(&self) -> &IndexMap<String, TestRecord> {
        &self.tested
    }

    pub fn installed(&self) -> &IndexMap<String, InstallRecord> {
        &self.installed
    }
}
