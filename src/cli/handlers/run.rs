// src/cli/handlers/run.rs

use anyhow::{Context, Result};
use log::{info, warn};
use std::env;

use crate::{
    cli::{RunArgs, UsageError, handlers::commons},
    core::{
        resolver::Resolver,
        summary::{self, ExitSignal},
    },
    models::RunMode,
    state::ResolutionState,
    system::runner::SystemTaskRunner,
};

/// Entry point of the `dryrun`, `test` and `ensure` actions.
///
/// Resolves the target dependency and reports the run summary.
pub fn handle(mode: RunMode, args: &RunArgs) -> Result<ExitSignal> {
    let params = args.to_parameters()?;
    let cwd = env::current_dir().context("Could not determine the current directory")?;

    // 1. Load every definition file and the configuration layers.
    let workspace = commons::load_workspace(&params, &cwd, false)?;

    // 2. Pick the main dependency: the given target, or the first one of the file.
    let target = params
        .target
        .clone()
        .or(workspace.first_target.clone())
        .ok_or(UsageError::NoTarget)?;
    let dependency = workspace
        .catalog
        .get(&target)
        .ok_or_else(|| UsageError::UnknownTarget(target.clone()))?;

    info!("Running in {} mode, target '{}'.", mode, target);

    // 3. Resolve it.
    let runner = SystemTaskRunner::new(
        &workspace.catalog,
        &workspace.config,
        mode,
        params.ansible_config.clone(),
        cwd,
    );
    let mut state = ResolutionState::new(mode);
    let mut resolver = Resolver::new(&workspace.catalog, &workspace.config, runner);
    resolver
        .resolve(dependency, &mut state)
        .with_context(|| format!("Failed to resolve '{}'", target))?;

    // 4. Report.
    info!("All done.");
    let signal = summary::report(&state);
    if signal == ExitSignal::SomeTestsFailed {
        warn!("Test failed, exit with errcode={}.", signal.exit_code());
    }
    Ok(signal)
}
