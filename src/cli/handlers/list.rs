// src/cli/handlers/list.rs

use anyhow::{Context, Result};
use std::env;

use crate::cli::{RunArgs, handlers::commons};

/// Prints the name of every known dependency, library ones included, in load order.
pub fn handle(args: &RunArgs) -> Result<()> {
    let params = args.to_parameters()?;
    let cwd = env::current_dir().context("Could not determine the current directory")?;
    let workspace = commons::load_workspace(&params, &cwd, true)?;

    for name in workspace.catalog.dependency_names() {
        println!("- {}", name);
    }
    Ok(())
}
