// src/system/executor.rs

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::process::{Command as StdCommand, Stdio};
use std::thread;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("No command specified to run.")]
    EmptyCommand,
    #[error("Command '{0}' could not be executed: {1}")]
    CommandFailed(String, std::io::Error),
    #[error("Lost the output of command '{0}': {1}")]
    OutputLost(String, std::io::Error),
}

/// Runs `program` with `args` to completion and reports whether it exited successfully.
///
/// Both output streams are forwarded line by line to the debug log, prefixed with `label |`.
/// A non-zero exit status is not an error: it is the task failing.
pub fn execute_command(
    label: &str,
    program: &str,
    args: &[String],
    cwd: &Path,
    env_vars: &HashMap<String, String>,
) -> Result<bool, ExecutionError> {
    if program.trim().is_empty() {
        return Err(ExecutionError::EmptyCommand);
    }
    let display = shlex::try_join(std::iter::once(program).chain(args.iter().map(String::as_str)))
        .unwrap_or_else(|_| program.to_string());
    log::debug!("Executing: {}", display);

    let mut child = StdCommand::new(program)
        .args(args)
        .current_dir(cwd)
        .envs(env_vars)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| ExecutionError::CommandFailed(display.clone(), e))?;

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();

    thread::scope(|scope| {
        let err_thread = scope.spawn(|| stderr.map(|s| forward_lines(label, s)).transpose());
        let out_result = stdout.map(|s| forward_lines(label, s)).transpose();
        let err_result = err_thread.join().unwrap_or(Ok(None));
        out_result.and(err_result)
    })
    .map_err(|e| ExecutionError::OutputLost(display.clone(), e))?;

    let status = child
        .wait()
        .map_err(|e| ExecutionError::CommandFailed(display.clone(), e))?;
    log::debug!("'{}' exited with {}", display, status);
    Ok(status.success())
}

fn forward_lines(label: &str, stream: impl Read) -> std::io::Result<()> {
    for line in BufReader::new(stream).lines() {
        log::debug!("{} | {}", label, line?);
    }
    Ok(())
}
