//! # System Interaction Layer
//!
//! The boundary between the resolution engine and the operating system.
//!
//! ## Modules
//!
//! - **`executor`**: spawns external processes and forwards their output to the log.
//! - **`runner`**: the [`TaskRunner`](crate::core::task_runner::TaskRunner) executing
//!   `shell`, `ansible`, `predefined` and `toolbox` tasks on the local machine.

pub mod executor;
pub mod runner;
