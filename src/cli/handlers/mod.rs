// src/cli/handlers/mod.rs

// One module per CLI action. `dryrun`, `test` and `ensure` share the `run` handler.

pub mod commons;
pub mod example;
pub mod list;
pub mod run;
