// src/core/mod.rs

pub mod configuration;
pub mod population;
pub mod resolver;
pub mod schema;
pub mod summary;
pub mod task_runner;
