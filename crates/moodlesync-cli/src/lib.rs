//! CLI, YAML configuration and run-once entry point.
//!
//! This crate provides the `moodlesync` command-line interface.

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;

pub use cli::Cli;
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
