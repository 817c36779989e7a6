//! Library half of the `medchain` binary: argument parsing, configuration,
//! commands and output. Kept separate from `main.rs` so it can be tested.

pub mod cli;
pub mod commands;
pub mod config;
pub mod exit;
pub mod output;

pub use cli::{Args, Command};
pub use commands::run;
pub use config::{Config, ConfigError};
pub use exit::{describe, exit_code_for, exit_codes, Outcome};
