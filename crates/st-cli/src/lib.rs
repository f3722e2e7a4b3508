//! SlimTimer CLI library.
//!
//! This crate provides the CLI interface over the `st-api` session.

mod cli;
pub mod commands;
mod config;

pub use cli::{Cli, Commands, EntryAction, TaskAction};
pub use config::Config;
