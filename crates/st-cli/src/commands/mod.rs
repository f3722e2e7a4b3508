//! CLI subcommand implementations.

pub mod entries;
pub mod tasks;
pub mod util;
