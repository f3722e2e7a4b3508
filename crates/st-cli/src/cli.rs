//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use st_core::CompletedFilter;

/// SlimTimer client.
///
/// Lists, creates, completes and deletes tasks and time entries on a
/// SlimTimer account.
#[derive(Debug, Parser)]
#[command(name = "st", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the account the session is logged in as.
    Whoami,

    /// List tasks.
    Tasks {
        /// Completion filter: both, yes, no (true/false also accepted).
        #[arg(long, default_value = "both")]
        completed: CompletedFilter,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Work with a single task.
    #[command(subcommand)]
    Task(TaskAction),

    /// List time entries.
    Entries {
        /// Only entries starting at or after this time (ISO 8601 or "2 days ago").
        #[arg(long)]
        since: Option<String>,

        /// Only entries up to this time.
        #[arg(long)]
        until: Option<String>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Work with a single time entry.
    #[command(subcommand)]
    Entry(EntryAction),
}

/// Task subcommands.
#[derive(Debug, Subcommand)]
pub enum TaskAction {
    /// Show a task by id.
    Show {
        id: u64,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Find a task by exact name.
    Find {
        name: String,

        #[arg(long, default_value = "both")]
        completed: CompletedFilter,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Create a task.
    Create {
        name: String,

        /// Tag to attach (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Coworker email (repeatable).
        #[arg(long = "coworker")]
        coworkers: Vec<String>,

        /// Reporter email (repeatable).
        #[arg(long = "reporter")]
        reporters: Vec<String>,
    },

    /// Mark a task complete.
    Complete { id: u64 },

    /// Delete a task.
    Delete { id: u64 },
}

/// Time entry subcommands.
#[derive(Debug, Subcommand)]
pub enum EntryAction {
    /// Record time against a task.
    Add {
        /// Task id.
        #[arg(long)]
        task: u64,

        /// Start of the interval.
        #[arg(long)]
        start: String,

        /// End of the interval.
        #[arg(long)]
        end: String,

        /// Comma-separated tags.
        #[arg(long)]
        tags: Option<String>,
    },

    /// Delete a time entry.
    Delete { id: u64 },
}
