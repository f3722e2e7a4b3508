use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use st_api::Session;
use st_cli::commands::entries::{self, NewEntry};
use st_cli::commands::tasks::{self, NewTask};
use st_cli::{Cli, Commands, Config, EntryAction, TaskAction};

/// Load config and log in.
fn open_session(config_path: Option<&Path>) -> Result<Session> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    Session::with_config(
        config.username.as_str(),
        config.password.as_str(),
        config.api_key.as_str(),
        config.session_config(),
    )
    .context("failed to log in")
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = &cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let mut session = open_session(cli.config.as_deref())?;
    let mut out = std::io::stdout().lock();

    match command {
        Commands::Whoami => {
            writeln!(
                out,
                "{} (user id {})",
                session.username(),
                session.user_id().unwrap_or("?")
            )?;
        }
        Commands::Tasks { completed, json } => {
            tasks::list(&mut out, &mut session, *completed, *json)?;
        }
        Commands::Task(action) => match action {
            TaskAction::Show { id, json } => tasks::show(&mut out, &mut session, *id, *json)?,
            TaskAction::Find {
                name,
                completed,
                json,
            } => tasks::find(&mut out, &mut session, name, *completed, *json)?,
            TaskAction::Create {
                name,
                tags,
                coworkers,
                reporters,
            } => tasks::create(
                &mut out,
                &mut session,
                NewTask {
                    name: name.clone(),
                    tags: tags.clone(),
                    coworkers: coworkers.clone(),
                    reporters: reporters.clone(),
                },
            )?,
            TaskAction::Complete { id } => tasks::complete(&mut out, &mut session, *id)?,
            TaskAction::Delete { id } => tasks::delete(&mut out, &mut session, *id)?,
        },
        Commands::Entries { since, until, json } => {
            entries::list(
                &mut out,
                &mut session,
                since.as_deref(),
                until.as_deref(),
                *json,
            )?;
        }
        Commands::Entry(action) => match action {
            EntryAction::Add {
                task,
                start,
                end,
                tags,
            } => entries::add(
                &mut out,
                &mut session,
                NewEntry {
                    task_id: *task,
                    start: start.clone(),
                    end: end.clone(),
                    tags: tags.clone(),
                },
            )?,
            EntryAction::Delete { id } => entries::delete(&mut out, &mut session, *id)?,
        },
    }

    Ok(())
}
