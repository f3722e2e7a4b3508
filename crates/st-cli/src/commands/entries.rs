//! Time entry commands: list, add, delete.

use std::io::Write;

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use st_api::{Persist, Session};
use st_core::{Entry, EntryTags};

use super::util::{format_duration, parse_datetime};

/// Fields a new entry is recorded with, as typed on the command line.
#[derive(Debug)]
pub struct NewEntry {
    pub task_id: u64,
    pub start: String,
    pub end: String,
    pub tags: Option<String>,
}

pub fn list<W: Write>(
    writer: &mut W,
    session: &mut Session,
    since: Option<&str>,
    until: Option<&str>,
    json: bool,
) -> Result<()> {
    let range_start = since.map(parse_datetime).transpose()?;
    let range_end = until.map(parse_datetime).transpose()?;

    let Some(entries) = session
        .get_time_entries(range_start, range_end)
        .context("failed to list time entries")?
    else {
        bail!("the server returned no time entry listing");
    };
    tracing::debug!(count = entries.len(), "listed time entries");

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&entries)?)?;
    } else {
        render_entries(writer, &entries)?;
    }
    Ok(())
}

pub fn add<W: Write>(writer: &mut W, session: &mut Session, new: NewEntry) -> Result<()> {
    let start = parse_datetime(&new.start)?;
    let end = parse_datetime(&new.end)?;
    if end < start {
        bail!("entry ends before it starts");
    }

    let task = session
        .get_task_by_id(new.task_id)
        .context("failed to fetch task")?
        .with_context(|| format!("task not found: {}", new.task_id))?;

    let mut entry = Entry::new(task, start, end);
    if let Some(tags) = new.tags {
        entry.tags = EntryTags::Text(tags);
    }

    let entry = entry.save(session).context("failed to create time entry")?;
    writeln!(
        writer,
        "Recorded entry {} ({}) on {}",
        entry.id(),
        format_duration(entry.duration),
        entry.task.name
    )?;
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, session: &mut Session, id: u64) -> Result<()> {
    let entries = session
        .get_time_entries(None, None)
        .context("failed to list time entries")?
        .unwrap_or_default();
    let Some(entry) = entries.into_iter().find(|entry| entry.id() == id) else {
        bail!("time entry not found: {id}");
    };

    entry.delete(session).context("failed to delete time entry")?;
    writeln!(writer, "Deleted entry {id}")?;
    Ok(())
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(|| "?".to_string(), |t| t.format("%Y-%m-%d %H:%M").to_string())
}

/// One line per entry: id, interval, duration, task, then tags and comments.
pub fn render_entries<W: Write>(writer: &mut W, entries: &[Entry]) -> Result<()> {
    if entries.is_empty() {
        writeln!(writer, "No time entries.")?;
        return Ok(());
    }
    for entry in entries {
        write!(
            writer,
            "{:>8}  {} .. {}  {:>7}  {}",
            entry.id(),
            format_time(entry.start_time),
            format_time(entry.end_time),
            format_duration(entry.duration),
            entry.task.name
        )?;
        if !entry.tags.is_empty() {
            write!(writer, "  [{}]", entry.tags.to_wire())?;
        }
        if !entry.comments.is_empty() {
            write!(writer, "  # {}", entry.comments)?;
        }
        writeln!(writer)?;
    }
    Ok(())
}
