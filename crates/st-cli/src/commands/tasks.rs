//! Task commands: list, show, find, create, complete, delete.

use std::io::Write;

use anyhow::{Context, Result, bail};
use st_api::{Persist, Session};
use st_core::{CompletedFilter, Task};

/// Fields a new task is created with.
#[derive(Debug, Default)]
pub struct NewTask {
    pub name: String,
    pub tags: Vec<String>,
    pub coworkers: Vec<String>,
    pub reporters: Vec<String>,
}

pub fn list<W: Write>(
    writer: &mut W,
    session: &mut Session,
    completed: CompletedFilter,
    json: bool,
) -> Result<()> {
    let Some(tasks) = session
        .list_tasks(completed)
        .context("failed to list tasks")?
    else {
        bail!("the server returned no task listing");
    };
    tracing::debug!(count = tasks.len(), %completed, "listed tasks");

    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&tasks)?)?;
    } else {
        render_tasks(writer, &tasks)?;
    }
    Ok(())
}

pub fn show<W: Write>(writer: &mut W, session: &mut Session, id: u64, json: bool) -> Result<()> {
    let task = fetch(session, id)?;
    print_one(writer, &task, json)
}

pub fn find<W: Write>(
    writer: &mut W,
    session: &mut Session,
    name: &str,
    completed: CompletedFilter,
    json: bool,
) -> Result<()> {
    let Some(task) = session
        .get_task_by_name(name, completed)
        .context("failed to look up task")?
    else {
        bail!("task not found: {name}");
    };
    print_one(writer, &task, json)
}

pub fn create<W: Write>(writer: &mut W, session: &mut Session, new: NewTask) -> Result<()> {
    let name = new.name.trim();
    if name.is_empty() {
        bail!("task name cannot be empty");
    }

    let mut task = Task::new(name);
    task.tags = new.tags;
    task.coworkers = new.coworkers;
    task.reporters = new.reporters;

    let task = task.save(session).context("failed to create task")?;
    writeln!(writer, "Created task {}: {}", task.id(), task.name)?;
    Ok(())
}

pub fn complete<W: Write>(writer: &mut W, session: &mut Session, id: u64) -> Result<()> {
    let mut task = fetch(session, id)?;
    if task.complete {
        writeln!(writer, "Task {id} is already complete")?;
        return Ok(());
    }
    task.complete = true;
    let task = task.save(session).context("failed to update task")?;
    writeln!(writer, "Completed task {}: {}", task.id(), task.name)?;
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, session: &mut Session, id: u64) -> Result<()> {
    let task = fetch(session, id)?;
    task.delete(session).context("failed to delete task")?;
    writeln!(writer, "Deleted task {id}: {}", task.name)?;
    Ok(())
}

fn fetch(session: &mut Session, id: u64) -> Result<Task> {
    session
        .get_task_by_id(id)
        .context("failed to fetch task")?
        .with_context(|| format!("task not found: {id}"))
}

fn print_one<W: Write>(writer: &mut W, task: &Task, json: bool) -> Result<()> {
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(task)?)?;
    } else {
        render_tasks(writer, std::slice::from_ref(task))?;
    }
    Ok(())
}

/// One line per task: id, completion mark, hours, name and tags.
pub fn render_tasks<W: Write>(writer: &mut W, tasks: &[Task]) -> Result<()> {
    if tasks.is_empty() {
        writeln!(writer, "No tasks.")?;
        return Ok(());
    }
    for task in tasks {
        let mark = if task.complete { "x" } else { " " };
        write!(
            writer,
            "{:>8}  [{mark}]  {:>7.2}h  {}",
            task.id(),
            task.hours(),
            task.name
        )?;
        if !task.tags.is_empty() {
            write!(writer, "  ({})", task.tags.join(", "))?;
        }
        writeln!(writer)?;
    }
    Ok(())
}
