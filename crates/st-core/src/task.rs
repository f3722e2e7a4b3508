//! Task records.

use chrono::{DateTime, Utc};
use serde::Serialize;

/// A trackable unit of work.
///
/// `name`, `tags`, `coworkers`, `reporters` and `complete` are edited by the
/// caller and sent on save. The remaining fields are assigned by the server
/// and only ever populated by the codec, so a local edit cannot drift from
/// what the server last reported.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub(crate) id: u64,
    pub name: String,
    pub tags: Vec<String>,
    /// Coworker email addresses.
    pub coworkers: Vec<String>,
    /// Reporter email addresses.
    pub reporters: Vec<String>,
    pub complete: bool,
    pub(crate) hours: f64,
    pub(crate) owner: String,
    pub(crate) created_at: Option<DateTime<Utc>>,
    pub(crate) updated_at: Option<DateTime<Utc>>,
    pub(crate) completed_on: Option<DateTime<Utc>>,
}

impl Task {
    /// Creates an unsaved task (id 0).
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            tags: Vec::new(),
            coworkers: Vec::new(),
            reporters: Vec::new(),
            complete: false,
            hours: 0.0,
            owner: String::new(),
            created_at: None,
            updated_at: None,
            completed_on: None,
        }
    }

    /// Server-assigned id, or 0 if the task has never been saved.
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn is_saved(&self) -> bool {
        self.id != 0
    }

    /// Hours logged against the task.
    pub const fn hours(&self) -> f64 {
        self.hours
    }

    /// Email of the task owner, empty when the server listed none.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub const fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub const fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Set only for tasks the server reports as complete.
    pub const fn completed_on(&self) -> Option<DateTime<Utc>> {
        self.completed_on
    }
}

/// A person listed on a task as owner, coworker or reporter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Person {
    pub name: String,
    pub user_id: String,
    pub email: String,
}
