//! Time entry records.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::task::Task;

/// Duration sent for an entry whose interval works out to nothing.
pub const MIN_DURATION_SECS: i64 = 59;

/// Tags on a time entry.
///
/// The server returns them as one raw string; callers may also build a list,
/// which is comma-joined on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum EntryTags {
    Text(String),
    List(Vec<String>),
}

impl EntryTags {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::List(list) => list.is_empty(),
        }
    }

    /// The value written into the `tags` element.
    pub fn to_wire(&self) -> String {
        match self {
            Self::Text(text) => text.clone(),
            Self::List(list) => list.join(","),
        }
    }
}

impl Default for EntryTags {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<&str> for EntryTags {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for EntryTags {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Vec<String>> for EntryTags {
    fn from(list: Vec<String>) -> Self {
        Self::List(list)
    }
}

/// A recorded time interval attributed to a task.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    pub(crate) id: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Seconds. Zero means "derive from the interval" when saving.
    pub duration: i64,
    pub tags: EntryTags,
    pub comments: String,
    pub task: Task,
}

impl Entry {
    /// Creates an unsaved entry (id 0) for `task` covering `start_time..end_time`.
    pub fn new(task: Task, start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            start_time: Some(start_time),
            end_time: Some(end_time),
            duration: 0,
            tags: EntryTags::default(),
            comments: String::new(),
            task,
        }
    }

    /// Server-assigned id, or 0 if the entry has never been saved.
    pub const fn id(&self) -> u64 {
        self.id
    }

    pub const fn is_saved(&self) -> bool {
        self.id != 0
    }

    /// Duration written on save.
    ///
    /// An explicit `duration` wins. Otherwise the interval length is used,
    /// floored to [`MIN_DURATION_SECS`] so the server never sees a
    /// zero-length entry.
    pub fn duration_in_seconds(&self) -> i64 {
        if self.duration > 0 {
            return self.duration;
        }
        let computed = match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => (end - start).num_seconds(),
            _ => 0,
        };
        if computed > 0 {
            computed
        } else {
            MIN_DURATION_SECS
        }
    }
}
