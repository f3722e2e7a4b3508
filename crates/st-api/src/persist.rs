//! Save and delete directly on records.

use st_core::{Entry, Task};

use crate::session::{ApiError, Session};

/// Records that can be written to and removed from the server.
///
/// `save` never mutates the receiver: it returns the record the server sent
/// back, and the caller rebinds.
///
/// ```no_run
/// use st_api::{Persist, Session};
/// use st_core::Task;
///
/// let mut session = Session::new("me@example.com", "secret", "KEY")?;
/// let mut task = Task::new("Write report");
/// task = task.save(&mut session)?;
/// task.complete = true;
/// task = task.save(&mut session)?;
/// task.delete(&mut session)?;
/// # Ok::<(), st_api::ApiError>(())
/// ```
pub trait Persist: Sized {
    /// Create or update on the server.
    fn save(&self, session: &mut Session) -> Result<Self, ApiError>;

    /// Remove from the server. Unsaved records (id 0) are skipped without a
    /// request. The local value keeps its id and should be discarded.
    fn delete(&self, session: &mut Session) -> Result<(), ApiError>;
}

impl Persist for Task {
    fn save(&self, session: &mut Session) -> Result<Self, ApiError> {
        session.update_task(self)
    }

    fn delete(&self, session: &mut Session) -> Result<(), ApiError> {
        if !self.is_saved() {
            return Ok(());
        }
        session.delete_task(self)
    }
}

impl Persist for Entry {
    fn save(&self, session: &mut Session) -> Result<Self, ApiError> {
        session.update_time_entry(self)
    }

    fn delete(&self, session: &mut Session) -> Result<(), ApiError> {
        if !self.is_saved() {
            return Ok(());
        }
        session.delete_entry(self)
    }
}
