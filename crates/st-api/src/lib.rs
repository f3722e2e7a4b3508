//! Blocking client session for the SlimTimer API.
//!
//! A [`Session`] logs in on construction, then exposes task and time entry
//! operations as single XML-over-HTTP round trips. [`Persist`] adds
//! `save`/`delete` on the records themselves.

mod persist;
mod session;

pub use persist::Persist;
pub use session::{ApiError, DEFAULT_BASE_URL, Session, SessionConfig};
