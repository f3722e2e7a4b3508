//! Core records and wire codec for the SlimTimer client.
//!
//! This crate contains:
//! - `Task` and `Entry` records with server-owned fields kept read-only
//! - The completion filter used by task listings
//! - The XML codec that reads responses and writes request bodies

pub mod entry;
pub mod filter;
pub mod task;
pub mod timestamp;
pub mod xml;

pub use entry::{Entry, EntryTags, MIN_DURATION_SECS};
pub use filter::{CompletedFilter, UnknownCompletedFilter};
pub use task::{Person, Task};
pub use xml::{AuthToken, CodecError};
