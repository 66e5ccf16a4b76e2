//! Caller-side persistence of failed sessions

pub mod error;
pub mod store;
pub mod types;

pub use error::{JournalError, JournalResult};
pub use store::UploadJournal;
pub use types::{JournalEntry, JournalStatus};
