use thiserror::Error;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("Journal entry not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for JournalError {
    fn from(err: sqlx::Error) -> Self {
        JournalError::DatabaseError(err.to_string())
    }
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::SerializationError(err.to_string())
    }
}

pub type JournalResult<T> = Result<T, JournalError>;
