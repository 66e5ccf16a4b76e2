use crate::chunk::ChunkError;
use crate::dav::DavError;
use std::path::PathBuf;
use thiserror::Error;

/// Broad class of an [`UploadError`], used to decide whether resuming makes sense
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Local disk or source file problems; retrying will not help
    LocalResource,
    Staging,
    ChunkTransfer,
    Assembly,
    Internal,
}

#[derive(Error, Debug)]
pub enum UploadError {
    #[error("Insufficient local space: {required} bytes required, {available} available")]
    InsufficientSpace { required: u64, available: u64 },

    #[error("Cannot query free space at {}: {source}", .path.display())]
    SpaceQuery {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Cannot read source file {}: {source}", .path.display())]
    SourceUnreadable {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("No chunks produced for {}", .path.display())]
    NoChunksProduced { path: PathBuf },

    #[error("Chunk error: {0}")]
    Chunk(#[from] ChunkError),

    #[error("Staging collection {url} unavailable: {source}")]
    Staging { url: String, source: DavError },

    #[error("Upload of chunk {name} failed: {source}")]
    ChunkUpload { name: String, source: DavError },

    #[error("Upload cancelled")]
    Cancelled,

    #[error("Assembly failed: {source}")]
    AssemblyMove { source: DavError },

    #[error("Verification of {destination} failed: {source}")]
    Verification {
        destination: String,
        source: DavError,
    },

    #[error("Invalid state transition: {0}")]
    InvalidStateTransition(String),
}

impl UploadError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            UploadError::InsufficientSpace { .. }
            | UploadError::SpaceQuery { .. }
            | UploadError::SourceUnreadable { .. }
            | UploadError::NoChunksProduced { .. }
            | UploadError::Chunk(_) => ErrorCategory::LocalResource,
            UploadError::Staging { .. } => ErrorCategory::Staging,
            UploadError::ChunkUpload { .. } | UploadError::Cancelled => {
                ErrorCategory::ChunkTransfer
            }
            UploadError::AssemblyMove { .. } | UploadError::Verification { .. } => {
                ErrorCategory::Assembly
            }
            UploadError::InvalidStateTransition(_) => ErrorCategory::Internal,
        }
    }

    /// Whether a new session built from the failure can make progress
    pub fn is_resumable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Staging | ErrorCategory::ChunkTransfer | ErrorCategory::Assembly
        )
    }
}

pub type UploadResult<T> = Result<T, UploadError>;
