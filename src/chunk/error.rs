use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChunkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid chunk size: {0}")]
    InvalidChunkSize(u64),

    #[error("Source ended early while writing chunk {name}: expected {expected} bytes, got {actual}")]
    ShortRead {
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("Chunk file {name} is empty or missing")]
    EmptyChunkFile { name: String },

    #[error("Plan covers {planned} bytes but the source holds {actual}")]
    PlanMismatch { planned: u64, actual: u64 },
}

pub type Result<T> = std::result::Result<T, ChunkError>;
