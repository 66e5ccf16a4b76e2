use crate::chunk::ChunkPlan;
use crate::coordinator::error::UploadError;
use serde::{Deserialize, Serialize};

/// Whole-file progress of a session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UploadProgress {
    pub total_bytes: u64,
    pub staged_bytes: u64,
    pub fraction_completed: f64,
}

impl UploadProgress {
    pub fn new(total_bytes: u64, staged_bytes: u64) -> Self {
        let fraction_completed = if total_bytes == 0 {
            1.0
        } else {
            staged_bytes as f64 / total_bytes as f64
        };
        Self {
            total_bytes,
            staged_bytes,
            fraction_completed,
        }
    }
}

/// Result of one pass over a chunk plan
#[derive(Debug)]
pub struct UploadReport {
    /// Chunks not confirmed by the server, in plan order
    pub remaining: Vec<ChunkPlan>,
    /// Why the pass stopped early
    pub error: Option<UploadError>,
}
