use serde::{Deserialize, Serialize};

/// One planned chunk of a source file.
///
/// `name` doubles as the remote resource name inside the staging
/// collection; the server concatenates chunks in name order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkPlan {
    pub name: String,
    pub offset: u64,
    pub size: u64,
}

impl ChunkPlan {
    /// Exclusive end offset in the source; `None` if it overflows
    pub fn end(&self) -> Option<u64> {
        self.offset.checked_add(self.size)
    }
}

/// Total number of bytes covered by a plan
pub fn planned_bytes(plan: &[ChunkPlan]) -> u64 {
    plan.iter().map(|chunk| chunk.size).sum()
}
