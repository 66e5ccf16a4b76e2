pub mod error;
pub mod planner;
pub mod splitter;
pub mod types;

pub use error::{ChunkError, Result};
pub use planner::{chunk_name, chunk_name_width, plan, DEFAULT_CHUNK_SIZE, MIN_CHUNK_NAME_WIDTH};
pub use splitter::ChunkSplitter;
pub use types::{planned_bytes, ChunkPlan};
