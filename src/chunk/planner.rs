use super::error::{ChunkError, Result};
use super::types::ChunkPlan;

/// Default chunk size: 10 MB
pub const DEFAULT_CHUNK_SIZE: u64 = 10_000_000;

/// Chunk names are zero-padded to at least this many digits
pub const MIN_CHUNK_NAME_WIDTH: usize = 5;

/// Pad width for a plan of `count` chunks.
///
/// Every name in one plan shares the width, so lexical and numeric order
/// agree however many chunks there are.
pub fn chunk_name_width(count: usize) -> usize {
    let digits = count.checked_ilog10().map_or(1, |log| log as usize + 1);
    digits.max(MIN_CHUNK_NAME_WIDTH)
}

/// Name of the chunk at `index` (0-based); names start at `00001`
pub fn chunk_name(index: usize, width: usize) -> String {
    format!("{:0width$}", index + 1, width = width)
}

/// Partition `[0, source_size)` into consecutive `chunk_size` ranges.
///
/// The last range may be shorter. A zero-length source produces an empty
/// plan; deciding whether that is acceptable is up to the caller.
pub fn plan(source_size: u64, chunk_size: u64) -> Result<Vec<ChunkPlan>> {
    if chunk_size == 0 {
        return Err(ChunkError::InvalidChunkSize(chunk_size));
    }

    let count = source_size.div_ceil(chunk_size) as usize;
    let width = chunk_name_width(count);
    let mut chunks = Vec::with_capacity(count);
    let mut offset = 0;

    while offset < source_size {
        let size = std::cmp::min(chunk_size, source_size - offset);
        chunks.push(ChunkPlan {
            name: chunk_name(chunks.len(), width),
            offset,
            size,
        });
        offset += size;
    }

    Ok(chunks)
}
