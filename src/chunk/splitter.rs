use std::io::{ErrorKind, SeekFrom};
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use super::error::{ChunkError, Result};
use super::types::ChunkPlan;

/// Writes planned chunks of a source file into a local scratch directory
pub struct ChunkSplitter {
    source: PathBuf,
    scratch_dir: PathBuf,
}

impl ChunkSplitter {
    pub fn new(source: impl Into<PathBuf>, scratch_dir: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
            scratch_dir: scratch_dir.into(),
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn chunk_path(&self, chunk: &ChunkPlan) -> PathBuf {
        self.scratch_dir.join(&chunk.name)
    }

    /// Write every chunk of `plan` to the scratch directory.
    ///
    /// Chunk files left by an earlier attempt are reused when their length
    /// already matches the plan.
    pub async fn materialize(
        &self,
        plan: &[ChunkPlan],
        mut on_chunk: impl FnMut(&ChunkPlan),
    ) -> Result<()> {
        tokio::fs::create_dir_all(&self.scratch_dir).await?;
        let mut source = File::open(&self.source).await?;

        for chunk in plan {
            let path = self.chunk_path(chunk);
            if let Ok(existing) = tokio::fs::metadata(&path).await {
                if existing.len() == chunk.size {
                    on_chunk(chunk);
                    continue;
                }
            }

            source.seek(SeekFrom::Start(chunk.offset)).await?;
            let mut output = File::create(&path).await?;
            let mut range = (&mut source).take(chunk.size);
            let copied = tokio::io::copy(&mut range, &mut output).await?;
            output.flush().await?;

            if copied != chunk.size {
                return Err(ChunkError::ShortRead {
                    name: chunk.name.clone(),
                    expected: chunk.size,
                    actual: copied,
                });
            }

            tracing::debug!("Wrote chunk {} ({} bytes)", chunk.name, copied);
            on_chunk(chunk);
        }

        Ok(())
    }

    /// Path of a chunk file that is present and non-empty
    pub async fn verify_chunk(&self, chunk: &ChunkPlan) -> Result<PathBuf> {
        let path = self.chunk_path(chunk);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.len() > 0 && meta.len() == chunk.size => Ok(path),
            _ => Err(ChunkError::EmptyChunkFile {
                name: chunk.name.clone(),
            }),
        }
    }

    /// Remove the scratch directory and every chunk in it
    pub async fn cleanup(&self) -> Result<()> {
        match tokio::fs::remove_dir_all(&self.scratch_dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::planner::plan;
    use tempfile::TempDir;

    async fn create_test_file(path: &Path, size: usize) -> Vec<u8> {
        let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        tokio::fs::write(path, &data).await.unwrap();
        data
    }

    #[tokio::test]
    async fn test_materialize_and_reassemble() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.bin");
        let data = create_test_file(&source, 10_000).await;

        let splitter = ChunkSplitter::new(&source, temp_dir.path().join("scratch"));
        let chunks = plan(data.len() as u64, 3_000).unwrap();

        let mut seen = Vec::new();
        splitter
            .materialize(&chunks, |c| seen.push(c.name.clone()))
            .await
            .unwrap();
        assert_eq!(seen, vec!["00001", "00002", "00003", "00004"]);

        let mut rebuilt = Vec::new();
        for chunk in &chunks {
            let path = splitter.verify_chunk(chunk).await.unwrap();
            rebuilt.extend(tokio::fs::read(path).await.unwrap());
        }
        assert_eq!(rebuilt, data);
    }

    #[tokio::test]
    async fn test_materialize_subset_for_resume() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.bin");
        let data = create_test_file(&source, 9_000).await;

        let splitter = ChunkSplitter::new(&source, temp_dir.path().join("scratch"));
        let remaining: Vec<_> = plan(9_000, 3_000).unwrap().into_iter().skip(1).collect();
        splitter.materialize(&remaining, |_| {}).await.unwrap();

        let second = tokio::fs::read(splitter.chunk_path(&remaining[0])).await.unwrap();
        assert_eq!(second, &data[3_000..6_000]);
        assert!(!splitter.scratch_dir().join("00001").exists());
    }

    #[tokio::test]
    async fn test_missing_chunk_file_reported() {
        let temp_dir = TempDir::new().unwrap();
        let splitter = ChunkSplitter::new(temp_dir.path().join("none"), temp_dir.path());
        let chunk = ChunkPlan {
            name: "00001".into(),
            offset: 0,
            size: 10,
        };

        let result = splitter.verify_chunk(&chunk).await;
        assert!(matches!(result, Err(ChunkError::EmptyChunkFile { .. })));
    }

    #[tokio::test]
    async fn test_short_source_detected() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.bin");
        create_test_file(&source, 100).await;

        let splitter = ChunkSplitter::new(&source, temp_dir.path().join("scratch"));
        let stale = plan(200, 150).unwrap();
        let result = splitter.materialize(&stale, |_| {}).await;

        assert!(matches!(result, Err(ChunkError::ShortRead { .. })));
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("source.bin");
        create_test_file(&source, 10).await;

        let splitter = ChunkSplitter::new(&source, temp_dir.path().join("scratch"));
        splitter.materialize(&plan(10, 4).unwrap(), |_| {}).await.unwrap();

        splitter.cleanup().await.unwrap();
        assert!(!splitter.scratch_dir().exists());
        splitter.cleanup().await.unwrap();
    }
}
