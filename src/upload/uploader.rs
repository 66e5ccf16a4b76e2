use crate::chunk::{planned_bytes, ChunkPlan, ChunkSplitter};
use crate::coordinator::error::{UploadError, UploadResult};
use crate::coordinator::types::{SessionControl, UploadEvent};
use crate::dav::{DavEndpoints, DavTransport, RequestOptions};
use crate::metrics::ChunkTimer;
use crate::upload::types::{UploadProgress, UploadReport};
use std::sync::Arc;

/// Where the chunks of one session go
pub struct StagingTarget<'a> {
    pub endpoints: &'a DavEndpoints,
    pub token: &'a str,
    pub options: &'a RequestOptions,
}

/// Sends planned chunks to the staging collection one at a time
pub struct ChunkUploader<T> {
    transport: Arc<T>,
}

impl<T: DavTransport> ChunkUploader<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Upload `plan` in order, stopping at the first failure.
    ///
    /// `total_bytes` is the full source size; chunks missing from `plan`
    /// (staged by an earlier session) count as already done for progress.
    pub async fn upload_all(
        &self,
        plan: &[ChunkPlan],
        splitter: &ChunkSplitter,
        target: &StagingTarget<'_>,
        total_bytes: u64,
        control: &SessionControl,
    ) -> UploadReport {
        let mut staged_bytes = total_bytes.saturating_sub(planned_bytes(plan));

        for (index, chunk) in plan.iter().enumerate() {
            let result = tokio::select! {
                biased;
                _ = control.cancel.cancelled() => Err(UploadError::Cancelled),
                result = self.upload_chunk(chunk, splitter, target) => result,
            };

            if let Err(error) = result {
                tracing::warn!("Chunk {} not staged: {}", chunk.name, error);
                return UploadReport {
                    remaining: plan[index..].to_vec(),
                    error: Some(error),
                };
            }

            staged_bytes += chunk.size;
            control.emit(UploadEvent::ChunkStaged {
                name: chunk.name.clone(),
                size: chunk.size,
            });
            control.emit(UploadEvent::Progress(UploadProgress::new(
                total_bytes,
                staged_bytes,
            )));
        }

        UploadReport {
            remaining: Vec::new(),
            error: None,
        }
    }

    async fn upload_chunk(
        &self,
        chunk: &ChunkPlan,
        splitter: &ChunkSplitter,
        target: &StagingTarget<'_>,
    ) -> UploadResult<()> {
        let path = splitter.verify_chunk(chunk).await?;
        let url = target.endpoints.chunk(target.token, &chunk.name);

        let timer = ChunkTimer::start();
        self.transport
            .upload_file(&path, &url, target.options)
            .await
            .map_err(|source| UploadError::ChunkUpload {
                name: chunk.name.clone(),
                source,
            })?;
        timer.stop(chunk.size);

        tracing::debug!("Staged chunk {} ({} bytes)", chunk.name, chunk.size);
        Ok(())
    }
}
