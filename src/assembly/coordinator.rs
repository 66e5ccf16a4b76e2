use crate::config::UploadPolicy;
use crate::coordinator::error::{UploadError, UploadResult};
use crate::dav::{DavTransport, FileMetadata, RequestOptions, HEADER_CTIME, HEADER_MTIME};
use crate::metrics::record_assembly_duration;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// File timestamps forwarded to the server, in epoch seconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTimes {
    pub created: Option<i64>,
    pub modified: Option<i64>,
}

impl FileTimes {
    pub fn new(created: Option<i64>, modified: Option<i64>) -> Self {
        Self { created, modified }
    }
}

/// Timeout for assembling `total_size` bytes under `policy`
pub fn assembly_timeout(total_size: u64, policy: &UploadPolicy) -> Duration {
    policy.assembly_timeout(total_size)
}

/// Turns a complete staging collection into the destination file
pub struct AssemblyCoordinator<T> {
    transport: Arc<T>,
    policy: UploadPolicy,
}

impl<T: DavTransport> AssemblyCoordinator<T> {
    pub fn new(transport: Arc<T>, policy: UploadPolicy) -> Self {
        Self { transport, policy }
    }

    /// Options for the assembly MOVE: the session headers, the timestamps
    /// the server knows how to apply, and a size-dependent timeout
    pub fn move_options(
        &self,
        session: &RequestOptions,
        total_size: u64,
        times: FileTimes,
    ) -> RequestOptions {
        let mut options = session
            .clone()
            .with_timeout(assembly_timeout(total_size, &self.policy));

        if let Some(created) = times.created.filter(|t| *t > 0) {
            options.set_header(HEADER_CTIME, created.to_string());
        }
        if let Some(modified) = times.modified.filter(|t| *t > 0) {
            options.set_header(HEADER_MTIME, modified.to_string());
        }
        options
    }

    /// Move `marker` onto `destination`, then read the result back.
    ///
    /// The read-back is what confirms the assembly; a move that succeeded
    /// but left nothing readable at `destination` is still a failure.
    pub async fn assemble(
        &self,
        marker: &str,
        destination: &str,
        total_size: u64,
        times: FileTimes,
        session: &RequestOptions,
    ) -> UploadResult<FileMetadata> {
        let options = self.move_options(session, total_size, times);

        tracing::info!(
            "Assembling {} bytes at {} (timeout {:?})",
            total_size,
            destination,
            options.timeout
        );

        let started = Instant::now();
        self.transport
            .move_resource(marker, destination, true, &options)
            .await
            .map_err(|source| UploadError::AssemblyMove { source })?;
        record_assembly_duration(started.elapsed());

        self.transport
            .read_metadata(destination, &RequestOptions::new())
            .await
            .map_err(|source| UploadError::Verification {
                destination: destination.to_string(),
                source,
            })
    }
}
