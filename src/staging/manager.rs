use crate::coordinator::error::{UploadError, UploadResult};
use crate::dav::{DavTransport, RequestOptions};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagingStatus {
    AlreadyExisted,
    Created,
}

/// Makes sure the remote staging collection of a session exists
pub struct RemoteStagingManager<T> {
    transport: Arc<T>,
}

impl<T: DavTransport> RemoteStagingManager<T> {
    pub fn new(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Create `url` unless it already exists.
    ///
    /// A `405` answer to the create means another request created the
    /// collection in the meantime, which is as good as creating it.
    pub async fn ensure_staging(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> UploadResult<StagingStatus> {
        let staging_error = |source| UploadError::Staging {
            url: url.to_string(),
            source,
        };

        match self.transport.read_metadata(url, options).await {
            Ok(_) => {
                tracing::debug!("Staging collection {} already exists", url);
                Ok(StagingStatus::AlreadyExisted)
            }
            Err(e) if e.is_not_found() => {
                match self.transport.create_collection(url, options).await {
                    Ok(()) => {
                        tracing::info!("Created staging collection {}", url);
                        Ok(StagingStatus::Created)
                    }
                    Err(e) if e.status() == Some(405) => Ok(StagingStatus::AlreadyExisted),
                    Err(e) => Err(staging_error(e)),
                }
            }
            Err(e) => Err(staging_error(e)),
        }
    }
}
