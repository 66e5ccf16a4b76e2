use crate::dav::error::DavResult;
use crate::dav::types::{FileMetadata, RequestOptions};
use std::future::Future;
use std::path::Path;

/// Single-request primitives the upload engine is built on.
///
/// Implementations must be safe to share between concurrently running
/// upload sessions; they hold no per-session state.
pub trait DavTransport: Send + Sync {
    /// Read the metadata of one resource (`Depth: 0`).
    ///
    /// A missing resource is reported as [`DavError::NotFound`](crate::dav::DavError::NotFound).
    fn read_metadata(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> impl Future<Output = DavResult<FileMetadata>> + Send;

    /// Create a collection
    fn create_collection(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> impl Future<Output = DavResult<()>> + Send;

    /// Upload a local file to `url` in a single request
    fn upload_file(
        &self,
        local_path: &Path,
        url: &str,
        options: &RequestOptions,
    ) -> impl Future<Output = DavResult<()>> + Send;

    /// Move or rename a resource
    fn move_resource(
        &self,
        source: &str,
        destination: &str,
        overwrite: bool,
        options: &RequestOptions,
    ) -> impl Future<Output = DavResult<()>> + Send;
}
