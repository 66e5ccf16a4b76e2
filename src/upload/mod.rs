pub mod types;
pub mod uploader;

pub use types::{UploadProgress, UploadReport};
pub use uploader::{ChunkUploader, StagingTarget};
