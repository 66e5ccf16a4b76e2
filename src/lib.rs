//! Chunked, resumable uploads to Nextcloud-style WebDAV servers.
//!
//! A session runs preflight, staging, planning, upload, assembly and
//! verification in order; see [`coordinator::UploadCoordinator`].

pub mod assembly;
pub mod chunk;
pub mod config;
pub mod coordinator;
pub mod dav;
pub mod journal;
pub mod metrics;
pub mod preflight;
pub mod staging;
pub mod upload;

pub use coordinator::{
    SessionControl, UploadCoordinator, UploadError, UploadEvent, UploadFailure, UploadOutcome,
    UploadSession, UploadStage,
};
pub use dav::{DavAccount, DavClient, DavEndpoints, DavTransport};
