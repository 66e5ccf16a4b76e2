//! In-memory WebDAV server double used by the unit tests

use crate::dav::endpoints::ASSEMBLY_MARKER;
use crate::dav::error::{DavError, DavResult};
use crate::dav::transport::DavTransport;
use crate::dav::types::{FileMetadata, RequestOptions};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum DavCall {
    ReadMetadata(String),
    CreateCollection(String),
    Upload { url: String, local: PathBuf },
    Move {
        source: String,
        destination: String,
        overwrite: bool,
        timeout: Option<Duration>,
    },
}

#[derive(Default)]
struct MemoryState {
    collections: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    calls: Vec<(DavCall, RequestOptions)>,
    failing_uploads: Vec<String>,
    read_status: Option<u16>,
    create_status: Option<u16>,
    move_status: Option<u16>,
    hide_moved: bool,
}

#[derive(Default)]
pub(crate) struct MemoryDav {
    state: Mutex<MemoryState>,
}

fn status(method: &str, url: &str, status: u16) -> DavError {
    DavError::Status {
        method: method.to_string(),
        url: url.to_string(),
        status,
    }
}

impl MemoryDav {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_collection(&self, url: &str) {
        self.state.lock().collections.insert(url.to_string());
    }

    /// Fail every upload whose URL ends with `suffix`
    pub fn fail_uploads_ending_with(&self, suffix: &str) {
        self.state.lock().failing_uploads.push(suffix.to_string());
    }

    pub fn fail_reads_with(&self, code: u16) {
        self.state.lock().read_status = Some(code);
    }

    pub fn fail_creates_with(&self, code: u16) {
        self.state.lock().create_status = Some(code);
    }

    pub fn fail_moves_with(&self, code: u16) {
        self.state.lock().move_status = Some(code);
    }

    /// Drop every injected failure; stored resources are kept
    pub fn clear_failures(&self) {
        let mut state = self.state.lock();
        state.failing_uploads.clear();
        state.read_status = None;
        state.create_status = None;
        state.move_status = None;
        state.hide_moved = false;
    }

    /// Accept moves but never expose the moved resource afterwards
    pub fn hide_moved_resources(&self) {
        self.state.lock().hide_moved = true;
    }

    pub fn calls(&self) -> Vec<DavCall> {
        self.state.lock().calls.iter().map(|(call, _)| call.clone()).collect()
    }

    pub fn options_for(&self, predicate: impl Fn(&DavCall) -> bool) -> Vec<RequestOptions> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|(call, _)| predicate(call))
            .map(|(_, options)| options.clone())
            .collect()
    }

    pub fn uploaded_urls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                DavCall::Upload { url, .. } => Some(url),
                _ => None,
            })
            .collect()
    }

    pub fn file(&self, url: &str) -> Option<Vec<u8>> {
        self.state.lock().files.get(url).cloned()
    }

    pub fn has_collection(&self, url: &str) -> bool {
        self.state.lock().collections.contains(url)
    }
}

impl DavTransport for MemoryDav {
    async fn read_metadata(&self, url: &str, options: &RequestOptions) -> DavResult<FileMetadata> {
        let mut state = self.state.lock();
        state
            .calls
            .push((DavCall::ReadMetadata(url.to_string()), options.clone()));

        if let Some(code) = state.read_status {
            return Err(status("PROPFIND", url, code));
        }
        if state.collections.contains(url) {
            return Ok(FileMetadata {
                href: url.to_string(),
                is_collection: true,
                ..Default::default()
            });
        }
        match state.files.get(url) {
            Some(bytes) if !state.hide_moved => Ok(FileMetadata {
                href: url.to_string(),
                file_id: Some("1001".into()),
                etag: Some(format!("etag-{}", bytes.len())),
                size: bytes.len() as u64,
                ..Default::default()
            }),
            _ => Err(DavError::NotFound(url.to_string())),
        }
    }

    async fn create_collection(&self, url: &str, options: &RequestOptions) -> DavResult<()> {
        let mut state = self.state.lock();
        state
            .calls
            .push((DavCall::CreateCollection(url.to_string()), options.clone()));

        if let Some(code) = state.create_status {
            return Err(status("MKCOL", url, code));
        }
        if !state.collections.insert(url.to_string()) {
            return Err(status("MKCOL", url, 405));
        }
        Ok(())
    }

    async fn upload_file(
        &self,
        local_path: &Path,
        url: &str,
        options: &RequestOptions,
    ) -> DavResult<()> {
        let bytes = tokio::fs::read(local_path).await?;

        let mut state = self.state.lock();
        state.calls.push((
            DavCall::Upload {
                url: url.to_string(),
                local: local_path.to_path_buf(),
            },
            options.clone(),
        ));

        if state.failing_uploads.iter().any(|suffix| url.ends_with(suffix)) {
            return Err(status("PUT", url, 507));
        }
        state.files.insert(url.to_string(), bytes);
        Ok(())
    }

    async fn move_resource(
        &self,
        source: &str,
        destination: &str,
        overwrite: bool,
        options: &RequestOptions,
    ) -> DavResult<()> {
        let mut state = self.state.lock();
        state.calls.push((
            DavCall::Move {
                source: source.to_string(),
                destination: destination.to_string(),
                overwrite,
                timeout: options.timeout,
            },
            options.clone(),
        ));

        if let Some(code) = state.move_status {
            return Err(status("MOVE", source, code));
        }
        if !overwrite && state.files.contains_key(destination) {
            return Err(status("MOVE", source, 412));
        }

        let marker_suffix = format!("/{ASSEMBLY_MARKER}");
        let assembled = match source.strip_suffix(&marker_suffix) {
            Some(collection) => {
                let prefix = format!("{collection}/");
                let parts: Vec<String> = state
                    .files
                    .keys()
                    .filter(|key| key.starts_with(&prefix))
                    .cloned()
                    .collect();
                let mut content = Vec::new();
                for key in parts {
                    if let Some(bytes) = state.files.remove(&key) {
                        content.extend_from_slice(&bytes);
                    }
                }
                state.collections.remove(collection);
                content
            }
            None => state
                .files
                .remove(source)
                .ok_or_else(|| DavError::NotFound(source.to_string()))?,
        };

        state.files.insert(destination.to_string(), assembled);
        Ok(())
    }
}
