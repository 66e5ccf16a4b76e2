use crate::assembly::FileTimes;
use crate::chunk::{ChunkPlan, DEFAULT_CHUNK_SIZE};
use crate::coordinator::error::UploadError;
use crate::dav::{FileMetadata, RequestOptions, HEADER_DESTINATION, HEADER_TOTAL_LENGTH};
use crate::upload::UploadProgress;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Non-terminal stages of an upload session, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStage {
    Preflight,
    StagingEnsure,
    Planning,
    Uploading,
    Assembling,
    Verifying,
}

impl UploadStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStage::Preflight => "preflight",
            UploadStage::StagingEnsure => "staging_ensure",
            UploadStage::Planning => "planning",
            UploadStage::Uploading => "uploading",
            UploadStage::Assembling => "assembling",
            UploadStage::Verifying => "verifying",
        }
    }
}

impl fmt::Display for UploadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadState {
    Active(UploadStage),
    Done,
    Failed { stage: UploadStage },
}

impl UploadState {
    pub fn stage(&self) -> Option<UploadStage> {
        match self {
            UploadState::Active(stage) => Some(*stage),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, UploadState::Done | UploadState::Failed { .. })
    }
}

/// Inputs driving [`UploadStateMachine`](crate::coordinator::UploadStateMachine)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    PreflightPassed,
    StagingReady,
    PlanReady,
    /// Every planned chunk is on the server
    ChunksStaged,
    Assembled,
    Verified,
    Fail,
}

/// Notifications sent to a session observer
#[derive(Debug, Clone, PartialEq)]
pub enum UploadEvent {
    StateChanged(UploadState),
    ChunksPlanned { total_chunks: usize, total_bytes: u64 },
    ChunkPrepared { name: String },
    TransferStarted { remaining: usize },
    Progress(UploadProgress),
    ChunkStaged { name: String, size: u64 },
}

/// One invocation of the chunked upload protocol
#[derive(Debug, Clone)]
pub struct UploadSession {
    /// Local directory holding the source file
    pub directory: PathBuf,
    pub file_name: String,
    pub chunk_size: u64,
    /// Random name of the remote staging collection
    pub staging_token: String,
    /// Destination directory on the server, `/`-separated
    pub server_dir: String,
    pub times: FileTimes,
    pub custom_headers: Vec<(String, String)>,
    /// Chunks still to send, taken from a failed session
    pub resume_plan: Option<Vec<ChunkPlan>>,
}

impl UploadSession {
    pub fn new(
        directory: impl Into<PathBuf>,
        file_name: impl Into<String>,
        server_dir: impl Into<String>,
    ) -> Self {
        Self {
            directory: directory.into(),
            file_name: file_name.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            staging_token: uuid::Uuid::new_v4().simple().to_string(),
            server_dir: server_dir.into(),
            times: FileTimes::default(),
            custom_headers: Vec::new(),
            resume_plan: None,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: u64) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    pub fn with_staging_token(mut self, token: impl Into<String>) -> Self {
        self.staging_token = token.into();
        self
    }

    pub fn with_times(mut self, times: FileTimes) -> Self {
        self.times = times;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Continue a failed session: same staging collection, only the chunks
    /// the server has not confirmed
    pub fn resume_from(mut self, failure: &UploadFailure) -> Self {
        self.staging_token = failure.staging_token.clone();
        self.resume_plan = failure.remaining.clone();
        self
    }

    pub fn source_path(&self) -> PathBuf {
        self.directory.join(&self.file_name)
    }

    /// Scratch directory for this session's chunk files
    pub fn scratch_dir(&self) -> PathBuf {
        self.directory.join(format!(".chunks-{}", self.staging_token))
    }

    /// Headers sent on every staging, chunk and assembly request
    pub fn request_options(&self, destination: &str, total_size: u64) -> RequestOptions {
        let mut options = RequestOptions::new()
            .with_header(HEADER_DESTINATION, destination)
            .with_header(HEADER_TOTAL_LENGTH, total_size.to_string());
        for (name, value) in &self.custom_headers {
            options.set_header(name.clone(), value.clone());
        }
        options
    }
}

#[derive(Error, Debug)]
#[error("Upload failed during {stage}: {error}")]
pub struct UploadFailure {
    pub stage: UploadStage,
    #[source]
    pub error: UploadError,
    /// Chunks not confirmed by the server; `None` if planning never finished
    pub remaining: Option<Vec<ChunkPlan>>,
    pub staging_token: String,
}

impl UploadFailure {
    pub fn is_resumable(&self) -> bool {
        self.error.is_resumable()
    }
}

pub type UploadOutcome = Result<FileMetadata, UploadFailure>;

/// Caller-side handles for a running session
#[derive(Debug, Clone, Default)]
pub struct SessionControl {
    pub events: Option<mpsc::UnboundedSender<UploadEvent>>,
    pub cancel: CancellationToken,
}

impl SessionControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_events(mut self, events: mpsc::UnboundedSender<UploadEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Send an event to the observer; a closed observer is ignored
    pub fn emit(&self, event: UploadEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_defaults() {
        let session = UploadSession::new("/tmp/src", "big.mov", "/Movies");
        assert_eq!(session.chunk_size, DEFAULT_CHUNK_SIZE);
        assert_eq!(session.staging_token.len(), 32);
        assert_eq!(session.source_path(), PathBuf::from("/tmp/src/big.mov"));
        assert!(session.resume_plan.is_none());
    }

    #[test]
    fn test_custom_headers_override_session_headers() {
        let session = UploadSession::new("/tmp", "a", "/")
            .with_header("oc-total-length", "1")
            .with_header("X-Trace", "t");
        let options = session.request_options("https://x/dest", 42);

        assert_eq!(options.header(HEADER_DESTINATION), Some("https://x/dest"));
        assert_eq!(options.header(HEADER_TOTAL_LENGTH), Some("1"));
        assert_eq!(options.header("X-Trace"), Some("t"));
    }

    #[test]
    fn test_resume_from_failure() {
        let remaining = vec![ChunkPlan {
            name: "00002".into(),
            offset: 10,
            size: 10,
        }];
        let failure = UploadFailure {
            stage: UploadStage::Uploading,
            error: UploadError::Cancelled,
            remaining: Some(remaining.clone()),
            staging_token: "tok".into(),
        };

        let session = UploadSession::new("/tmp", "a", "/").resume_from(&failure);
        assert_eq!(session.staging_token, "tok");
        assert_eq!(session.resume_plan, Some(remaining));
        assert!(failure.to_string().contains("uploading"));
    }
}
