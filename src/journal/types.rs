use crate::assembly::FileTimes;
use crate::chunk::ChunkPlan;
use crate::coordinator::{UploadFailure, UploadSession, UploadStage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JournalStatus {
    Failed,
    Completed,
}

/// Persisted record of an upload session that may need resuming
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct JournalEntry {
    pub session_id: String,
    pub source_path: PathBuf,
    pub server_dir: String,
    pub staging_token: String,
    pub chunk_size: u64,
    pub times: FileTimes,
    /// Chunks the server has not confirmed; `None` if planning never finished
    pub remaining: Option<Vec<ChunkPlan>>,
    pub last_stage: Option<UploadStage>,
    pub last_error: Option<String>,
    pub status: JournalStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl JournalEntry {
    /// Entry describing `failure` of `session`
    pub fn from_failure(
        session_id: impl Into<String>,
        session: &UploadSession,
        failure: &UploadFailure,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            session_id: session_id.into(),
            source_path: session.source_path(),
            server_dir: session.server_dir.clone(),
            staging_token: failure.staging_token.clone(),
            chunk_size: session.chunk_size,
            times: session.times,
            remaining: failure.remaining.clone(),
            last_stage: Some(failure.stage),
            last_error: Some(failure.error.to_string()),
            status: JournalStatus::Failed,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_resumable(&self) -> bool {
        self.status == JournalStatus::Failed
    }

    /// Session continuing this entry on the same staging collection
    pub fn to_session(&self) -> UploadSession {
        let directory = self
            .source_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let file_name = self
            .source_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut session = UploadSession::new(directory, file_name, self.server_dir.clone())
            .with_chunk_size(self.chunk_size)
            .with_staging_token(self.staging_token.clone())
            .with_times(self.times);
        session.resume_plan = self.remaining.clone();
        session
    }

    pub fn remaining_bytes(&self) -> Option<u64> {
        self.remaining
            .as_deref()
            .map(crate::chunk::planned_bytes)
    }
}
