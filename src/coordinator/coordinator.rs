use crate::assembly::AssemblyCoordinator;
use crate::chunk::{self, planned_bytes, ChunkError, ChunkPlan, ChunkSplitter};
use crate::config::UploadPolicy;
use crate::coordinator::error::{UploadError, UploadResult};
use crate::coordinator::state_machine::UploadStateMachine;
use crate::coordinator::types::{
    SessionControl, SessionEvent, UploadEvent, UploadFailure, UploadOutcome, UploadSession,
    UploadStage,
};
use crate::dav::{DavEndpoints, DavTransport, FileMetadata};
use crate::metrics::SessionMetrics;
use crate::preflight::PreflightChecker;
use crate::staging::RemoteStagingManager;
use crate::upload::{ChunkUploader, StagingTarget};
use std::sync::Arc;

/// Runs upload sessions against one server.
///
/// Holds no per-session state; any number of sessions with distinct
/// staging tokens may run on the same coordinator concurrently.
pub struct UploadCoordinator<T> {
    endpoints: DavEndpoints,
    preflight: PreflightChecker,
    staging: RemoteStagingManager<T>,
    uploader: ChunkUploader<T>,
    assembler: AssemblyCoordinator<T>,
}

impl<T: DavTransport> UploadCoordinator<T> {
    pub fn new(transport: Arc<T>, endpoints: DavEndpoints, policy: UploadPolicy) -> Self {
        Self {
            endpoints,
            preflight: PreflightChecker::new(&policy),
            staging: RemoteStagingManager::new(transport.clone()),
            uploader: ChunkUploader::new(transport.clone()),
            assembler: AssemblyCoordinator::new(transport, policy),
        }
    }

    /// Replace the preflight checker, e.g. to probe a different disk
    pub fn with_preflight(mut self, preflight: PreflightChecker) -> Self {
        self.preflight = preflight;
        self
    }

    pub fn endpoints(&self) -> &DavEndpoints {
        &self.endpoints
    }

    pub async fn upload(&self, session: &UploadSession) -> UploadOutcome {
        self.upload_with(session, &SessionControl::default()).await
    }

    /// Run one session to its terminal outcome
    pub async fn upload_with(
        &self,
        session: &UploadSession,
        control: &SessionControl,
    ) -> UploadOutcome {
        let machine = UploadStateMachine::new(control.events.clone());
        let metrics = SessionMetrics::start();
        let mut remaining = None;

        tracing::info!(
            "Starting upload of {} to {} (staging {})",
            session.source_path().display(),
            session.server_dir,
            session.staging_token
        );

        match self.drive(session, control, &machine, &mut remaining).await {
            Ok(metadata) => {
                tracing::info!(
                    "Upload of {} verified ({} bytes)",
                    session.file_name,
                    metadata.size
                );
                metrics.complete();
                Ok(metadata)
            }
            Err(error) => {
                let stage = machine
                    .current_state()
                    .stage()
                    .unwrap_or(UploadStage::Preflight);
                if let Err(e) = machine.transition(SessionEvent::Fail) {
                    tracing::warn!("{}", e);
                }
                metrics.fail(stage.as_str());
                tracing::warn!("Upload of {} failed during {}: {}", session.file_name, stage, error);

                Err(UploadFailure {
                    stage,
                    error,
                    remaining,
                    staging_token: session.staging_token.clone(),
                })
            }
        }
    }

    async fn drive(
        &self,
        session: &UploadSession,
        control: &SessionControl,
        machine: &UploadStateMachine,
        remaining: &mut Option<Vec<ChunkPlan>>,
    ) -> UploadResult<FileMetadata> {
        let source = session.source_path();
        let token = session.staging_token.as_str();

        // Preflight
        let source_size = self.preflight.run(&source, &session.directory).await?;
        machine.transition(SessionEvent::PreflightPassed)?;

        // Staging
        let destination = self
            .endpoints
            .destination(&session.server_dir, &session.file_name);
        let options = session.request_options(&destination, source_size);
        let staging_url = self.endpoints.staging_collection(token);
        self.staging.ensure_staging(&staging_url, &options).await?;
        machine.transition(SessionEvent::StagingReady)?;

        // Planning
        let plan = self.plan_session(session, source_size)?;
        control.emit(UploadEvent::ChunksPlanned {
            total_chunks: plan.len(),
            total_bytes: planned_bytes(&plan),
        });
        *remaining = Some(plan.clone());

        let splitter = ChunkSplitter::new(&source, session.scratch_dir());
        splitter
            .materialize(&plan, |chunk| {
                control.emit(UploadEvent::ChunkPrepared {
                    name: chunk.name.clone(),
                })
            })
            .await?;

        // Uploading
        if plan.is_empty() {
            tracing::info!("All chunks already staged, retrying assembly");
        } else {
            machine.transition(SessionEvent::PlanReady)?;
            control.emit(UploadEvent::TransferStarted {
                remaining: plan.len(),
            });

            let target = StagingTarget {
                endpoints: &self.endpoints,
                token,
                options: &options,
            };
            let report = self
                .uploader
                .upload_all(&plan, &splitter, &target, source_size, control)
                .await;
            *remaining = Some(report.remaining);
            if let Some(error) = report.error {
                return Err(error);
            }
        }
        machine.transition(SessionEvent::ChunksStaged)?;

        // Assembling
        let marker = self.endpoints.assembly_marker(token);
        let metadata = self
            .assembler
            .assemble(&marker, &destination, source_size, session.times, &options)
            .await?;
        machine.transition(SessionEvent::Assembled)?;

        // Verifying
        if metadata.size != source_size {
            tracing::warn!(
                "Server reports {} bytes for {}, expected {}",
                metadata.size,
                destination,
                source_size
            );
        }
        if let Err(e) = splitter.cleanup().await {
            tracing::warn!(
                "Failed to remove chunk files in {}: {}",
                splitter.scratch_dir().display(),
                e
            );
        }
        machine.transition(SessionEvent::Verified)?;

        Ok(metadata)
    }

    /// Fresh plan for a new session, or the leftover plan of a resumed one
    fn plan_session(&self, session: &UploadSession, source_size: u64) -> UploadResult<Vec<ChunkPlan>> {
        if let Some(plan) = &session.resume_plan {
            for chunk in plan {
                match chunk.end() {
                    Some(end) if end <= source_size => {}
                    end => {
                        return Err(ChunkError::PlanMismatch {
                            planned: end.unwrap_or(u64::MAX),
                            actual: source_size,
                        }
                        .into());
                    }
                }
            }
            return Ok(plan.clone());
        }

        let plan = chunk::plan(source_size, session.chunk_size)?;
        if plan.is_empty() {
            return Err(UploadError::NoChunksProduced {
                path: session.source_path(),
            });
        }
        tracing::info!(
            "Planned {} chunks of up to {} bytes",
            plan.len(),
            session.chunk_size
        );
        Ok(plan)
    }
}
