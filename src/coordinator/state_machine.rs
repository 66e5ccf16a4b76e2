use crate::coordinator::error::{UploadError, UploadResult};
use crate::coordinator::types::{SessionEvent, UploadEvent, UploadStage, UploadState};
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Lifecycle of one upload session.
///
/// Moves strictly forward through the stages; `Fail` is accepted from any
/// non-terminal state and records the stage it happened in.
pub struct UploadStateMachine {
    state: Arc<RwLock<UploadState>>,
    observer: Option<mpsc::UnboundedSender<UploadEvent>>,
}

impl Default for UploadStateMachine {
    fn default() -> Self {
        Self::new(None)
    }
}

impl UploadStateMachine {
    pub fn new(observer: Option<mpsc::UnboundedSender<UploadEvent>>) -> Self {
        Self {
            state: Arc::new(RwLock::new(UploadState::Active(UploadStage::Preflight))),
            observer,
        }
    }

    /// Get current state
    pub fn current_state(&self) -> UploadState {
        *self.state.read()
    }

    /// Transition state based on event
    pub fn transition(&self, event: SessionEvent) -> UploadResult<UploadState> {
        use UploadStage::*;

        let mut state = self.state.write();

        let new_state = match (*state, event) {
            (UploadState::Active(Preflight), SessionEvent::PreflightPassed) => {
                UploadState::Active(StagingEnsure)
            }
            (UploadState::Active(StagingEnsure), SessionEvent::StagingReady) => {
                UploadState::Active(Planning)
            }
            (UploadState::Active(Planning), SessionEvent::PlanReady) => {
                UploadState::Active(Uploading)
            }

            // A resumed session whose chunks are all staged goes straight to assembly
            (UploadState::Active(Planning | Uploading), SessionEvent::ChunksStaged) => {
                UploadState::Active(Assembling)
            }

            (UploadState::Active(Assembling), SessionEvent::Assembled) => {
                UploadState::Active(Verifying)
            }
            (UploadState::Active(Verifying), SessionEvent::Verified) => UploadState::Done,

            (UploadState::Active(stage), SessionEvent::Fail) => UploadState::Failed { stage },

            _ => {
                return Err(UploadError::InvalidStateTransition(format!(
                    "Cannot handle {:?} in state {:?}",
                    event, *state
                )));
            }
        };

        *state = new_state;
        drop(state);

        tracing::debug!("Upload state -> {:?}", new_state);
        if let Some(observer) = &self.observer {
            let _ = observer.send(UploadEvent::StateChanged(new_state));
        }
        Ok(new_state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advance(sm: &UploadStateMachine, events: &[SessionEvent]) {
        for event in events {
            sm.transition(*event).unwrap();
        }
    }

    #[test]
    fn test_state_machine_creation() {
        let sm = UploadStateMachine::default();
        assert_eq!(
            sm.current_state(),
            UploadState::Active(UploadStage::Preflight)
        );
    }

    #[test]
    fn test_full_forward_path() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let sm = UploadStateMachine::new(Some(tx));

        advance(
            &sm,
            &[
                SessionEvent::PreflightPassed,
                SessionEvent::StagingReady,
                SessionEvent::PlanReady,
                SessionEvent::ChunksStaged,
                SessionEvent::Assembled,
                SessionEvent::Verified,
            ],
        );
        assert_eq!(sm.current_state(), UploadState::Done);

        let mut seen = Vec::new();
        while let Ok(UploadEvent::StateChanged(state)) = rx.try_recv() {
            seen.push(state);
        }
        assert_eq!(seen.len(), 6);
        assert_eq!(seen[2], UploadState::Active(UploadStage::Uploading));
    }

    #[test]
    fn test_resume_skips_uploading() {
        let sm = UploadStateMachine::default();
        advance(
            &sm,
            &[
                SessionEvent::PreflightPassed,
                SessionEvent::StagingReady,
                SessionEvent::ChunksStaged,
            ],
        );
        assert_eq!(
            sm.current_state(),
            UploadState::Active(UploadStage::Assembling)
        );
    }

    #[test]
    fn test_fail_records_stage() {
        let sm = UploadStateMachine::default();
        advance(&sm, &[SessionEvent::PreflightPassed, SessionEvent::StagingReady]);
        sm.transition(SessionEvent::PlanReady).unwrap();
        sm.transition(SessionEvent::Fail).unwrap();

        assert_eq!(
            sm.current_state(),
            UploadState::Failed {
                stage: UploadStage::Uploading
            }
        );
        assert!(sm.current_state().is_terminal());
    }

    #[test]
    fn test_invalid_transition() {
        let sm = UploadStateMachine::default();

        // Cannot skip staging
        let result = sm.transition(SessionEvent::PlanReady);
        assert!(matches!(result, Err(UploadError::InvalidStateTransition(_))));

        // No going back
        advance(&sm, &[SessionEvent::PreflightPassed]);
        assert!(sm.transition(SessionEvent::PreflightPassed).is_err());
    }

    #[test]
    fn test_terminal_states_are_final() {
        let sm = UploadStateMachine::default();
        sm.transition(SessionEvent::Fail).unwrap();
        assert!(sm.transition(SessionEvent::Fail).is_err());
        assert!(sm.transition(SessionEvent::PreflightPassed).is_err());
    }
}
