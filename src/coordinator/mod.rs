mod coordinator;
pub mod error;
mod state_machine;
pub mod types;

pub use coordinator::UploadCoordinator;
pub use error::{ErrorCategory, UploadError, UploadResult};
pub use state_machine::UploadStateMachine;
pub use types::{
    SessionControl, SessionEvent, UploadEvent, UploadFailure, UploadOutcome, UploadSession,
    UploadStage, UploadState,
};
