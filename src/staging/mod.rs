pub mod manager;

pub use manager::{RemoteStagingManager, StagingStatus};
