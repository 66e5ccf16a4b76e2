pub mod coordinator;

pub use coordinator::{assembly_timeout, AssemblyCoordinator, FileTimes};
