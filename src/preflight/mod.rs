pub mod checker;

pub use checker::{DiskSpaceProbe, PreflightChecker, SpaceProbe};
