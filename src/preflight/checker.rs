use crate::config::UploadPolicy;
use crate::coordinator::error::{UploadError, UploadResult};
use std::io;
use std::path::Path;
use std::sync::Arc;

/// Source of free-space figures for a local directory
pub trait SpaceProbe: Send + Sync {
    fn available_space(&self, path: &Path) -> io::Result<u64>;
}

/// Queries the filesystem holding the path
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskSpaceProbe;

impl SpaceProbe for DiskSpaceProbe {
    fn available_space(&self, path: &Path) -> io::Result<u64> {
        fs2::available_space(path)
    }
}

/// Rejects a session before any network activity when the local scratch
/// area cannot hold the chunk copies
#[derive(Clone)]
pub struct PreflightChecker {
    policy: UploadPolicy,
    probe: Arc<dyn SpaceProbe>,
}

impl PreflightChecker {
    pub fn new(policy: &UploadPolicy) -> Self {
        Self::with_probe(policy, Arc::new(DiskSpaceProbe))
    }

    pub fn with_probe(policy: &UploadPolicy, probe: Arc<dyn SpaceProbe>) -> Self {
        Self {
            policy: policy.clone(),
            probe,
        }
    }

    pub fn check(&self, source_size: u64, available: u64) -> UploadResult<()> {
        let required = self.policy.required_space(source_size);
        if available < required {
            return Err(UploadError::InsufficientSpace {
                required,
                available,
            });
        }
        Ok(())
    }

    /// Stat the source and check the space left in `scratch_root`.
    ///
    /// Returns the source size.
    pub async fn run(&self, source: &Path, scratch_root: &Path) -> UploadResult<u64> {
        let metadata = tokio::fs::metadata(source)
            .await
            .map_err(|e| UploadError::SourceUnreadable {
                path: source.to_path_buf(),
                source: e,
            })?;

        if !metadata.is_file() {
            return Err(UploadError::SourceUnreadable {
                path: source.to_path_buf(),
                source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
            });
        }

        let available =
            self.probe
                .available_space(scratch_root)
                .map_err(|e| UploadError::SpaceQuery {
                    path: scratch_root.to_path_buf(),
                    source: e,
                })?;

        self.check(metadata.len(), available)?;
        Ok(metadata.len())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use tempfile::TempDir;

    /// Reports a fixed amount of free space, or an error when `None`
    pub(crate) struct FixedSpace(pub Option<u64>);

    impl SpaceProbe for FixedSpace {
        fn available_space(&self, _path: &Path) -> io::Result<u64> {
            self.0
                .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "statvfs failed"))
        }
    }

    fn checker(space: Option<u64>) -> PreflightChecker {
        PreflightChecker::with_probe(&UploadPolicy::default(), Arc::new(FixedSpace(space)))
    }

    #[test]
    fn test_check_threshold() {
        let checker = checker(None);
        assert!(checker.check(100, 400).is_ok());
        assert!(matches!(
            checker.check(100, 399),
            Err(UploadError::InsufficientSpace {
                required: 400,
                available: 399
            })
        ));
        assert!(checker.check(0, 0).is_ok());
        assert!(checker.check(u64::MAX, u64::MAX).is_ok());
    }

    #[test]
    fn test_custom_multiplier() {
        let policy = UploadPolicy {
            space_multiplier: 2,
            ..Default::default()
        };
        let checker = PreflightChecker::with_probe(&policy, Arc::new(FixedSpace(None)));
        assert!(checker.check(100, 200).is_ok());
    }

    #[tokio::test]
    async fn test_run_returns_source_size() {
        let temp_dir = TempDir::new().unwrap();
        let source = temp_dir.path().join("a.bin");
        tokio::fs::write(&source, vec![0u8; 1000]).await.unwrap();

        let size = checker(Some(4000)).run(&source, temp_dir.path()).await.unwrap();
        assert_eq!(size, 1000);

        let result = checker(Some(3999)).run(&source, temp_dir.path()).await;
        assert!(matches!(result, Err(UploadError::InsufficientSpace { .. })));
    }

    #[tokio::test]
    async fn test_run_reports_local_failures() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("missing.bin");
        let result = checker(Some(u64::MAX)).run(&missing, temp_dir.path()).await;
        assert!(matches!(result, Err(UploadError::SourceUnreadable { .. })));

        let result = checker(Some(u64::MAX))
            .run(temp_dir.path(), temp_dir.path())
            .await;
        assert!(matches!(result, Err(UploadError::SourceUnreadable { .. })));

        let source = temp_dir.path().join("a.bin");
        tokio::fs::write(&source, b"x").await.unwrap();
        let result = checker(None).run(&source, temp_dir.path()).await;
        assert!(matches!(result, Err(UploadError::SpaceQuery { .. })));
    }

    #[test]
    fn test_disk_probe_reads_tempdir() {
        let temp_dir = TempDir::new().unwrap();
        assert!(DiskSpaceProbe.available_space(temp_dir.path()).is_ok());
    }
}
