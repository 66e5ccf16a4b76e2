use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tunables for preflight and assembly.
///
/// Defaults match what Nextcloud servers are known to cope with: a 4x
/// scratch headroom and three minutes of assembly time per gigabyte,
/// clamped to between one and thirty minutes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPolicy {
    /// Required free local space as a multiple of the source size
    pub space_multiplier: u64,

    pub assembly_secs_per_gb: u64,
    pub assembly_min_secs: u64,
    pub assembly_max_secs: u64,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            space_multiplier: 4,
            assembly_secs_per_gb: 180,
            assembly_min_secs: 60,
            assembly_max_secs: 1800,
        }
    }
}

impl UploadPolicy {
    /// Local bytes that must be free before chunking `source_size` bytes
    pub fn required_space(&self, source_size: u64) -> u64 {
        source_size.saturating_mul(self.space_multiplier)
    }

    /// Timeout for the server-side assembly of `total_size` bytes
    pub fn assembly_timeout(&self, total_size: u64) -> Duration {
        let scaled = total_size as f64 / 1e9 * self.assembly_secs_per_gb as f64;
        let min = self.assembly_min_secs as f64;
        let max = (self.assembly_max_secs as f64).max(min);
        Duration::from_secs_f64(scaled.clamp(min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembly_timeout_clamped() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.assembly_timeout(1_000_000), Duration::from_secs(60));
        assert_eq!(
            policy.assembly_timeout(10_000_000_000),
            Duration::from_secs(1800)
        );
        assert_eq!(policy.assembly_timeout(0), Duration::from_secs(60));
    }

    #[test]
    fn test_assembly_timeout_scales() {
        let policy = UploadPolicy::default();
        assert_eq!(
            policy.assembly_timeout(2_000_000_000),
            Duration::from_secs(360)
        );
    }

    #[test]
    fn test_required_space() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.required_space(1_000), 4_000);
        assert_eq!(policy.required_space(u64::MAX), u64::MAX);
    }
}
