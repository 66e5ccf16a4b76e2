//! Metrics and observability module
//!
//! Key metrics exposed:
//! - Session outcomes (started, completed, failed by stage)
//! - Chunks and bytes staged
//! - Chunk upload, assembly and session durations

pub mod exporter;
pub mod recorder;

pub use exporter::{start_metrics_server, MetricsConfig, MetricsError};
pub use recorder::{init_metrics, record_assembly_duration, ChunkTimer, SessionMetrics};
